use std::path::Path;

use crate::commands::common::{format_account_lines, load_site};
use crate::error::CliError;

pub fn run_accounts(json: bool, site_path: &Path) -> Result<(), CliError> {
    let site = load_site(site_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&site.accounts)?);
        return Ok(());
    }

    if site.accounts.is_empty() {
        println!("No bank accounts listed.");
        return Ok(());
    }

    for (index, account) in site.accounts.iter().enumerate() {
        if index > 0 {
            println!();
        }
        for line in format_account_lines(account) {
            println!("{line}");
        }
    }

    Ok(())
}
