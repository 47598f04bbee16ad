use std::io::{self, BufRead, Write};
use std::path::Path;

use regalo_core::models::Gift;
use regalo_core::remote::ReservationBackend;
use regalo_core::ReservationStore;

use crate::commands::common::{confirm, find_gift, load_site, open_store};
use crate::error::CliError;

pub async fn run_release(gift_id: &str, yes: bool, site_path: &Path) -> Result<(), CliError> {
    let site = load_site(site_path)?;
    let store = open_store(&site)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    match release_gift(&store, gift_id, yes, &mut input, &mut output).await? {
        Some(gift) => println!("Released '{}'", gift.title),
        None => println!("Cancelled"),
    }

    Ok(())
}

/// Release a reserved gift after confirmation.
///
/// Returns `None` when the guest declines.
pub async fn release_gift<B: ReservationBackend>(
    store: &ReservationStore<B>,
    gift_id: &str,
    skip_confirmation: bool,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Option<Gift>, CliError> {
    let gift = find_gift(store, gift_id)?;
    store.load().await?;

    let Some(existing) = store.get(gift.id.as_str()).await else {
        return Err(CliError::NotReserved(gift.title));
    };

    if !skip_confirmation {
        let question = format!(
            "Release '{}' (reserved by {})?",
            gift.title, existing.reserved_by
        );
        if !confirm(&question, input, output)? {
            return Ok(None);
        }
    }

    store.release(gift.id.clone()).await?;
    Ok(Some(gift))
}
