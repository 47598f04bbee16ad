use std::path::Path;

use regalo_core::remote::ReservationBackend;
use regalo_core::{GiftStatus, ReservationStore};

use crate::commands::common::{format_gift_line, gift_to_item, load_site, open_store};
use crate::error::CliError;

pub async fn run_gifts(available_only: bool, json: bool, site_path: &Path) -> Result<(), CliError> {
    let site = load_site(site_path)?;
    let store = open_store(&site)?;
    let statuses = list_gifts(&store, available_only).await?;

    if json {
        let items: Vec<_> = statuses.iter().map(gift_to_item).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if statuses.is_empty() {
        if available_only {
            println!("Every gift is already reserved. Thank you all!");
        } else {
            println!("The registry has no gifts yet.");
        }
        return Ok(());
    }

    for status in &statuses {
        println!("{}", format_gift_line(status));
    }
    if !store.is_remote() {
        println!("(Local-only mode: reservations are not shared with other guests.)");
    }

    Ok(())
}

/// Load the remote table and list catalog gifts with their reservation.
///
/// A failed load is an error: the command never shows every gift as free
/// when nobody knows which ones are taken.
pub async fn list_gifts<B: ReservationBackend>(
    store: &ReservationStore<B>,
    available_only: bool,
) -> Result<Vec<GiftStatus>, CliError> {
    store.load().await?;
    let mut statuses = store.gift_statuses().await;
    if available_only {
        statuses.retain(|status| !status.is_reserved());
    }
    Ok(statuses)
}
