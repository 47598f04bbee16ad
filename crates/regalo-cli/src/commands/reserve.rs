use std::path::Path;

use regalo_core::models::Gift;
use regalo_core::remote::ReservationBackend;
use regalo_core::{GiftReservation, ReservationStore};

use crate::commands::common::{
    deposit_reference, find_gift, format_account_lines, load_site, open_store,
};
use crate::error::CliError;

pub async fn run_reserve(
    gift_id: &str,
    name: Option<&str>,
    note: Option<&str>,
    force: bool,
    site_path: &Path,
) -> Result<(), CliError> {
    let site = load_site(site_path)?;
    let store = open_store(&site)?;
    let (gift, reservation) =
        reserve_gift(&store, gift_id, name.unwrap_or_default(), note, force).await?;

    println!(
        "Reserved '{}' for {}. Thank you!",
        gift.title, reservation.reserved_by
    );
    if !store.is_remote() {
        println!("(Local-only mode: this reservation is not saved anywhere.)");
    }
    if gift.is_bank_transfer() && !site.accounts.is_empty() {
        println!();
        println!("You can send your gift to any of these accounts:");
        for account in &site.accounts {
            for line in format_account_lines(account) {
                println!("{line}");
            }
            println!(
                "  Reference: {}",
                deposit_reference(&gift, account, &reservation.reserved_by)
            );
        }
    } else if let Some(url) = gift.shop_url() {
        println!("Shop: {url}");
    }

    Ok(())
}

/// Reserve a catalog gift, refusing to take one somebody else holds unless `force` is set.
pub async fn reserve_gift<B: ReservationBackend>(
    store: &ReservationStore<B>,
    gift_id: &str,
    name: &str,
    note: Option<&str>,
    force: bool,
) -> Result<(Gift, GiftReservation), CliError> {
    let gift = find_gift(store, gift_id)?;

    if !force {
        store.load().await?;
        if let Some(existing) = store.get(gift.id.as_str()).await {
            return Err(CliError::AlreadyReserved {
                title: gift.title,
                reserved_by: existing.reserved_by,
            });
        }
    }

    let reservation = store.reserve(gift.id.clone(), name, note).await?;
    Ok((gift, reservation))
}
