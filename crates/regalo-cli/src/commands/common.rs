use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use regalo_core::config::{load_site_config, BackendSettings};
use regalo_core::models::{BankAccount, Gift};
use regalo_core::remote::{ReservationBackend, SupabaseReservationClient};
use regalo_core::{GiftStatus, ReservationStore, SiteConfig};
use serde::Serialize;

use crate::error::CliError;

pub fn resolve_site_path(cli_site_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_site_path {
        return path;
    }

    if let Ok(path) = std::env::var("REGALO_SITE_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("regalo")
        .join("site.json")
}

pub fn load_site(site_path: &Path) -> Result<SiteConfig, CliError> {
    if !site_path.exists() {
        return Err(CliError::SiteNotFound(site_path.display().to_string()));
    }
    Ok(load_site_config(site_path)?)
}

/// Open a store for the site, synced with Supabase when the environment configures it.
pub fn open_store(site: &SiteConfig) -> Result<ReservationStore<SupabaseReservationClient>, CliError> {
    let backend = BackendSettings::from_env().resolve()?;
    Ok(ReservationStore::from_config(backend.as_ref(), site.catalog()?)?)
}

pub fn normalize_gift_id(gift_id: &str) -> Result<String, CliError> {
    let trimmed = gift_id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyGiftId);
    }
    Ok(trimmed.to_string())
}

/// Look up a catalog gift, rejecting ids the registry does not list.
pub fn find_gift<B: ReservationBackend>(
    store: &ReservationStore<B>,
    gift_id: &str,
) -> Result<Gift, CliError> {
    let gift_id = normalize_gift_id(gift_id)?;
    store
        .catalog()
        .get(&gift_id)
        .cloned()
        .ok_or(CliError::UnknownGift(gift_id))
}

/// Ask a yes/no question. Anything but an explicit yes declines.
pub fn confirm(
    question: &str,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> std::io::Result<bool> {
    write!(output, "{question} [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "s" | "si" | "sí"
    )
}

pub fn format_price(price: f64, currency: &str) -> String {
    if price.fract().abs() < f64::EPSILON {
        format!("{currency} {price:.0}")
    } else {
        format!("{currency} {price:.2}")
    }
}

pub fn format_gift_line(status: &GiftStatus) -> String {
    let gift = &status.gift;
    let price = format_price(gift.price, &gift.currency);
    match &status.reservation {
        Some(reservation) => {
            let mut line = format!(
                "{} | {} | {} | reserved by {}",
                gift.id, gift.title, price, reservation.reserved_by
            );
            if let Some(note) = &reservation.note {
                line.push_str(&format!(" (\"{note}\")"));
            }
            line
        }
        None => format!("{} | {} | {} | available", gift.id, gift.title, price),
    }
}

pub fn format_account_lines(account: &BankAccount) -> Vec<String> {
    let mut lines = vec![
        format!("{} ({})", account.bank, account.currency),
        format!("  Holder: {}", account.holder),
        format!("  {}: {}", account.account_type, account.account_number),
    ];
    if let Some(alias) = &account.alias_or_iban {
        lines.push(format!("  Alias/IBAN: {alias}"));
    }
    if let Some(notes) = &account.notes {
        lines.push(format!("  {notes}"));
    }
    lines
}

/// Transfer reference for a gift deposit: gift title, account notes, then the guest.
pub fn deposit_reference(gift: &Gift, account: &BankAccount, guest: &str) -> String {
    [Some(gift.title.as_str()), account.notes.as_deref(), Some(guest)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" · ")
}

#[derive(Debug, Serialize)]
pub struct GiftItem {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub bank_transfer: bool,
    pub reserved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<DateTime<Utc>>,
}

pub fn gift_to_item(status: &GiftStatus) -> GiftItem {
    let gift = &status.gift;
    let reservation = status.reservation.as_ref();
    GiftItem {
        id: gift.id.to_string(),
        title: gift.title.clone(),
        price: gift.price,
        currency: gift.currency.clone(),
        url: gift.shop_url().map(str::to_string),
        bank_transfer: gift.is_bank_transfer(),
        reserved: reservation.is_some(),
        reserved_by: reservation.map(|r| r.reserved_by.clone()),
        note: reservation.and_then(|r| r.note.clone()),
        reserved_at: reservation.map(|r| r.created_at),
    }
}
