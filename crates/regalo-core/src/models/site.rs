//! Site definition model

use serde::{Deserialize, Serialize};

use super::{Gift, GiftCatalog};
use crate::error::Result;

/// One wedding's static data: event details, gift list, and deposit accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    pub couple_names: String,
    pub date_label: String,
    pub time_label: String,
    pub venue_name: String,
    pub venue_address: String,
    pub city_and_country: String,
    pub maps_url: String,
    /// RSVP form link
    #[serde(default)]
    pub rsvp_url: Option<String>,
    #[serde(default)]
    pub hero_image_url: Option<String>,
    #[serde(default)]
    pub gifts: Vec<Gift>,
    #[serde(default)]
    pub accounts: Vec<BankAccount>,
}

impl SiteConfig {
    /// Validated catalog built from `gifts`.
    pub fn catalog(&self) -> Result<GiftCatalog> {
        GiftCatalog::new(self.gifts.clone())
    }
}

/// Bank account guests can deposit into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BankAccount {
    pub bank: String,
    pub holder: String,
    pub currency: String,
    pub account_type: String,
    pub account_number: String,
    #[serde(default)]
    pub alias_or_iban: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
