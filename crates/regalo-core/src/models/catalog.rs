//! Gift catalog model

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::GiftId;
use crate::error::{Error, Result};

/// Marker URL for gifts paid through the bank-account list.
pub const TRANSFER_GIFT_URL: &str = "modal:transfer";

/// An item on the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Gift {
    pub id: GiftId,
    pub title: String,
    /// Suggested amount
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl Gift {
    /// Whether guests pay for this gift by bank transfer.
    #[must_use]
    pub fn is_bank_transfer(&self) -> bool {
        self.url.as_deref() == Some(TRANSFER_GIFT_URL)
    }

    /// External shop link, if any.
    #[must_use]
    pub fn shop_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|url| *url != TRANSFER_GIFT_URL && *url != "#" && !url.trim().is_empty())
    }
}

/// Read-only, validated list of gifts in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GiftCatalog {
    gifts: Vec<Gift>,
}

impl GiftCatalog {
    /// Build a catalog, rejecting blank or duplicate ids.
    pub fn new(gifts: Vec<Gift>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(gifts.len());
        for gift in &gifts {
            if gift.id.as_str().trim().is_empty() {
                return Err(Error::Config(format!(
                    "gift '{}' has an empty id",
                    gift.title
                )));
            }
            if !seen.insert(gift.id.as_str()) {
                return Err(Error::Config(format!("duplicate gift id '{}'", gift.id)));
            }
        }
        Ok(Self { gifts })
    }

    pub fn get(&self, id: &str) -> Option<&Gift> {
        self.gifts.iter().find(|gift| gift.id.as_str() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Gift> {
        self.gifts.iter()
    }

    pub fn len(&self) -> usize {
        self.gifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gifts.is_empty()
    }
}
