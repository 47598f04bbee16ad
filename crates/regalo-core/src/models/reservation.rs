//! Reservation model

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::non_blank;

/// Display name used when a guest leaves the name blank.
pub const DEFAULT_GUEST_LABEL: &str = "Invitado";

/// Catalog key of a gift (e.g. `g1`).
///
/// Ids come from the site definition; the sync layer stores whatever it is
/// given and never checks catalog membership.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GiftId(String);

impl GiftId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GiftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for GiftId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GiftId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for GiftId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A guest's claim on one gift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftReservation {
    /// Who reserved it, never blank
    pub reserved_by: String,
    /// Optional message for the couple
    pub note: Option<String>,
    /// Server time on confirmed rows, client time on optimistic ones
    pub created_at: DateTime<Utc>,
}

impl GiftReservation {
    /// Create a reservation stamped with the current client time.
    ///
    /// Blank names fall back to [`DEFAULT_GUEST_LABEL`] and blank notes to `None`.
    #[must_use]
    pub fn new(reserved_by: &str, note: Option<&str>) -> Self {
        Self {
            reserved_by: normalize_guest_name(reserved_by),
            note: normalize_note(note),
            created_at: Utc::now(),
        }
    }

    /// Anonymous reservation used when no backend is configured.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(DEFAULT_GUEST_LABEL, None)
    }
}

/// Local mirror of the remote table. A gift is reserved iff its key is present.
pub type ReservationTable = BTreeMap<GiftId, GiftReservation>;

/// Trim a guest name, substituting the placeholder label when empty.
pub fn normalize_guest_name(name: &str) -> String {
    non_blank(Some(name.to_string()))
        .unwrap_or_else(|| DEFAULT_GUEST_LABEL.to_string())
}

/// Trim a note, mapping blank text to `None`.
pub fn normalize_note(note: Option<&str>) -> Option<String> {
    non_blank(note.map(str::to_string))
}

/// Row shape of the remote `reservations` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRow {
    pub gift_id: GiftId,
    #[serde(default)]
    pub reserved_by: String,
    #[serde(default)]
    pub note: Option<String>,
    /// Omitted on upserts so the server assigns it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ReservationRow {
    /// Outbound upsert payload for a reservation.
    #[must_use]
    pub fn for_upsert(gift_id: &GiftId, reservation: &GiftReservation) -> Self {
        Self {
            gift_id: gift_id.clone(),
            reserved_by: reservation.reserved_by.clone(),
            note: reservation.note.clone(),
            created_at: None,
        }
    }

    /// Row as the remote table would hold it after a confirmed write.
    #[must_use]
    pub fn stored(gift_id: &GiftId, reservation: &GiftReservation) -> Self {
        Self {
            created_at: Some(reservation.created_at),
            ..Self::for_upsert(gift_id, reservation)
        }
    }

    /// Convert into a table entry, normalizing blank fields.
    ///
    /// Rows without `created_at` get the current client time.
    #[must_use]
    pub fn into_entry(self) -> (GiftId, GiftReservation) {
        let reservation = GiftReservation {
            reserved_by: normalize_guest_name(&self.reserved_by),
            note: normalize_note(self.note.as_deref()),
            created_at: self.created_at.unwrap_or_else(Utc::now),
        };
        (self.gift_id, reservation)
    }
}
