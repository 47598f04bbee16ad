//! Data models for Regalo

mod catalog;
mod reservation;
mod site;

pub use catalog::{Gift, GiftCatalog, TRANSFER_GIFT_URL};
pub use reservation::{
    normalize_guest_name, normalize_note, GiftId, GiftReservation, ReservationRow,
    ReservationTable, DEFAULT_GUEST_LABEL,
};
pub use site::{BankAccount, SiteConfig};
