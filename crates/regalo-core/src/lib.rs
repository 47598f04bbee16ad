//! regalo-core - Core library for Regalo
//!
//! This crate contains the gift catalog and site definition, the reservation
//! model, the remote backend clients, and the `ReservationStore` that keeps a
//! local reservation table in sync with the remote one.

pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod remote;
pub mod state;
pub mod store;
pub mod util;

pub use error::{Error, Result};
pub use models::{GiftCatalog, GiftId, GiftReservation, ReservationTable, SiteConfig};
pub use state::SyncState;
pub use store::{GiftStatus, ReservationStore};
