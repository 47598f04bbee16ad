//! Remote reservation backends.

mod memory;
mod supabase;

use std::future::Future;

pub use memory::MemoryBackend;
pub use supabase::SupabaseReservationClient;

use crate::error::Result;
use crate::feed::{RowSnapshot, Subscription};
use crate::models::{GiftId, ReservationRow};

/// Authoritative reservations table.
///
/// Writes are keyed by gift id with insert-or-replace semantics. There is no
/// version check: two guests reserving the same gift race, and the last write
/// wins.
pub trait ReservationBackend: Send + Sync + 'static {
    /// Read every row.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<ReservationRow>>> + Send;

    /// Insert or replace the row for `row.gift_id`.
    ///
    /// Returns the stored row when the backend echoes it back.
    fn upsert(
        &self,
        row: &ReservationRow,
    ) -> impl Future<Output = Result<Option<ReservationRow>>> + Send;

    /// Delete the row for `gift_id`. Deleting a missing row succeeds.
    fn delete(&self, gift_id: &GiftId) -> impl Future<Output = Result<()>> + Send;

    /// Open a change feed. Must be called inside a tokio runtime.
    ///
    /// `baseline` is what the subscriber currently holds. The feed first
    /// reports every difference between it and the table, then live changes.
    fn subscribe(&self, baseline: RowSnapshot) -> Result<Subscription>;
}
