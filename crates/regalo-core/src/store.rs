//! Reservation store: the local reservation table and its sync with the remote one.
//!
//! Writes are optimistic. `reserve` and `release` change the local table
//! first, then call the backend, and restore the captured pre-image if the
//! call fails or times out. A rollback only happens while the entry still
//! holds the value this call wrote; if a change event replaced it in the
//! meantime, the newer remote state wins.
//!
//! Without a backend the store runs in local-only mode: writes touch only
//! the in-process table and nothing is persisted.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};

use crate::config::{BackendConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::{Error, Result};
use crate::feed::{ChangeEvent, RowSnapshot, Subscription, FEED_BUFFER};
use crate::models::{Gift, GiftCatalog, GiftId, GiftReservation, ReservationRow, ReservationTable};
use crate::remote::{ReservationBackend, SupabaseReservationClient};
use crate::state::SyncState;

/// A catalog gift together with its current reservation, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct GiftStatus {
    pub gift: Gift,
    pub reservation: Option<GiftReservation>,
}

impl GiftStatus {
    pub const fn is_reserved(&self) -> bool {
        self.reservation.is_some()
    }
}

pub struct ReservationStore<B> {
    backend: Option<Arc<B>>,
    catalog: Arc<GiftCatalog>,
    table: Arc<RwLock<ReservationTable>>,
    state: Arc<RwLock<SyncState>>,
    request_timeout: Duration,
}

impl<B> Clone for ReservationStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            catalog: Arc::clone(&self.catalog),
            table: Arc::clone(&self.table),
            state: Arc::clone(&self.state),
            request_timeout: self.request_timeout,
        }
    }
}

impl ReservationStore<SupabaseReservationClient> {
    /// Build a store for the given backend config, or a local-only store for `None`.
    pub fn from_config(config: Option<&BackendConfig>, catalog: GiftCatalog) -> Result<Self> {
        match config {
            Some(config) => {
                tracing::info!("Reservation sync enabled with Supabase: {}", config.url);
                let client = SupabaseReservationClient::new(config)?;
                Ok(Self::new(client, catalog).with_request_timeout(config.request_timeout))
            }
            None => {
                tracing::info!("Running in local-only mode (no reservation backend config)");
                Ok(Self::local_only(catalog))
            }
        }
    }
}

impl<B: ReservationBackend> ReservationStore<B> {
    pub fn new(backend: B, catalog: GiftCatalog) -> Self {
        Self::build(Some(Arc::new(backend)), catalog, SyncState::Idle)
    }

    pub fn local_only(catalog: GiftCatalog) -> Self {
        Self::build(None, catalog, SyncState::LocalOnly)
    }

    fn build(backend: Option<Arc<B>>, catalog: GiftCatalog, state: SyncState) -> Self {
        Self {
            backend,
            catalog: Arc::new(catalog),
            table: Arc::new(RwLock::new(ReservationTable::new())),
            state: Arc::new(RwLock::new(state)),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub const fn is_remote(&self) -> bool {
        self.backend.is_some()
    }

    pub fn catalog(&self) -> &GiftCatalog {
        &self.catalog
    }

    pub async fn state(&self) -> SyncState {
        *self.state.read().await
    }

    /// Replace the local table with the full remote table.
    ///
    /// On failure the table is left empty and the state becomes
    /// [`SyncState::Unknown`]; the caller gets
    /// [`Error::ReservationStateUnknown`], never an "all gifts free" result.
    /// In local-only mode this is a no-op.
    pub async fn load(&self) -> Result<usize> {
        let Some(backend) = self.backend.as_ref() else {
            return Ok(self.table.read().await.len());
        };

        self.set_state(SyncState::Loading).await;
        match self.remote_call(backend.fetch_all()).await {
            Ok(rows) => {
                let table = rows
                    .into_iter()
                    .map(ReservationRow::into_entry)
                    .collect::<ReservationTable>();
                let count = table.len();
                *self.table.write().await = table;
                self.set_state(SyncState::Synced).await;
                tracing::info!("Loaded {} reservations", count);
                Ok(count)
            }
            Err(error) => {
                self.table.write().await.clear();
                self.set_state(SyncState::Unknown).await;
                tracing::warn!("Failed to load reservations: {}", error);
                Err(Error::ReservationStateUnknown(error.to_string()))
            }
        }
    }

    /// Start applying remote changes to the local table.
    ///
    /// The backend feed reports against the current table, so changes missed
    /// since the last `load` arrive first. The returned subscription yields
    /// each event that actually changed the table. Dropping it, or calling `unsubscribe`, stops the sync task and
    /// releases the backend feed.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let backend = self.backend.as_ref().ok_or(Error::LocalOnly)?;
        let mut feed = {
            let table = self.table.read().await;
            backend.subscribe(snapshot_of_table(&table))?
        };
        let table = Arc::clone(&self.table);
        let (tx, rx) = mpsc::channel(FEED_BUFFER);

        let task = tokio::spawn(async move {
            while let Some(event) = feed.next().await {
                let changed = apply_change(&mut *table.write().await, &event);
                if !changed {
                    continue;
                }
                tracing::debug!("Applied remote {} for gift {}", event.kind(), event.gift_id());
                if let Err(mpsc::error::TrySendError::Full(event)) = tx.try_send(event) {
                    tracing::debug!(
                        "Change listener is behind; dropped notification for gift {}",
                        event.gift_id()
                    );
                }
            }
            tracing::debug!("Reservation change feed ended");
        });

        Ok(Subscription::new(rx, task))
    }

    /// Apply one change event received from outside the store's own feed.
    pub async fn apply_event(&self, event: &ChangeEvent) -> bool {
        apply_change(&mut *self.table.write().await, event)
    }

    /// Claim a gift.
    ///
    /// Blank names become the guest placeholder and blank notes become `None`.
    /// This overwrites any existing reservation for the gift: there is no
    /// ownership or version check. In local-only mode the reservation is
    /// anonymous and nothing leaves the process.
    pub async fn reserve(
        &self,
        gift_id: impl Into<GiftId>,
        reserved_by: &str,
        note: Option<&str>,
    ) -> Result<GiftReservation> {
        let gift_id = require_gift_id(gift_id.into())?;

        let Some(backend) = self.backend.as_ref() else {
            let reservation = GiftReservation::placeholder();
            self.table
                .write()
                .await
                .insert(gift_id.clone(), reservation.clone());
            tracing::info!("Reserved gift {} locally", gift_id);
            return Ok(reservation);
        };

        let optimistic = GiftReservation::new(reserved_by, note);
        let previous = self
            .table
            .write()
            .await
            .insert(gift_id.clone(), optimistic.clone());

        let row = ReservationRow::for_upsert(&gift_id, &optimistic);
        match self.remote_call(backend.upsert(&row)).await {
            Ok(stored) => {
                // The last completed write wins locally, even if a load or a
                // change event replaced the optimistic entry meanwhile.
                let confirmed = stored.map_or(optimistic, |stored| stored.into_entry().1);
                self.table
                    .write()
                    .await
                    .insert(gift_id.clone(), confirmed.clone());
                tracing::info!("Reserved gift {} for {}", gift_id, confirmed.reserved_by);
                Ok(confirmed)
            }
            Err(error) => {
                self.rollback(&gift_id, Some(&optimistic), previous).await;
                tracing::warn!("Failed to reserve gift {}: {}", gift_id, error);
                Err(error)
            }
        }
    }

    /// Free a gift, returning the reservation that was removed locally.
    ///
    /// Asking the guest for confirmation is up to the caller.
    pub async fn release(&self, gift_id: impl Into<GiftId>) -> Result<Option<GiftReservation>> {
        let gift_id = require_gift_id(gift_id.into())?;
        let previous = self.table.write().await.remove(gift_id.as_str());

        let Some(backend) = self.backend.as_ref() else {
            tracing::info!("Released gift {} locally", gift_id);
            return Ok(previous);
        };

        match self.remote_call(backend.delete(&gift_id)).await {
            Ok(()) => {
                tracing::info!("Released gift {}", gift_id);
                Ok(previous)
            }
            Err(error) => {
                self.rollback(&gift_id, None, previous).await;
                tracing::warn!("Failed to release gift {}: {}", gift_id, error);
                Err(error)
            }
        }
    }

    pub async fn get(&self, gift_id: &str) -> Option<GiftReservation> {
        self.table.read().await.get(gift_id).cloned()
    }

    pub async fn is_reserved(&self, gift_id: &str) -> bool {
        self.table.read().await.contains_key(gift_id)
    }

    pub async fn snapshot(&self) -> ReservationTable {
        self.table.read().await.clone()
    }

    /// Every catalog gift, in catalog order, with its reservation state.
    pub async fn gift_statuses(&self) -> Vec<GiftStatus> {
        let table = self.table.read().await;
        self.catalog
            .iter()
            .map(|gift| GiftStatus {
                gift: gift.clone(),
                reservation: table.get(gift.id.as_str()).cloned(),
            })
            .collect()
    }

    async fn set_state(&self, state: SyncState) {
        *self.state.write().await = state;
    }

    async fn remote_call<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| Error::Timeout(self.request_timeout))?
    }

    async fn rollback(
        &self,
        gift_id: &GiftId,
        optimistic: Option<&GiftReservation>,
        previous: Option<GiftReservation>,
    ) {
        if self.replace_if_current(gift_id, optimistic, previous).await {
            tracing::warn!("Rolled back optimistic change for gift {}", gift_id);
        } else {
            tracing::warn!(
                "Skipped rollback for gift {}: entry changed remotely in the meantime",
                gift_id
            );
        }
    }

    /// Set the entry to `replacement` only if it still equals `expected`.
    async fn replace_if_current(
        &self,
        gift_id: &GiftId,
        expected: Option<&GiftReservation>,
        replacement: Option<GiftReservation>,
    ) -> bool {
        let mut table = self.table.write().await;
        if table.get(gift_id.as_str()) != expected {
            return false;
        }
        match replacement {
            Some(reservation) => {
                table.insert(gift_id.clone(), reservation);
            }
            None => {
                table.remove(gift_id.as_str());
            }
        }
        true
    }
}

/// The local table in wire form, as the baseline a new feed reports against.
fn snapshot_of_table(table: &ReservationTable) -> RowSnapshot {
    table
        .iter()
        .map(|(gift_id, reservation)| {
            (gift_id.clone(), ReservationRow::stored(gift_id, reservation))
        })
        .collect()
}

fn require_gift_id(gift_id: GiftId) -> Result<GiftId> {
    if gift_id.as_str().trim().is_empty() {
        return Err(Error::InvalidInput("gift id must not be empty".to_string()));
    }
    Ok(gift_id)
}

/// Apply a change event to a table. Returns whether the table changed.
///
/// Inserts and updates overwrite the whole entry; deletes remove it.
pub fn apply_change(table: &mut ReservationTable, event: &ChangeEvent) -> bool {
    match event {
        ChangeEvent::Inserted(row) | ChangeEvent::Updated(row) => {
            let (gift_id, reservation) = row.clone().into_entry();
            if table.get(&gift_id) == Some(&reservation) {
                return false;
            }
            table.insert(gift_id, reservation);
            true
        }
        ChangeEvent::Deleted(row) => table.remove(row.gift_id.as_str()).is_some(),
    }
}
