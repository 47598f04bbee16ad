//! In-process reservations table.
//!
//! Behaves like the hosted table (server timestamps, upsert keeps the original
//! `created_at`, every write is echoed on the change feed) and can be told to
//! fail or stall, which makes it the backend of choice for tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};

use super::ReservationBackend;
use crate::error::{Error, Result};
use crate::feed::{diff_snapshots, ChangeEvent, RowSnapshot, Subscription, FEED_BUFFER};
use crate::models::{GiftId, ReservationRow};

#[derive(Debug, Default)]
struct MemoryState {
    rows: BTreeMap<GiftId, ReservationRow>,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(FEED_BUFFER);
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            events,
        }
    }

    /// Seed the table without emitting change events.
    #[must_use]
    pub fn with_rows(self, rows: impl IntoIterator<Item = ReservationRow>) -> Self {
        {
            let mut state = self.lock();
            for mut row in rows {
                row.created_at.get_or_insert_with(Utc::now);
                state.rows.insert(row.gift_id.clone(), row);
            }
        }
        self
    }

    /// Make every following call fail with `message`, or succeed again with `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        self.lock().failure = message.map(str::to_string);
    }

    /// Stall every following call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    /// Number of fetch/upsert/delete calls received so far.
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }

    pub fn rows(&self) -> Vec<ReservationRow> {
        self.lock().rows.values().cloned().collect()
    }

    pub fn row(&self, gift_id: &str) -> Option<ReservationRow> {
        self.lock().rows.get(gift_id).cloned()
    }

    /// Write a row as another client would, bypassing failure injection.
    pub fn external_upsert(&self, row: ReservationRow) -> ReservationRow {
        self.store(row)
    }

    /// Delete a row as another client would, bypassing failure injection.
    pub fn external_delete(&self, gift_id: &str) {
        self.remove(gift_id);
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn begin_call(&self) -> Result<()> {
        let (failure, delay) = {
            let mut state = self.lock();
            state.calls += 1;
            (state.failure.clone(), state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(message) => Err(Error::Api(message)),
            None => Ok(()),
        }
    }

    // Events are sent under the lock so `subscribe` never misses a write
    // between its catch-up diff and the live stream.
    fn store(&self, mut row: ReservationRow) -> ReservationRow {
        let mut state = self.lock();
        let event = match state.rows.get(&row.gift_id) {
            Some(existing) => {
                row.created_at = existing.created_at.or_else(|| Some(Utc::now()));
                ChangeEvent::Updated(row.clone())
            }
            None => {
                row.created_at.get_or_insert_with(Utc::now);
                ChangeEvent::Inserted(row.clone())
            }
        };
        state.rows.insert(row.gift_id.clone(), row.clone());
        // No receivers is fine.
        let _ = self.events.send(event);
        row
    }

    fn remove(&self, gift_id: &str) {
        let mut state = self.lock();
        if let Some(row) = state.rows.remove(gift_id) {
            let _ = self.events.send(ChangeEvent::Deleted(row));
        }
    }
}

impl ReservationBackend for MemoryBackend {
    async fn fetch_all(&self) -> Result<Vec<ReservationRow>> {
        self.begin_call().await?;
        Ok(self.rows())
    }

    async fn upsert(&self, row: &ReservationRow) -> Result<Option<ReservationRow>> {
        self.begin_call().await?;
        Ok(Some(self.store(row.clone())))
    }

    async fn delete(&self, gift_id: &GiftId) -> Result<()> {
        self.begin_call().await?;
        self.remove(gift_id.as_str());
        Ok(())
    }

    fn subscribe(&self, baseline: RowSnapshot) -> Result<Subscription> {
        let (catch_up, mut source) = {
            let state = self.lock();
            (diff_snapshots(&baseline, &state.rows), self.events.subscribe())
        };
        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let task = tokio::spawn(async move {
            for event in catch_up {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            loop {
                match source.recv().await {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Change feed lagged; skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(Subscription::new(rx, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(gift_id: &str, reserved_by: &str) -> ReservationRow {
        ReservationRow {
            gift_id: GiftId::from(gift_id),
            reserved_by: reserved_by.to_string(),
            note: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn upsert_keeps_original_created_at() {
        let backend = MemoryBackend::new();
        let first = backend.upsert(&row("g1", "Ana")).await.unwrap().unwrap();
        let second = backend.upsert(&row("g1", "Luis")).await.unwrap().unwrap();

        assert_eq!(second.reserved_by, "Luis");
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(backend.rows().len(), 1);
    }

    #[tokio::test]
    async fn failure_injection_applies_to_every_call() {
        let backend = MemoryBackend::new().with_rows([row("g1", "Ana")]);
        backend.set_failure(Some("boom"));

        assert!(backend.fetch_all().await.is_err());
        assert!(backend.delete(&GiftId::from("g1")).await.is_err());
        assert!(backend.row("g1").is_some());
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn subscribe_catches_up_from_baseline() {
        let backend = MemoryBackend::new().with_rows([row("g1", "Ana")]);
        let stale = row("g2", "Luis");
        let baseline = RowSnapshot::from([(stale.gift_id.clone(), stale.clone())]);

        let mut feed = backend.subscribe(baseline).unwrap();
        backend.external_delete("g1");

        assert!(matches!(feed.next().await, Some(ChangeEvent::Inserted(r)) if r.reserved_by == "Ana"));
        assert_eq!(feed.next().await, Some(ChangeEvent::Deleted(stale)));
        assert!(matches!(feed.next().await, Some(ChangeEvent::Deleted(r)) if r.gift_id.as_str() == "g1"));
    }

    #[tokio::test]
    async fn subscribe_echoes_writes() {
        let backend = MemoryBackend::new();
        let mut feed = backend.subscribe(RowSnapshot::new()).unwrap();

        backend.upsert(&row("g1", "Ana")).await.unwrap();
        backend.external_delete("g1");

        assert!(matches!(feed.next().await, Some(ChangeEvent::Inserted(r)) if r.reserved_by == "Ana"));
        assert!(matches!(feed.next().await, Some(ChangeEvent::Deleted(r)) if r.gift_id.as_str() == "g1"));
    }
}
