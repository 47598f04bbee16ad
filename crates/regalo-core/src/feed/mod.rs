//! Change feed for the remote reservations table.
//!
//! Every backend exposes the same inbound stream of tagged [`ChangeEvent`]s.
//! A [`Subscription`] owns the channel and the task producing it; dropping
//! the subscription (or calling [`Subscription::unsubscribe`]) stops that task.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::models::{GiftId, ReservationRow};

/// Capacity of the channel between a feed task and its consumer.
pub const FEED_BUFFER: usize = 64;

/// One change to the remote table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Inserted(ReservationRow),
    Updated(ReservationRow),
    /// Carries the old row; only `gift_id` is guaranteed to be set
    Deleted(ReservationRow),
}

impl ChangeEvent {
    pub const fn row(&self) -> &ReservationRow {
        match self {
            Self::Inserted(row) | Self::Updated(row) | Self::Deleted(row) => row,
        }
    }

    pub const fn gift_id(&self) -> &GiftId {
        &self.row().gift_id
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Inserted(_) => "insert",
            Self::Updated(_) => "update",
            Self::Deleted(_) => "delete",
        }
    }
}

/// Rows keyed by gift, as seen by one poll of the remote table.
pub type RowSnapshot = BTreeMap<GiftId, ReservationRow>;

pub fn snapshot_from_rows(rows: Vec<ReservationRow>) -> RowSnapshot {
    rows.into_iter()
        .map(|row| (row.gift_id.clone(), row))
        .collect()
}

/// Events that turn `previous` into `current`. Unchanged rows produce nothing.
pub fn diff_snapshots(previous: &RowSnapshot, current: &RowSnapshot) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for (gift_id, row) in current {
        match previous.get(gift_id) {
            None => events.push(ChangeEvent::Inserted(row.clone())),
            Some(old) if old != row => events.push(ChangeEvent::Updated(row.clone())),
            Some(_) => {}
        }
    }

    for (gift_id, row) in previous {
        if !current.contains_key(gift_id) {
            events.push(ChangeEvent::Deleted(row.clone()));
        }
    }

    events
}

#[derive(Debug, Deserialize)]
struct RealtimePayload {
    #[serde(rename = "eventType")]
    event_type: String,
    #[serde(default)]
    new: Option<serde_json::Value>,
    #[serde(default)]
    old: Option<serde_json::Value>,
}

/// Decode a Supabase realtime `postgres_changes` payload.
///
/// Malformed payloads are logged and skipped; they never end a feed.
pub fn decode_realtime_payload(payload: &serde_json::Value) -> Option<ChangeEvent> {
    let parsed = match RealtimePayload::deserialize(payload) {
        Ok(parsed) => parsed,
        Err(error) => {
            tracing::warn!("Ignoring malformed change payload: {}", error);
            return None;
        }
    };

    let (body, wrap): (_, fn(ReservationRow) -> ChangeEvent) =
        match parsed.event_type.as_str() {
            "INSERT" => (parsed.new, ChangeEvent::Inserted),
            "UPDATE" => (parsed.new, ChangeEvent::Updated),
            "DELETE" => (parsed.old, ChangeEvent::Deleted),
            other => {
                tracing::warn!("Ignoring change payload with unknown event type '{}'", other);
                return None;
            }
        };

    let Some(body) = body else {
        tracing::warn!("Ignoring {} payload without a row", parsed.event_type);
        return None;
    };

    match serde_json::from_value::<ReservationRow>(body) {
        Ok(row) => Some(wrap(row)),
        Err(error) => {
            tracing::warn!("Ignoring {} payload with bad row: {}", parsed.event_type, error);
            None
        }
    }
}

/// Live handle on a change feed.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<ChangeEvent>, task: JoinHandle<()>) -> Self {
        Self {
            events,
            task: Some(task),
        }
    }

    /// Wait for the next event. `None` once the feed is closed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the feed and release its channel.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.events.close();
            tracing::debug!("Change feed released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Emulate a change feed by polling the full table and diffing snapshots.
///
/// The first successful poll is diffed against `baseline`, so rows the
/// subscriber holds but the table lost arrive as `Deleted`. Failed polls are
/// logged and retried on the next tick. Must be called inside a tokio runtime.
pub fn spawn_polling_feed<F, Fut>(
    interval: Duration,
    baseline: RowSnapshot,
    mut fetch: F,
) -> Subscription
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<ReservationRow>>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(FEED_BUFFER);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut previous = baseline;

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }

            let current = match fetch().await {
                Ok(rows) => snapshot_from_rows(rows),
                Err(error) => {
                    tracing::warn!("Change feed poll failed: {}", error);
                    continue;
                }
            };

            for event in diff_snapshots(&previous, &current) {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            previous = current;
        }
    });

    Subscription::new(rx, task)
}
