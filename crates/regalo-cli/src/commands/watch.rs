use std::path::Path;

use regalo_core::feed::ChangeEvent;
use regalo_core::models::{normalize_guest_name, normalize_note, GiftCatalog};
use serde::Serialize;

use crate::commands::common::{format_gift_line, load_site, open_store};
use crate::error::CliError;

pub async fn run_watch(json: bool, site_path: &Path) -> Result<(), CliError> {
    let site = load_site(site_path)?;
    let store = open_store(&site)?;
    if !store.is_remote() {
        return Err(CliError::WatchNeedsBackend);
    }

    store.load().await?;
    if !json {
        for status in store.gift_statuses().await {
            println!("{}", format_gift_line(&status));
        }
        println!("Watching for changes (Ctrl-C to stop)...");
    }

    let mut live = store.subscribe().await?;
    loop {
        tokio::select! {
            event = live.next() => {
                let Some(event) = event else {
                    return Err(regalo_core::Error::SubscriptionClosed.into());
                };
                if json {
                    println!("{}", serde_json::to_string(&event_to_item(&event))?);
                } else {
                    println!("{}", format_event_line(store.catalog(), &event));
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }
    live.unsubscribe();

    Ok(())
}

pub fn format_event_line(catalog: &GiftCatalog, event: &ChangeEvent) -> String {
    let row = event.row();
    let title = catalog
        .get(row.gift_id.as_str())
        .map_or_else(|| row.gift_id.to_string(), |gift| gift.title.clone());
    let guest = normalize_guest_name(&row.reserved_by);
    match event {
        ChangeEvent::Inserted(_) => format!("+ {title} reserved by {guest}"),
        ChangeEvent::Updated(_) => format!("~ {title} now reserved by {guest}"),
        ChangeEvent::Deleted(_) => format!("- {title} is available again"),
    }
}

#[derive(Debug, Serialize)]
pub struct EventItem {
    pub event: &'static str,
    pub gift_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub fn event_to_item(event: &ChangeEvent) -> EventItem {
    let row = event.row();
    let deleted = matches!(event, ChangeEvent::Deleted(_));
    EventItem {
        event: event.kind(),
        gift_id: row.gift_id.to_string(),
        reserved_by: (!deleted).then(|| normalize_guest_name(&row.reserved_by)),
        note: if deleted { None } else { normalize_note(row.note.as_deref()) },
    }
}
