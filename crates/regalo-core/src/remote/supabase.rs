//! Supabase PostgREST client for the reservations table.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::ReservationBackend;
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::feed::{spawn_polling_feed, RowSnapshot, Subscription};
use crate::models::{GiftId, ReservationRow};
use crate::util::error_excerpt;

const SELECT_COLUMNS: &str = "gift_id,reserved_by,note,created_at";

#[derive(Clone)]
pub struct SupabaseReservationClient {
    table_url: String,
    anon_key: String,
    poll_interval: Duration,
    client: Client,
}

impl std::fmt::Debug for SupabaseReservationClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SupabaseReservationClient")
            .field("table_url", &self.table_url)
            .field("anon_key", &"[REDACTED]")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl SupabaseReservationClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            table_url: config.table_url(),
            anon_key: config.anon_key.clone(),
            poll_interval: config.poll_interval,
            client: Client::builder().timeout(config.request_timeout).build()?,
        })
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Accept", "application/json")
    }

    async fn fetch_rows(&self) -> Result<Vec<ReservationRow>> {
        tracing::debug!("Fetching reservations from {}", self.table_url);
        let request = self.authorized(
            self.client
                .get(&self.table_url)
                .query(&[("select", SELECT_COLUMNS)]),
        );
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json::<Vec<ReservationRow>>().await?)
    }
}

impl ReservationBackend for SupabaseReservationClient {
    async fn fetch_all(&self) -> Result<Vec<ReservationRow>> {
        self.fetch_rows().await
    }

    async fn upsert(&self, row: &ReservationRow) -> Result<Option<ReservationRow>> {
        tracing::debug!("Upserting reservation for gift {}", row.gift_id);
        let request = self.authorized(
            self.client
                .post(&self.table_url)
                .query(&[("on_conflict", "gift_id")])
                .header("Prefer", "resolution=merge-duplicates,return=representation")
                .json(row),
        );
        let response = ensure_success(request.send().await?).await?;

        // PostgREST answers with an array of affected rows; an empty body is fine.
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let rows = serde_json::from_str::<Vec<ReservationRow>>(&body)?;
        Ok(rows.into_iter().find(|stored| stored.gift_id == row.gift_id))
    }

    async fn delete(&self, gift_id: &GiftId) -> Result<()> {
        tracing::debug!("Deleting reservation for gift {}", gift_id);
        let request = self.authorized(
            self.client
                .delete(&self.table_url)
                .query(&[("gift_id", format!("eq.{gift_id}"))]),
        );
        ensure_success(request.send().await?).await?;
        Ok(())
    }

    fn subscribe(&self, baseline: RowSnapshot) -> Result<Subscription> {
        tracing::info!(
            "Watching {} for changes every {:?}",
            self.table_url,
            self.poll_interval
        );
        let client = self.clone();
        Ok(spawn_polling_feed(self.poll_interval, baseline, move || {
            let client = client.clone();
            async move { client.fetch_rows().await }
        }))
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api(parse_api_error(status, &body)))
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    error: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            let detail = payload.details.or(payload.hint);
            return match detail {
                Some(detail) => format!(
                    "{}: {} ({})",
                    message.trim(),
                    detail.trim(),
                    status.as_u16()
                ),
                None => format!("{} ({})", message.trim(), status.as_u16()),
            };
        }
    }

    let trimmed = error_excerpt(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::Mutex;

    use super::*;

    /// Serve one canned HTTP response and capture the raw request.
    async fn spawn_one_shot_server(status_line: &str, body: &str) -> (String, Arc<Mutex<String>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let address = listener.local_addr().expect("local address");
        let captured = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&captured);
        let body = body.to_string();
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let request = read_request(&mut socket).await;
                *sink.lock().await = request;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (format!("http://{address}"), captured)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut raw = Vec::new();
        let mut chunk = [0_u8; 1024];
        loop {
            let read = socket.read(&mut chunk).await.unwrap_or(0);
            if read == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&raw).to_string();
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if raw.len() >= header_end + 4 + content_length {
                break;
            }
        }
        String::from_utf8_lossy(&raw).to_string()
    }

    fn client_for(url: &str) -> SupabaseReservationClient {
        let config = BackendConfig::new(url, "anon-key").unwrap();
        SupabaseReservationClient::new(&config).unwrap()
    }

    #[test]
    fn parse_api_error_prefers_postgrest_message() {
        let body = r#"{"code":"42501","message":"permission denied","details":null,"hint":"check RLS"}"#;
        assert_eq!(
            parse_api_error(StatusCode::FORBIDDEN, body),
            "permission denied: check RLS (403)"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, "upstream"), "upstream (502)");
    }

    #[test]
    fn debug_redacts_anon_key() {
        let rendered = format!("{:?}", client_for("https://demo.supabase.co"));
        assert!(!rendered.contains("anon-key"));
        assert!(rendered.contains("https://demo.supabase.co/rest/v1/reservations"));
    }

    #[tokio::test]
    async fn fetch_all_parses_rows_and_sends_auth_headers() {
        let body = r#"[{"gift_id":"g2","reserved_by":"Ana","note":"Con cariño","created_at":"2025-11-01T12:00:00+00:00"}]"#;
        let (url, captured) = spawn_one_shot_server("200 OK", body).await;

        let rows = client_for(&url).fetch_all().await.expect("fetch should succeed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].gift_id.as_str(), "g2");
        assert_eq!(rows[0].note.as_deref(), Some("Con cariño"));

        let request = captured.lock().await.clone();
        assert!(request.starts_with("GET /rest/v1/reservations?select="));
        assert!(request.to_ascii_lowercase().contains("apikey: anon-key"));
        assert!(request.contains("Bearer anon-key"));
    }

    #[tokio::test]
    async fn upsert_posts_on_conflict_and_returns_stored_row() {
        let body = r#"[{"gift_id":"g1","reserved_by":"Ana","note":null,"created_at":"2025-11-01T12:00:00+00:00"}]"#;
        let (url, captured) = spawn_one_shot_server("201 Created", body).await;

        let row = ReservationRow {
            gift_id: GiftId::from("g1"),
            reserved_by: "Ana".to_string(),
            note: None,
            created_at: None,
        };
        let stored = client_for(&url).upsert(&row).await.unwrap().unwrap();
        assert!(stored.created_at.is_some());

        let request = captured.lock().await.clone();
        assert!(request.starts_with("POST /rest/v1/reservations?on_conflict=gift_id"));
        assert!(request.contains("resolution=merge-duplicates"));
        assert!(request.contains(r#""reserved_by":"Ana""#));
        assert!(!request.contains("created_at"));
    }

    #[tokio::test]
    async fn delete_filters_by_gift_id() {
        let (url, captured) = spawn_one_shot_server("204 No Content", "").await;

        client_for(&url).delete(&GiftId::from("g7")).await.unwrap();
        let request = captured.lock().await.clone();
        assert!(request.starts_with("DELETE /rest/v1/reservations?gift_id=eq.g7"));
    }

    #[tokio::test]
    async fn http_failure_surfaces_api_error() {
        let (url, _) =
            spawn_one_shot_server("401 Unauthorized", r#"{"message":"Invalid API key"}"#).await;

        let error = client_for(&url).delete(&GiftId::from("g1")).await.unwrap_err();
        assert!(matches!(error, Error::Api(_)));
        assert!(error.to_string().contains("Invalid API key (401)"));
    }
}
