// HTTP client for the draft server API.
//
// The server owns players and committed picks; this client only submits and
// fetches them. Every call is awaited to completion before the caller moves
// on, so a pick's acknowledgment always precedes any rotation change.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::players::{DraftPickRecord, PickRequest, PlayerPool};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a usable response.
    #[error("{0}")]
    Network(String),

    /// The server answered with a failure status or an `error` field.
    #[error("{message}")]
    Server {
        status: Option<u16>,
        message: String,
    },
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Network(format!("Network error: {e}"))
    }
}

// ---------------------------------------------------------------------------
// Fallback messages when the server gives no `error` field
// ---------------------------------------------------------------------------

pub const SUBMIT_PICK_FALLBACK: &str = "Failed to draft player";
pub const REMOVE_PICK_FALLBACK: &str = "Failed to remove draft pick";
pub const FETCH_PLAYERS_FALLBACK: &str = "Failed to fetch players";
pub const FETCH_PICKS_FALLBACK: &str = "Failed to fetch draft data";
pub const RESET_FALLBACK: &str = "Failed to reset draft";

// ---------------------------------------------------------------------------
// DraftApi
// ---------------------------------------------------------------------------

/// Operations the draft client needs from the server.
#[async_trait]
pub trait DraftApi: Send + Sync {
    async fn submit_pick(&self, pick: &PickRequest) -> Result<(), ApiError>;
    async fn remove_pick(&self, pick_id: i64) -> Result<(), ApiError>;
    async fn available_players(&self) -> Result<PlayerPool, ApiError>;
    async fn draft_picks(&self) -> Result<Vec<DraftPickRecord>, ApiError>;
    async fn reset_picks(&self) -> Result<(), ApiError>;
}

/// `DraftApi` over HTTP with `reqwest`.
pub struct HttpDraftApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDraftApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "API response");
        parse_response(status, &body, fallback)
    }
}

#[async_trait]
impl DraftApi for HttpDraftApi {
    async fn submit_pick(&self, pick: &PickRequest) -> Result<(), ApiError> {
        let request = self.http.post(self.url("/api/draft_pick")).json(pick);
        let _: Value = self.send(request, SUBMIT_PICK_FALLBACK).await?;
        Ok(())
    }

    async fn remove_pick(&self, pick_id: i64) -> Result<(), ApiError> {
        let request = self
            .http
            .delete(self.url(&format!("/api/draft_pick/{pick_id}")));
        let _: Value = self.send(request, REMOVE_PICK_FALLBACK).await?;
        Ok(())
    }

    async fn available_players(&self) -> Result<PlayerPool, ApiError> {
        let request = self.http.get(self.url("/api/available_players"));
        self.send(request, FETCH_PLAYERS_FALLBACK).await
    }

    async fn draft_picks(&self) -> Result<Vec<DraftPickRecord>, ApiError> {
        let request = self.http.get(self.url("/api/draft_picks"));
        self.send(request, FETCH_PICKS_FALLBACK).await
    }

    async fn reset_picks(&self) -> Result<(), ApiError> {
        let request = self
            .http
            .post(self.url("/api/draft_picks/reset"))
            .header("content-type", "application/json");
        let _: Value = self.send(request, RESET_FALLBACK).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response classification
// ---------------------------------------------------------------------------

/// Turn a status and body into a typed result.
///
/// Non-2xx responses and 2xx objects carrying an `error` field are server
/// errors; the server's message is used when present, else `fallback`.
pub(crate) fn parse_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    fallback: &str,
) -> Result<T, ApiError> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let server_message = parsed.as_ref().and_then(extract_error);

    if !status.is_success() {
        warn!(%status, "API request failed");
        return Err(ApiError::Server {
            status: Some(status.as_u16()),
            message: server_message.unwrap_or_else(|| fallback.to_string()),
        });
    }

    if let Some(message) = server_message {
        return Err(ApiError::Server {
            status: Some(status.as_u16()),
            message,
        });
    }

    let value = parsed.ok_or_else(|| ApiError::Network(format!("{fallback}: invalid JSON")))?;
    serde_json::from_value(value)
        .map_err(|e| ApiError::Network(format!("{fallback}: unexpected response ({e})")))
}

/// Pull a non-empty `error` string out of a JSON object body.
fn extract_error(body: &Value) -> Option<String> {
    body.get("error")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_decodes() {
        let pool: PlayerPool = parse_response(
            StatusCode::OK,
            r#"{"all": [{"id": 1, "name": "A"}], "undrafted": [{"id": 1, "name": "A"}], "drafted": []}"#,
            FETCH_PLAYERS_FALLBACK,
        )
        .unwrap();
        assert_eq!(pool.all.len(), 1);
        assert_eq!(pool.undrafted[0].name, "A");
    }

    #[test]
    fn error_status_uses_server_message() {
        let err = parse_response::<Value>(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Player already drafted"}"#,
            SUBMIT_PICK_FALLBACK,
        )
        .unwrap_err();
        match err {
            ApiError::Server { status, message } => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "Player already drafted");
            }
            other => panic!("expected Server error, got {other:?}"),
        }
    }

    #[test]
    fn error_status_without_body_uses_fallback() {
        let err = parse_response::<Value>(
            StatusCode::NOT_FOUND,
            "<html>not found</html>",
            REMOVE_PICK_FALLBACK,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Failed to remove draft pick");
    }

    #[test]
    fn error_field_on_success_status_is_an_error() {
        let err = parse_response::<Value>(
            StatusCode::OK,
            r#"{"error": "Missing required fields"}"#,
            SUBMIT_PICK_FALLBACK,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Server { status: Some(200), .. }));
        assert_eq!(err.to_string(), "Missing required fields");
    }

    #[test]
    fn malformed_success_body_is_network_error() {
        let err = parse_response::<Vec<DraftPickRecord>>(
            StatusCode::OK,
            "not json",
            FETCH_PICKS_FALLBACK,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert!(err.to_string().starts_with("Failed to fetch draft data"));
    }

    #[test]
    fn pick_list_body_decodes() {
        let picks: Vec<DraftPickRecord> = parse_response(
            StatusCode::OK,
            r#"[{"id": 1, "participant_id": 2, "participant_name": "Bob",
                 "player_name": "P", "draft_position": 1}]"#,
            FETCH_PICKS_FALLBACK,
        )
        .unwrap();
        assert_eq!(picks[0].participant_id, "2");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpDraftApi::new("http://localhost:5000/");
        assert_eq!(api.url("/api/draft_picks"), "http://localhost:5000/api/draft_picks");
    }
}
