//! HTTP client for the remote entry store

use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::RemoteConfig;
use crate::error::{RemoteError, Result};
use crate::models::{Entry, EntryId};
use crate::util::compact_text;

use super::{EntryRepresentation, RemoteEntryApi};

/// [`RemoteEntryApi`] over a JSON document collection.
///
/// `PUT {base}/{collection}/{id}` creates or replaces, `GET {base}/{collection}`
/// lists and `DELETE {base}/{collection}/{id}` removes. Every request carries
/// the configured bearer token.
#[derive(Clone)]
pub struct HttpRemoteEntryApi {
    config: RemoteConfig,
    client: reqwest::Client,
}

impl HttpRemoteEntryApi {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|error| RemoteError::InvalidConfiguration(error.to_string()))?;
        Ok(Self { config, client })
    }

    pub const fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn document_url(&self, id: &EntryId) -> String {
        format!("{}/{}", self.config.collection_url(), id)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body).into())
    }
}

impl RemoteEntryApi for HttpRemoteEntryApi {
    async fn push(&self, entry: &Entry) -> Result<()> {
        let response = self
            .client
            .put(self.document_url(&entry.id))
            .bearer_auth(self.config.api_token())
            .json(&EntryRepresentation::from(entry))
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(response).await?;
        tracing::debug!(entry_id = %entry.id, "Pushed entry to remote");
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<EntryRepresentation>> {
        let response = self
            .client
            .get(self.config.collection_url())
            .bearer_auth(self.config.api_token())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(transport_error)?;
        let documents = Self::check(response)
            .await?
            .json::<Vec<EntryRepresentation>>()
            .await
            .map_err(transport_error)?;
        tracing::debug!(count = documents.len(), "Fetched remote entries");
        Ok(documents)
    }

    async fn delete(&self, id: &EntryId) -> Result<()> {
        let response = self
            .client
            .delete(self.document_url(id))
            .bearer_auth(self.config.api_token())
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(response).await?;
        tracing::debug!(entry_id = %id, "Deleted remote entry");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return compact_text(&message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}

/// Map a non-success HTTP status onto the remote error taxonomy
fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let message = error_message(status, body);
    match status {
        StatusCode::REQUEST_TIMEOUT => RemoteError::Timeout,
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited,
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(message),
        StatusCode::FORBIDDEN => RemoteError::Forbidden(message),
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => RemoteError::Malformed(message),
        status if status.is_server_error() => RemoteError::Server {
            status: status.as_u16(),
            message,
        },
        status => RemoteError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

fn transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout
    } else if error.is_decode() {
        RemoteError::Malformed(error.to_string())
    } else if error.is_builder() {
        RemoteError::InvalidConfiguration(error.to_string())
    } else {
        RemoteError::Connectivity(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> HttpRemoteEntryApi {
        let config = RemoteConfig::new(server.uri(), "tok").unwrap();
        HttpRemoteEntryApi::new(config).unwrap()
    }

    fn task() -> Entry {
        Entry::task("Buy milk", NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), 10)
    }

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert!(matches!(status_error(StatusCode::REQUEST_TIMEOUT, ""), RemoteError::Timeout));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            RemoteError::RateLimited
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, ""),
            RemoteError::Server { status: 502, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, ""),
            RemoteError::Malformed(_)
        ));
        assert!(matches!(
            status_error(StatusCode::CONFLICT, ""),
            RemoteError::Rejected { status: 409, .. }
        ));
    }

    #[test]
    fn error_message_prefers_json_message() {
        let message = error_message(StatusCode::FORBIDDEN, r#"{"message":" nope "}"#);
        assert_eq!(message, "nope");
        assert_eq!(error_message(StatusCode::FORBIDDEN, ""), "HTTP 403");
    }

    #[tokio::test]
    async fn push_puts_document_with_bearer_token() {
        let server = MockServer::start().await;
        let entry = task();

        Mock::given(method("PUT"))
            .and(path(format!("/entries/{}", entry.id)))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(serde_json::json!({
                "title": "Buy milk",
                "type": "task",
                "dueDate": "2026-03-01"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        api(&server).push(&entry).await.unwrap();
    }

    #[tokio::test]
    async fn push_maps_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({ "error": "bad token" })),
            )
            .mount(&server)
            .await;

        let error = api(&server).push(&task()).await.unwrap_err();
        match error {
            Error::Remote(RemoteError::Unauthorized(message)) => assert_eq!(message, "bad token"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_all_parses_documents() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/entries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "t1", "type": "task", "title": "a", "dueDate": "2026-03-01", "updatedAt": 5 },
                { "id": "h1", "type": "habit", "title": "b", "recurrence": "daily",
                  "startDate": "2026-03-01", "serverUpdatedAt": 7 }
            ])))
            .mount(&server)
            .await;

        let documents = api(&server).fetch_all().await.unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].updated_at, Some(5));
        assert_eq!(documents[1].server_updated_at, Some(7));
    }

    #[tokio::test]
    async fn fetch_all_server_error_is_server() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let error = api(&server).fetch_all().await.unwrap_err();
        assert!(matches!(
            error,
            Error::Remote(RemoteError::Server { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn delete_missing_document_is_not_found() {
        let server = MockServer::start().await;
        let id = EntryId::new();

        Mock::given(method("DELETE"))
            .and(path(format!("/entries/{id}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let error = api(&server).delete(&id).await.unwrap_err();
        assert!(matches!(error, Error::Remote(RemoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn unreachable_host_is_connectivity() {
        let config = RemoteConfig::new("http://127.0.0.1:9", "tok").unwrap();
        let error = HttpRemoteEntryApi::new(config)
            .unwrap()
            .fetch_all()
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Remote(RemoteError::Connectivity(_))));
    }
}
