//! Restore calls against the store's backup endpoint and outcome classification.

use std::fmt::{self, Display, Formatter};

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use tracing::info;

use crate::config::RestoreConfig;
use crate::decoder::WorkItem;
use crate::error::{RestoreError, RestoreResult};

/// Namespace under which the store accepts restored file metadata.
pub const RESTORE_NAMESPACE: &str = "/.cbfs/backup/restore/";
/// Header carrying the expiration override.
pub const HEADER_EXPIRATION: &str = "x-cbfs-expiration";
/// Header correlating every request of a run.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Result of restoring one item.
#[derive(Debug)]
pub enum RestoreOutcome {
    /// The server created the file.
    Restored,
    /// Noop mode; nothing was sent.
    Simulated,
    /// The file already exists and overwriting was not requested.
    SkippedConflict,
    /// The server rejected the item; the run continues.
    Failed(RestoreFailure),
    /// The server could not be reached; the run must stop.
    Fatal(RestoreError),
}

/// Diagnostic detail for a rejected item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreFailure {
    /// HTTP status returned by the server.
    pub status: StatusCode,
    /// Trimmed response body, possibly empty.
    pub body: String,
}

impl Display for RestoreFailure {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(formatter, "request failed with status {}", self.status)
        } else {
            write!(formatter, "{} (status {})", self.body, self.status)
        }
    }
}

/// Build the HTTP client shared by every worker of a run.
///
/// No request timeout is set; a stalled call holds only its own worker.
///
/// # Errors
///
/// Returns [`RestoreError::InvalidConfig`] if `run_id` is not a valid header
/// value and [`RestoreError::ClientBuild`] if the TLS backend cannot be initialised.
pub fn build_http_client(run_id: &str) -> RestoreResult<Client> {
    let request_id =
        HeaderValue::from_str(run_id).map_err(|_| RestoreError::InvalidConfig {
            field: "run_id",
            reason: "contains characters not allowed in a header",
            value: Some(run_id.to_string()),
        })?;
    let mut default_headers = HeaderMap::new();
    default_headers.insert(HEADER_REQUEST_ID, request_id);

    Client::builder()
        .default_headers(default_headers)
        .build()
        .map_err(|source| RestoreError::ClientBuild { source })
}

/// Issues restore requests for decoded work items.
#[derive(Debug, Clone)]
pub struct RestoreClient {
    http: Client,
    base_url: Url,
    force: bool,
    noop: bool,
    expire: HeaderValue,
}

impl RestoreClient {
    /// Bind an HTTP client to the target store and the run's flags.
    #[must_use]
    pub fn new(http: Client, config: &RestoreConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            force: config.force,
            noop: config.noop,
            expire: HeaderValue::from(config.expire),
        }
    }

    /// Endpoint an item is restored to. The item path replaces the base path.
    #[must_use]
    pub fn restore_url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("{RESTORE_NAMESPACE}{path}"));
        url
    }

    /// Restore one item and classify the server's answer.
    pub async fn restore(&self, item: &WorkItem) -> RestoreOutcome {
        if self.noop {
            info!("NOOP would restore {}", item.path);
            return RestoreOutcome::Simulated;
        }

        let url = self.restore_url(&item.path);
        let response = match self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(HEADER_EXPIRATION, self.expire.clone())
            .body(item.meta_json().to_owned())
            .send()
            .await
        {
            Ok(response) => response,
            Err(source) => {
                return RestoreOutcome::Fatal(RestoreError::Transport {
                    url: url.to_string(),
                    source,
                });
            }
        };

        match response.status() {
            StatusCode::CREATED => {
                info!("Restored {}", item.path);
                RestoreOutcome::Restored
            }
            StatusCode::CONFLICT if !self.force => RestoreOutcome::SkippedConflict,
            status => {
                let body = response.text().await.unwrap_or_default();
                RestoreOutcome::Failed(RestoreFailure {
                    status,
                    body: body.trim().to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use httpmock::prelude::*;

    use super::*;
    use crate::decoder::RecordDecoder;

    fn config_for(base: &str) -> RestoreConfig {
        RestoreConfig::new(base.parse().expect("valid URL"), "/tmp/backup.json.gz")
    }

    fn item(path: &str, meta: &str) -> WorkItem {
        let body = format!(r#"{{"Path": "{path}", "Meta": {meta}}}"#);
        RecordDecoder::from_reader(body.as_bytes())
            .next()
            .expect("one record")
            .expect("valid record")
    }

    fn client_for(config: &RestoreConfig) -> RestoreClient {
        RestoreClient::new(build_http_client("run-1").expect("client"), config)
    }

    #[test]
    fn restore_url_replaces_base_path() {
        let client = client_for(&config_for("http://store.example:8484/ignored/?q=1"));
        let url = client.restore_url("dir/file name.txt");
        assert_eq!(url.path(), "/.cbfs/backup/restore/dir/file%20name.txt");
        assert_eq!(url.host_str(), Some("store.example"));
    }

    #[test]
    fn run_id_must_be_a_valid_header_value() {
        match build_http_client("run\n1") {
            Err(RestoreError::InvalidConfig { field, value, .. }) => {
                assert_eq!(field, "run_id");
                assert_eq!(value.as_deref(), Some("run\n1"));
            }
            other => panic!("expected invalid run id, got {other:?}"),
        }
        assert!(build_http_client("run-1").is_ok());
    }

    #[test]
    fn failure_display_prefers_body() {
        let failure = RestoreFailure {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "disk full".into(),
        };
        assert_eq!(failure.to_string(), "disk full (status 500 Internal Server Error)");

        let bare = RestoreFailure {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        assert_eq!(bare.to_string(), "request failed with status 502 Bad Gateway");
    }

    #[tokio::test]
    async fn created_response_is_restored() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/.cbfs/backup/restore/photos/cat.jpg")
                    .header("content-type", "application/json")
                    .header(HEADER_EXPIRATION, "-1")
                    .header(HEADER_REQUEST_ID, "run-1")
                    .body(r#"{"oid":"abc","length":42}"#);
                then.status(201);
            })
            .await;

        let client = client_for(&config_for(&server.base_url()));
        let outcome = client
            .restore(&item("photos/cat.jpg", r#"{"oid":"abc","length":42}"#))
            .await;

        assert!(matches!(outcome, RestoreOutcome::Restored));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn expiration_override_is_forwarded() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/.cbfs/backup/restore/a")
                    .header(HEADER_EXPIRATION, "3600");
                then.status(201);
            })
            .await;

        let config = RestoreConfig {
            expire: 3600,
            ..config_for(&server.base_url())
        };
        let outcome = client_for(&config).restore(&item("a", "{}")).await;

        assert!(matches!(outcome, RestoreOutcome::Restored));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn conflict_without_force_is_skipped() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/.cbfs/backup/restore/a");
                then.status(409).body("exists");
            })
            .await;

        let outcome = client_for(&config_for(&server.base_url()))
            .restore(&item("a", "{}"))
            .await;

        assert!(matches!(outcome, RestoreOutcome::SkippedConflict));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn conflict_with_force_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/.cbfs/backup/restore/a");
                then.status(409).body("exists\n");
            })
            .await;

        let config = RestoreConfig {
            force: true,
            ..config_for(&server.base_url())
        };
        match client_for(&config).restore(&item("a", "{}")).await {
            RestoreOutcome::Failed(failure) => {
                assert_eq!(failure.status, StatusCode::CONFLICT);
                assert_eq!(failure.body, "exists");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_carries_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/.cbfs/backup/restore/a");
                then.status(500).body("blob missing");
            })
            .await;

        match client_for(&config_for(&server.base_url()))
            .restore(&item("a", "{}"))
            .await
        {
            RestoreOutcome::Failed(failure) => {
                assert_eq!(failure.status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(failure.body, "blob missing");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn noop_issues_no_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(201);
            })
            .await;

        let config = RestoreConfig {
            noop: true,
            force: true,
            expire: 10,
            ..config_for(&server.base_url())
        };
        let outcome = client_for(&config).restore(&item("a", "{}")).await;

        assert!(matches!(outcome, RestoreOutcome::Simulated));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn unreachable_server_is_fatal() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };

        let outcome = client_for(&config_for(&format!("http://127.0.0.1:{port}")))
            .restore(&item("a", "{}"))
            .await;

        match outcome {
            RestoreOutcome::Fatal(RestoreError::Transport { url, .. }) => {
                assert!(url.ends_with("/.cbfs/backup/restore/a"));
            }
            other => panic!("expected transport failure, got {other:?}"),
        }
    }
}
