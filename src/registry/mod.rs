//! Async HTTP clients for the npm registry and download-metrics endpoints.
//!
//! Every request goes through [`get_json`], which applies the configured
//! [`RetryPolicy`]. A `404` is reported as `Ok(None)` so callers decide what
//! "absent" means for them; a `200` whose body is not JSON is
//! [`ScanError::Malformed`] and is not retried. Other failures surface as
//! [`ScanError`].

pub mod downloads;
pub mod npm;
pub mod repository;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::ScanError;
use crate::retry::RetryPolicy;

/// Build the shared HTTP client.
pub fn client(user_agent: &str) -> reqwest::Result<Client> {
    Client::builder().user_agent(user_agent).build()
}

/// GET `url` as JSON, retrying transient failures.
pub async fn get_json(
    client: &Client,
    url: &str,
    retry: &RetryPolicy,
) -> Result<Option<Value>, ScanError> {
    retry
        .run(|| fetch_once(client, url), ScanError::is_transient)
        .await
}

async fn fetch_once(client: &Client, url: &str) -> Result<Option<Value>, ScanError> {
    debug!(url, "GET");
    let network = |source| ScanError::Network {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(network)?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(ScanError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = response.text().await.map_err(network)?;
    let data = serde_json::from_str(&body).map_err(|source| ScanError::Malformed {
        url: url.to_string(),
        source,
    })?;
    Ok(Some(data))
}

/// Minimal HTTP server answering every request with a fixed `200` body.
#[cfg(test)]
pub mod stub {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Returns the base URL the server listens on.
    pub async fn serve(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let base = stub::serve("not json").await;
        let retry = RetryPolicy {
            attempts: 3,
            delay: Duration::ZERO,
        };
        let err = get_json(&Client::new(), &base, &retry).await.unwrap_err();
        assert!(matches!(err, ScanError::Malformed { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_json_body_is_returned() {
        let base = stub::serve(r#"{"dist-tags":{"latest":"1.0.0"}}"#).await;
        let retry = RetryPolicy {
            attempts: 1,
            delay: Duration::ZERO,
        };
        let data = get_json(&Client::new(), &base, &retry).await.unwrap().unwrap();
        assert_eq!(data["dist-tags"]["latest"], "1.0.0");
    }
}
