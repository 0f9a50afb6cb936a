//! Client for the external review service.

use std::time::Duration;

use anyhow::Context;
use axum::body::Bytes;
use reqwest::StatusCode;
use shelf_kernel::settings::ReviewServiceSettings;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// The service could not be reached or did not answer within the timeout.
    #[error("review service unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),

    #[error("review service answered with status {0}")]
    UnexpectedStatus(StatusCode),

    #[error("review service sent a body that is not JSON")]
    InvalidBody,
}

/// Reviews of one book as returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Reviews {
    /// Upstream JSON body, byte for byte.
    Upstream(Bytes),
    /// The service does not know the book.
    Empty,
}

impl Reviews {
    pub fn empty_body() -> serde_json::Value {
        serde_json::json!({
            "reviews": [],
            "statistics": {
                "totalReviews": 0,
                "averageRating": 0
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReviewClient {
    http: reqwest::Client,
    settings: ReviewServiceSettings,
}

impl ReviewClient {
    pub fn new(settings: &ReviewServiceSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .context("failed to build review service client")?;

        Ok(Self {
            http,
            settings: settings.clone(),
        })
    }

    /// Fetch the reviews of `book_id`. A single attempt; no retries.
    pub async fn fetch(&self, book_id: i64) -> Result<Reviews, ReviewError> {
        let url = self.settings.url_for(book_id);
        tracing::debug!(book_id, %url, "fetching reviews");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(ReviewError::Unavailable)?;

        match response.status() {
            StatusCode::OK => {
                // A body cut short is a transport failure, not a malformed payload.
                let body = response.bytes().await.map_err(ReviewError::Unavailable)?;
                serde_json::from_slice::<serde::de::IgnoredAny>(&body)
                    .map_err(|_| ReviewError::InvalidBody)?;
                Ok(Reviews::Upstream(body))
            }
            StatusCode::NOT_FOUND => Ok(Reviews::Empty),
            other => Err(ReviewError::UnexpectedStatus(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, timeout_ms: u64) -> ReviewClient {
        ReviewClient::new(&ReviewServiceSettings {
            base_url: server.base_url(),
            timeout_ms,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn passes_upstream_body_through() {
        let server = MockServer::start_async().await;
        let raw = r#"{"reviews":[{"id":1,"rating":5}],"statistics":{"totalReviews":1}}"#;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/reviews/book/1");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(raw);
            })
            .await;

        let reviews = client_for(&server, 1000).fetch(1).await.unwrap();
        assert_eq!(reviews, Reviews::Upstream(Bytes::from_static(raw.as_bytes())));
    }

    #[tokio::test]
    async fn upstream_404_means_no_reviews() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/reviews/book/2");
                then.status(404).json_body(json!({"error": "not found"}));
            })
            .await;

        let reviews = client_for(&server, 1000).fetch(2).await.unwrap();
        assert_eq!(reviews, Reviews::Empty);
    }

    #[tokio::test]
    async fn other_statuses_are_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/reviews/book/3");
                then.status(500);
            })
            .await;

        let err = client_for(&server, 1000).fetch(3).await.unwrap_err();
        assert!(matches!(
            err,
            ReviewError::UnexpectedStatus(StatusCode::INTERNAL_SERVER_ERROR)
        ));
    }

    #[tokio::test]
    async fn non_json_body_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/reviews/book/4");
                then.status(200).body("<html>oops</html>");
            })
            .await;

        let err = client_for(&server, 1000).fetch(4).await.unwrap_err();
        assert!(matches!(err, ReviewError::InvalidBody));
    }

    #[tokio::test]
    async fn connection_dropped_mid_body_is_unavailable() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 500\r\n\r\n{\"reviews\":[",
                )
                .await
                .unwrap();
            socket.shutdown().await.ok();
        });

        let client = ReviewClient::new(&ReviewServiceSettings {
            base_url: format!("http://{address}"),
            timeout_ms: 2000,
            ..Default::default()
        })
        .unwrap();

        let err = client.fetch(6).await.unwrap_err();
        assert!(matches!(err, ReviewError::Unavailable(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn slow_upstream_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/reviews/book/5");
                then.status(200)
                    .json_body(json!({"reviews": []}))
                    .delay(Duration::from_millis(1500));
            })
            .await;

        let err = client_for(&server, 200).fetch(5).await.unwrap_err();
        match err {
            ReviewError::Unavailable(e) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
