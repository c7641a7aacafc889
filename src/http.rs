//! Shared HTTP plumbing for the events and notification clients.
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Largest response body accepted from any upstream API (10MB).
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

const USER_AGENT: &str = concat!("tourwatch/", env!("CARGO_PKG_VERSION"));

/// Failures while reading a response body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Response too large")]
    TooLarge,
    /// Received fewer bytes than Content-Length announced
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    Incomplete { expected: u64, received: usize },
}

/// Builds the HTTP client shared by every request in a run.
///
/// GitHub rejects requests without a User-Agent, so one is always set.
pub fn build_client(connect_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(connect_timeout)
        .build()
}

/// Reads a response body, refusing anything larger than `limit` bytes.
pub async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, BodyError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(BodyError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(BodyError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(BodyError::Incomplete {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_read_within_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let response = reqwest::get(server.uri()).await.unwrap();
        let bytes = read_limited_bytes(response, 16).await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn test_read_over_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .mount(&server)
            .await;

        let response = reqwest::get(server.uri()).await.unwrap();
        let err = read_limited_bytes(response, 16).await.unwrap_err();
        assert!(matches!(err, BodyError::TooLarge));
    }

    #[tokio::test]
    async fn test_client_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let response = client.get(server.uri()).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 204);
    }
}
