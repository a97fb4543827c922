//! HTTP capability.
//!
//! The core only ever issues (possibly conditional) GETs, so the capability
//! is a single method. [`ReqwestClient`] is the production implementation;
//! tests substitute their own.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::StatusCode;
use reqwest::header::{ETAG, HeaderMap};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error::{ApkError, Result};

/// Failure below the HTTP status line.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Response body as a stream of chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// Status and headers of a response, with the body still streaming.
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    /// Build a response from an in-memory body.
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self {
            status,
            headers,
            body: Box::pin(futures::stream::once(async move { Ok(body) })),
        }
    }

    /// The `ETag` header, if present and valid UTF-8.
    pub fn etag(&self) -> Option<&str> {
        self.headers.get(ETAG).and_then(|v| v.to_str().ok())
    }
}

/// Transport used for key and package downloads.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET for `url` with the given extra request headers.
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<HttpResponse, HttpError>;
}

/// [`HttpClient`] on top of a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a client that identifies itself with [`crate::USER_AGENT`].
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured `reqwest::Client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<HttpResponse, HttpError> {
        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(HttpError::from);
        Ok(HttpResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}

/// Send a GET, aborting with [`ApkError::Cancelled`] if `cancel` fires first.
pub(crate) async fn send(
    client: &dyn HttpClient,
    cancel: &CancellationToken,
    url: &str,
    headers: HeaderMap,
) -> Result<HttpResponse> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ApkError::Cancelled),
        response = client.get(url, headers) => response.map_err(|source| ApkError::Http {
            url: url.to_string(),
            source,
        }),
    }
}

/// Drain a response body into memory, honoring cancellation between chunks.
pub(crate) async fn collect(
    cancel: &CancellationToken,
    url: &str,
    mut body: ByteStream,
) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApkError::Cancelled),
            chunk = body.next() => chunk,
        };
        match chunk {
            Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
            Some(Err(source)) => {
                return Err(ApkError::Http {
                    url: url.to_string(),
                    source,
                });
            }
            None => break,
        }
    }
    Ok(buf.freeze())
}

/// GET `url` and return the whole body, failing on any non-success status.
pub(crate) async fn get_bytes(
    client: &dyn HttpClient,
    cancel: &CancellationToken,
    url: &str,
) -> Result<Bytes> {
    let response = send(client, cancel, url, HeaderMap::new()).await?;
    if !response.status.is_success() {
        return Err(ApkError::Status {
            url: url.to_string(),
            status: response.status,
        });
    }
    collect(cancel, url, response.body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_reqwest_client_passes_headers_and_exposes_etag() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/main/x86_64/foo-1.0-r0.apk")
            .match_header("if-none-match", "abc")
            .with_status(200)
            .with_header("etag", "def")
            .with_body("payload")
            .create_async()
            .await;

        let client = ReqwestClient::new().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::IF_NONE_MATCH,
            reqwest::header::HeaderValue::from_static("abc"),
        );
        let url = format!("{}/main/x86_64/foo-1.0-r0.apk", server.url());
        let response = client.get(&url, headers).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.etag(), Some("def"));

        let body = collect(&CancellationToken::new(), &url, response.body)
            .await
            .unwrap();
        assert_eq!(&body[..], b"payload");
    }

    #[tokio::test]
    async fn test_get_bytes_rejects_failure_status() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let client = ReqwestClient::new().unwrap();
        let url = format!("{}/missing", server.url());
        let err = get_bytes(&client, &CancellationToken::new(), &url)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ApkError::Status { status, .. } if status == StatusCode::NOT_FOUND),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_before_sending() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let client = ReqwestClient::new().unwrap();
        let err = get_bytes(&client, &cancel, "http://127.0.0.1:9/never")
            .await
            .unwrap_err();
        assert!(matches!(err, ApkError::Cancelled));
    }
}
