//! Chunk transmission over HTTP.
//!
//! `ChunkTransmitter` is the seam between the upload flow and the wire.
//! `HttpTransmitter` implements it against the `POST /upload_chunk`
//! multipart endpoint; tests substitute mocks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, redirect};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{NETWORK_FAILURE_MESSAGE, TransmitError, UploadError};

const UPLOAD_ENDPOINT: &str = "/upload_chunk";

/// Request bodies are fed to the connection in pieces of this size, and
/// progress is reported after each piece.
const PROGRESS_PIECE_SIZE: usize = 64 * 1024;

/// Default per-chunk request timeout.
pub const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(300);

/// Callback receiving "bytes sent so far" for the request in flight.
///
/// Values are monotonically increasing and never exceed the chunk length.
pub type SendProgress = Arc<dyn Fn(u64) + Send + Sync>;

/// Boxed future returned by [`ChunkTransmitter::send`].
pub type TransmitFuture<'a> = Pin<Box<dyn Future<Output = Result<Ack, TransmitError>> + Send + 'a>>;

/// Form fields accompanying each chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub file_name: String,
    pub checksum: String,
    pub chunk_index: u64,
    pub total_chunks: u64,
    pub destination_directory: String,
    pub upload_id: String,
}

/// Successful acknowledgement of one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    /// The `message` field of a JSON response body, if any.
    pub message: Option<String>,
}

/// Sends one chunk and classifies the outcome.
///
/// Implementations perform exactly one request per call and never retry.
/// Callers must not invoke `send` concurrently for chunks of the same
/// file: the receiver appends chunks in arrival order.
pub trait ChunkTransmitter: Send + Sync {
    fn send<'a>(
        &'a self,
        data: Vec<u8>,
        metadata: &'a ChunkMetadata,
        progress: SendProgress,
    ) -> TransmitFuture<'a>;
}

/// Connection settings for [`HttpTransmitter`].
#[derive(Debug, Clone)]
pub struct TransmitterConfig {
    /// Base URL of the upload server, e.g. `http://localhost:5005`.
    pub server_url: String,
    /// Anti-forgery token sent as `X-CSRFToken`.
    pub csrf_token: Option<String>,
    /// Upper bound on a single chunk request, send and response.
    pub timeout: Duration,
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5005".into(),
            csrf_token: None,
            timeout: DEFAULT_CHUNK_TIMEOUT,
        }
    }
}

/// Multipart HTTP transmitter for the `/upload_chunk` endpoint.
pub struct HttpTransmitter {
    http: reqwest::Client,
    endpoint: reqwest::Url,
    timeout: Duration,
}

impl HttpTransmitter {
    /// Creates a transmitter for the given server.
    pub fn new(config: TransmitterConfig) -> Result<Self, UploadError> {
        let base = config.server_url.trim_end_matches('/');
        let endpoint = reqwest::Url::parse(&format!("{base}{UPLOAD_ENDPOINT}"))
            .map_err(|e| UploadError::InvalidServerUrl(format!("{}: {e}", config.server_url)))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.csrf_token {
            headers.insert(
                HeaderName::from_static("x-csrftoken"), // sent as X-CSRFToken
                HeaderValue::from_str(token).map_err(|_| UploadError::InvalidCsrfToken)?,
            );
        }

        // An unauthenticated request is redirected to the login page.
        // Following it would turn the rejection into a 200.
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            endpoint,
            timeout: config.timeout,
        })
    }

    /// The full chunk endpoint URL.
    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }

    async fn send_chunk(
        &self,
        data: Vec<u8>,
        metadata: &ChunkMetadata,
        progress: SendProgress,
    ) -> Result<Ack, TransmitError> {
        let len = data.len() as u64;
        let part = Part::stream_with_length(progress_body(data, progress), len)
            .file_name(metadata.file_name.clone());

        let form = Form::new()
            .part("file", part)
            .text("filename", metadata.file_name.clone())
            .text("checksum", metadata.checksum.clone())
            .text("chunk", metadata.chunk_index.to_string())
            .text("total_chunks", metadata.total_chunks.to_string())
            .text("directory", metadata.destination_directory.clone())
            .text("upload_uuid", metadata.upload_id.clone());

        debug!(
            file = %metadata.file_name,
            chunk = metadata.chunk_index,
            total_chunks = metadata.total_chunks,
            bytes = len,
            "sending chunk"
        );

        let resp = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(
                    file = %metadata.file_name,
                    chunk = metadata.chunk_index,
                    error = %e,
                    "chunk request failed"
                );
                TransmitError::NetworkFailure(NETWORK_FAILURE_MESSAGE.into())
            })?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if status == StatusCode::OK {
            let message = serde_json::from_str::<ServerReply>(&body)
                .ok()
                .and_then(|r| r.message);
            return Ok(Ack { message });
        }

        let detail = rejection_detail(status, &body);
        warn!(
            file = %metadata.file_name,
            chunk = metadata.chunk_index,
            status = status.as_u16(),
            detail = %detail,
            "chunk rejected"
        );
        Err(TransmitError::ServerRejected {
            status: status.as_u16(),
            detail,
        })
    }
}

impl ChunkTransmitter for HttpTransmitter {
    fn send<'a>(
        &'a self,
        data: Vec<u8>,
        metadata: &'a ChunkMetadata,
        progress: SendProgress,
    ) -> TransmitFuture<'a> {
        Box::pin(self.send_chunk(data, metadata, progress))
    }
}

/// JSON body shape used by the server for both outcomes.
#[derive(Debug, Deserialize)]
struct ServerReply {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Extracts the user-facing reason from a rejected response body.
///
/// Prefers the `error` field of a JSON body, falls back to the raw text.
fn rejection_detail(status: StatusCode, body: &str) -> String {
    if let Ok(reply) = serde_json::from_str::<ServerReply>(body)
        && let Some(error) = reply.error
    {
        return error;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Server responded with HTTP {}", status.as_u16())
    } else {
        trimmed.to_string()
    }
}

/// Wraps chunk bytes in a streaming body that reports bytes handed to
/// the connection.
fn progress_body(data: Vec<u8>, progress: SendProgress) -> reqwest::Body {
    let pieces = body_pieces(Bytes::from(data), progress);
    reqwest::Body::wrap_stream(futures_util::stream::iter(pieces))
}

/// Splits `data` into views of the same buffer, reporting each piece's
/// end offset as it is taken.
fn body_pieces(
    data: Bytes,
    progress: SendProgress,
) -> impl Iterator<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let total = data.len();
    (0..total.div_ceil(PROGRESS_PIECE_SIZE)).map(move |i| {
        let start = i * PROGRESS_PIECE_SIZE;
        let end = (start + PROGRESS_PIECE_SIZE).min(total);
        progress(end as u64);
        Ok(data.slice(start..end))
    })
}
