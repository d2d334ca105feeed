use super::{FeedKind, FeedSource};
use futures::stream::{self, StreamExt};
use reqwest::redirect::Policy;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
// Published sheet URLs redirect once or twice to a content host.
const MAX_REDIRECTS: usize = 5;

/// A failed fetch, tagged with the feed it belongs to.
#[derive(Debug, Error)]
#[error("failed to fetch feed '{feed}': {kind}")]
pub struct FetchError {
    pub feed: FeedKind,
    #[source]
    pub kind: FetchErrorKind,
}

/// Why a fetch failed.
#[derive(Debug, Error)]
pub enum FetchErrorKind {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request and body read did not finish within the timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Per-request bounds applied to every feed.
#[derive(Debug, Clone, Copy)]
pub struct FetchLimits {
    pub timeout: Duration,
    pub max_bytes: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_bytes: DEFAULT_MAX_FEED_SIZE,
        }
    }
}

/// HTTP client used for every feed of a run.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(redirect_policy())
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(format!("Too many redirects (max {MAX_REDIRECTS})"));
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Fetches every source concurrently and waits for all of them.
///
/// A failing feed does not cancel its siblings; each outcome is reported.
/// Results come back in [`FeedKind::ALL`] order regardless of completion
/// order.
pub async fn fetch_all(
    client: &reqwest::Client,
    sources: &[FeedSource],
    limits: FetchLimits,
) -> Vec<(FeedKind, Result<Vec<u8>, FetchError>)> {
    let mut results: Vec<_> = stream::iter(sources.iter())
        .map(|source| async move { (source.kind, fetch(client, source, limits).await) })
        .buffer_unordered(sources.len().max(1))
        .collect()
        .await;

    results.sort_by_key(|(kind, _)| *kind);
    results
}

/// Retrieves the raw CSV bytes for one feed.
///
/// Issues a single GET. The whole exchange, body included, must finish
/// within `limits.timeout`. There is no retry; re-running the pipeline is
/// the retry mechanism.
///
/// # Errors
///
/// - [`FetchErrorKind::Network`] - Connection or TLS errors
/// - [`FetchErrorKind::Timeout`] - Exchange exceeded the timeout
/// - [`FetchErrorKind::HttpStatus`] - Non-2xx HTTP response
/// - [`FetchErrorKind::ResponseTooLarge`] - Body exceeded `limits.max_bytes`
/// - [`FetchErrorKind::IncompleteResponse`] - Body shorter than Content-Length
pub async fn fetch(
    client: &reqwest::Client,
    source: &FeedSource,
    limits: FetchLimits,
) -> Result<Vec<u8>, FetchError> {
    let exchange = async {
        let response = client
            .get(&source.url)
            .send()
            .await
            .map_err(FetchErrorKind::Network)?;

        if !response.status().is_success() {
            return Err(FetchErrorKind::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, limits.max_bytes).await
    };

    let result = match tokio::time::timeout(limits.timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(FetchErrorKind::Timeout(limits.timeout)),
    };

    match result {
        Ok(bytes) => {
            tracing::debug!(feed = %source.kind, bytes = bytes.len(), "Fetched feed");
            Ok(bytes)
        }
        Err(kind) => Err(FetchError {
            feed: source.kind,
            kind,
        }),
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchErrorKind> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchErrorKind::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchErrorKind::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchErrorKind::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
