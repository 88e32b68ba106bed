//! HTTP content store client (`GET {base}/{id}` byte stream).

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::{Client, StatusCode, Url};

use super::{ContentError, ContentStore, ContentStream};

/// Configuration for the HTTP content store.
#[derive(Debug, Clone)]
pub struct HttpContentConfig {
    /// Content store root URL.
    pub base_url: String,
    /// Connect timeout (default: 10s).
    pub connect_timeout: Duration,
    /// Wait for the response status line and headers (default: 30s).
    pub response_timeout: Duration,
    /// Longest gap allowed between two body chunks (default: 30s).
    pub idle_timeout: Duration,
}

impl HttpContentConfig {
    /// Configuration for `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30),
        }
    }

    /// Set the response header timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the body idle timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

/// Content store client over HTTP.
///
/// No overall request timeout is set: large objects stream for as long as
/// the body keeps arriving. A body that stops arriving for longer than the
/// idle timeout fails the stream.
pub struct HttpContentStore {
    client: Client,
    base: Url,
    response_timeout: Duration,
    idle_timeout: Duration,
}

impl HttpContentStore {
    /// Create a client from configuration.
    pub fn new(config: HttpContentConfig) -> Result<Self, ContentError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ContentError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(ContentError::InvalidUrl(config.base_url));
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ContentError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base,
            response_timeout: config.response_timeout,
            idle_timeout: config.idle_timeout,
        })
    }

    /// `{base}/{id}`, with `id` encoded as a single path segment.
    fn content_url(&self, id: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
        }
        url
    }
}

/// Fail the body stream when no chunk arrives within `idle`.
fn with_idle_timeout(
    body: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    idle: Duration,
    url: String,
) -> ContentStream {
    stream::unfold(Some(body), move |state| {
        let url = url.clone();
        async move {
            let mut body = state?;
            match tokio::time::timeout(idle, body.next()).await {
                Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(body))),
                Ok(Some(Err(e))) => Some((Err(ContentError::Transport(e.to_string())), None)),
                Ok(None) => None,
                Err(_) => Some((
                    Err(ContentError::Transport(format!(
                        "{url}: body stalled for {}ms",
                        idle.as_millis()
                    ))),
                    None,
                )),
            }
        }
    })
    .boxed()
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn open(&self, id: &str) -> Result<ContentStream, ContentError> {
        let url = self.content_url(id);
        let response = tokio::time::timeout(self.response_timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| {
                ContentError::Transport(format!(
                    "{url}: no response within {}ms",
                    self.response_timeout.as_millis()
                ))
            })?
            .map_err(|e| ContentError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(ContentError::NotFound(id.to_string())),
            status => {
                return Err(ContentError::UnexpectedStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
        }

        Ok(with_idle_timeout(response.bytes_stream().boxed(), self.idle_timeout, url.to_string()))
    }
}
