use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;

use crate::model::Feed;

const MAX_RETRIES: u32 = 3;
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("weir/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while fetching a feed body.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the fetch timeout
    #[error("Request timed out")]
    Timeout,
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Everything one fetch needs: the URL plus the feed's stored credentials,
/// behavioral flags, and conditional-fetch validators.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub url: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    pub cookie: String,
    pub etag: String,
    pub last_modified: String,
    pub fetch_via_proxy: bool,
    pub allow_self_signed_certificates: bool,
}

impl FetchRequest {
    pub fn new(url: &str) -> Self {
        FetchRequest {
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// A request carrying a stored feed's credentials and flags, without
    /// cache validators (the caller adds those when it wants a conditional
    /// fetch).
    pub fn from_feed(feed: &Feed) -> Self {
        FetchRequest {
            url: feed.feed_url.clone(),
            username: feed.username.clone(),
            password: feed.password.clone(),
            user_agent: feed.user_agent.clone(),
            cookie: feed.cookie.clone(),
            etag: String::new(),
            last_modified: String::new(),
            fetch_via_proxy: feed.fetch_via_proxy,
            allow_self_signed_certificates: feed.allow_self_signed_certificates,
        }
    }

    pub fn with_cache_validators(mut self, etag: &str, last_modified: &str) -> Self {
        self.etag = etag.to_string();
        self.last_modified = last_modified.to_string();
        self
    }
}

/// A fetched feed body with its response metadata.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// Final URL after redirects; duplicate detection keys on this, not on
    /// the request URL.
    pub effective_url: String,
    pub status: u16,
    pub body: Vec<u8>,
    pub etag: String,
    pub last_modified: String,
    pub content_type: String,
}

impl FetchedBody {
    /// Whether the content changed relative to stored validators.
    ///
    /// A 304 is authoritative; otherwise an unchanged ETag or Last-Modified
    /// also counts as "not modified" since some servers return 200 with
    /// identical validators instead of honoring conditional requests.
    pub fn is_modified(&self, etag: &str, last_modified: &str) -> bool {
        if self.status == 304 {
            return false;
        }
        if !self.etag.is_empty() && self.etag == etag {
            return false;
        }
        if !self.last_modified.is_empty() && self.last_modified == last_modified {
            return false;
        }
        true
    }
}

/// The HTTP collaborator: owns a shared client and builds one-off clients
/// for feeds that need proxying or self-signed certificates.
#[derive(Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
    proxy_url: Option<String>,
}

impl FeedFetcher {
    pub fn new(timeout: Duration, proxy_url: Option<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Network)?;
        Ok(FeedFetcher {
            client,
            timeout,
            proxy_url,
        })
    }

    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(DEFAULT_TIMEOUT, None)
    }

    /// Fetches a feed body, retrying 429 and 5xx responses with exponential
    /// backoff, and enforcing the body size cap while streaming.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchedBody, FetchError> {
        let client = self.client_for(request)?;
        let mut retry_count = 0;

        loop {
            let response = tokio::time::timeout(self.timeout, self.send(&client, request))
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(FetchError::Network)?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retry_count >= MAX_RETRIES {
                    return Err(FetchError::RateLimited(MAX_RETRIES));
                }
                let delay_secs = 2u64.pow(retry_count); // 2s, 4s, 8s
                tracing::warn!(
                    url = %request.url,
                    retry = retry_count,
                    delay_secs = delay_secs,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                retry_count += 1;
                continue;
            }

            if response.status().is_server_error() {
                if retry_count >= MAX_RETRIES {
                    return Err(FetchError::HttpStatus(response.status().as_u16()));
                }
                let delay_secs = 2u64.pow(retry_count);
                tracing::warn!(
                    url = %request.url,
                    status = %response.status(),
                    retry = retry_count,
                    delay_secs = delay_secs,
                    "Server error, retrying after delay"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                retry_count += 1;
                continue;
            }

            let status = response.status().as_u16();

            // 304 is a successful outcome for a conditional fetch.
            if status != 304 && !response.status().is_success() {
                return Err(FetchError::HttpStatus(status));
            }

            let effective_url = response.url().to_string();
            let etag = header_value(&response, reqwest::header::ETAG);
            let last_modified = header_value(&response, reqwest::header::LAST_MODIFIED);
            let content_type = header_value(&response, reqwest::header::CONTENT_TYPE);

            let body = if status == 304 {
                Vec::new()
            } else {
                match read_limited_bytes(response, MAX_BODY_SIZE).await {
                    Ok(body) => body,
                    Err(FetchError::IncompleteResponse { expected, received }) => {
                        if retry_count >= MAX_RETRIES {
                            return Err(FetchError::IncompleteResponse { expected, received });
                        }
                        let delay_secs = 2u64.pow(retry_count);
                        tracing::debug!(
                            url = %request.url,
                            expected = expected,
                            received = received,
                            delay_secs = delay_secs,
                            "Retrying incomplete download"
                        );
                        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                        retry_count += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            };

            return Ok(FetchedBody {
                effective_url,
                status,
                body,
                etag,
                last_modified,
                content_type,
            });
        }
    }

    async fn send(
        &self,
        client: &reqwest::Client,
        request: &FetchRequest,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut builder = client.get(&request.url);

        let user_agent = if request.user_agent.is_empty() {
            DEFAULT_USER_AGENT
        } else {
            &request.user_agent
        };
        builder = builder.header(reqwest::header::USER_AGENT, user_agent);

        if !request.username.is_empty() {
            builder = builder.basic_auth(&request.username, Some(&request.password));
        }
        if !request.cookie.is_empty() {
            builder = builder.header(reqwest::header::COOKIE, &request.cookie);
        }
        if !request.etag.is_empty() {
            builder = builder.header(reqwest::header::IF_NONE_MATCH, &request.etag);
        }
        if !request.last_modified.is_empty() {
            builder = builder.header(reqwest::header::IF_MODIFIED_SINCE, &request.last_modified);
        }

        builder.send().await
    }

    /// The shared client covers the common case; feeds that opt into the
    /// proxy or self-signed certificates get a client built to order.
    fn client_for(&self, request: &FetchRequest) -> Result<reqwest::Client, FetchError> {
        let needs_proxy = request.fetch_via_proxy && self.proxy_url.is_some();
        if !needs_proxy && !request.allow_self_signed_certificates {
            return Ok(self.client.clone());
        }

        let mut builder = reqwest::Client::builder().timeout(self.timeout);
        if request.allow_self_signed_certificates {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if needs_proxy {
            if let Some(proxy_url) = &self.proxy_url {
                let proxy = reqwest::Proxy::all(proxy_url).map_err(FetchError::Network)?;
                builder = builder.proxy(proxy);
            }
        }
        builder.build().map_err(FetchError::Network)
    }
}

fn header_value(response: &reqwest::Response, name: reqwest::header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    // An interrupted transfer can deliver fewer bytes than Content-Length
    // promised; callers retry with backoff.
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
