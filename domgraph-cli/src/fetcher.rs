//! Page Fetcher - download page markup over HTTP(S)
//!
//! Blocking `ureq` agent with a per-request timeout. Transport failures and
//! 5xx responses are retried with exponential backoff; 4xx responses fail
//! immediately. Bodies over 32 MiB are rejected with `FetchError::TooLarge`.

use regex::Regex;
use std::io::Read;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:http|ftp)s?://\S+$").expect("valid regex"));

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_SECS: u64 = 2;
const DEFAULT_MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Webpage fetch timed out: {url} (Timeout: {timeout_secs} seconds)")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Response from {url} exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },
}

pub fn is_valid_url(url: &str) -> bool {
    URL_PATTERN.is_match(url)
}

pub struct PageFetcher {
    agent: ureq::Agent,
    timeout: Duration,
    retries: u32,
    backoff: Duration,
    max_body_bytes: u64,
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            DEFAULT_RETRIES,
            Duration::from_secs(DEFAULT_BACKOFF_SECS),
        )
    }
}

impl PageFetcher {
    pub fn new(timeout: Duration, retries: u32, backoff: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("domgraph/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            timeout,
            retries,
            backoff,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Delay before retry number `attempt` (0-based): backoff * 2^attempt
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }

    pub fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if !is_valid_url(url) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let mut last_error = None;
        for attempt in 0..=self.retries {
            match self.agent.get(url).call() {
                Ok(response) => {
                    let body = read_body(url, response.into_reader(), self.max_body_bytes)?;
                    info!(url, bytes = body.len(), attempts = attempt + 1, "Fetched page");
                    return Ok(body);
                }
                Err(ureq::Error::Status(status, _)) if status < 500 => {
                    return Err(FetchError::Http {
                        url: url.to_string(),
                        status,
                    });
                }
                Err(ureq::Error::Status(status, _)) => {
                    warn!(url, status, attempt = attempt + 1, "Server error while fetching");
                    last_error = Some(FetchError::Http {
                        url: url.to_string(),
                        status,
                    });
                }
                Err(ureq::Error::Transport(transport)) => {
                    warn!(url, error = %transport, attempt = attempt + 1, "Fetch attempt failed");
                    last_error = Some(if transport.kind() == ureq::ErrorKind::Io {
                        FetchError::Timeout {
                            url: url.to_string(),
                            timeout_secs: self.timeout.as_secs(),
                        }
                    } else {
                        FetchError::Transport {
                            url: url.to_string(),
                            message: transport.to_string(),
                        }
                    });
                }
            }

            // Wait before retry (exponential backoff)
            if attempt < self.retries {
                std::thread::sleep(self.retry_delay(attempt));
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Transport {
            url: url.to_string(),
            message: "no attempts made".to_string(),
        }))
    }
}

/// Read a response body as UTF-8, failing once it grows past `limit` bytes
fn read_body(url: &str, reader: impl Read, limit: u64) -> Result<String, FetchError> {
    let mut body = String::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_string(&mut body)
        .map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    if body.len() as u64 > limit {
        return Err(FetchError::TooLarge {
            url: url.to_string(),
            limit,
        });
    }
    Ok(body)
}
