//! HTTP collaborator for the headline pipeline.
//!
//! Requests are sequential. A 429 answer sleeps a fixed backoff and retries,
//! up to `max_retries` times; anything else non-2xx is a hard failure.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    /// Still rate limited after every retry
    #[error("rate limited by {url} after {attempts} attempts")]
    RateLimited { url: String, attempts: u32 },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

/// One GET's outcome before retry policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Body(String),
    RateLimited,
}

/// Anything that can perform a single GET.
pub trait Fetch {
    fn get(&self, url: &str) -> Result<Response, FetchError>;
}

// ── Retry policy ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    pub timeout_secs: u64,
    /// Sleep after a 429 before trying again
    pub backoff_secs: u64,
    pub max_retries: u32,
    /// Pause between consecutive requests
    pub delay_secs: u64,
    pub user_agent: String,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            backoff_secs: 60,
            max_retries: 5,
            delay_secs: 12,
            user_agent: "BMC Research Bot".to_string(),
        }
    }
}

impl FetchPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// GET `url`, sleeping `backoff` and retrying on every 429 until
/// `max_retries` retries are spent.
pub fn get_with_retry(
    fetcher: &dyn Fetch,
    url: &str,
    max_retries: u32,
    backoff: Duration,
) -> Result<String, FetchError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match fetcher.get(url)? {
            Response::Body(body) => return Ok(body),
            Response::RateLimited if attempts <= max_retries => {
                warn!(attempt = attempts, wait_secs = backoff.as_secs(), "rate limited, backing off");
                thread::sleep(backoff);
            }
            Response::RateLimited => {
                return Err(FetchError::RateLimited {
                    url: redact(url),
                    attempts,
                });
            }
        }
    }
}

/// Hide the API key before a URL ends up in a log line or error.
pub fn redact(url: &str) -> String {
    match url.find("api-key=") {
        Some(i) => {
            let start = i + "api-key=".len();
            let end = url[start..].find('&').map_or(url.len(), |j| start + j);
            format!("{}***{}", &url[..start], &url[end..])
        }
        None => url.to_string(),
    }
}

// ── reqwest implementation ───────────────────────────────────────────────

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(policy: &FetchPolicy) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(policy.timeout_secs))
            .user_agent(policy.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<Response, FetchError> {
        let shown = redact(url);
        debug!(url = %shown, "GET");
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: shown.clone(),
            message: e.without_url().to_string(),
        };

        let resp = self.client.get(url).send().map_err(transport)?;
        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(Response::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: shown,
                status: status.as_u16(),
            });
        }
        resp.text().map(Response::Body).map_err(transport)
    }
}
