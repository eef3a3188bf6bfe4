use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use tracing::warn;

use crate::settings::ScrapeSettings;

const USER_AGENT: &str = concat!("claimgen/", env!("CARGO_PKG_VERSION"));
const RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Transport-level retry: bounded attempts with exponential backoff, only for
/// idempotent methods and server errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn is_retryable_method(method: &Method) -> bool {
        matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    pub fn is_retryable_status(status: StatusCode) -> bool {
        RETRY_STATUSES.contains(&status.as_u16())
    }

    /// Sleep before retry number `attempt` (0-based): backoff * 2^attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt)
    }
}

/// A fetched page. Non-200 responses are returned, not raised, so callers can
/// log and skip.
pub struct Page {
    pub status: StatusCode,
    pub body: String,
}

impl Page {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }
}

/// One long-lived client shared by every scrape task for connection reuse.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(settings: &ScrapeSettings) -> Result<Self> {
        let inner = Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(settings.pool_size)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        let retry = RetryPolicy {
            max_retries: settings.max_retries,
            backoff: Duration::from_millis(settings.backoff_ms),
        };
        Ok(HttpClient::with_client(inner, retry))
    }

    pub fn with_client(inner: Client, retry: RetryPolicy) -> Self {
        HttpClient { inner, retry }
    }

    pub async fn get(&self, url: &str) -> Result<Page> {
        self.request(Method::GET, url).await
    }

    async fn request(&self, method: Method, url: &str) -> Result<Page> {
        let retryable = RetryPolicy::is_retryable_method(&method);
        let mut attempt = 0;

        loop {
            let result = self.send_once(method.clone(), url).await;

            let should_retry = retryable
                && attempt < self.retry.max_retries
                && match &result {
                    Ok(page) => RetryPolicy::is_retryable_status(page.status),
                    Err(e) => is_transient(e),
                };
            if !should_retry {
                return result;
            }

            let backoff = self.retry.backoff_for(attempt);
            warn!(
                url,
                attempt = attempt + 1,
                max = self.retry.max_retries,
                "Request failed, backing off {:.1}s",
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    async fn send_once(&self, method: Method, url: &str) -> Result<Page> {
        let response = self.inner.request(method, url).send().await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read body from {}", url))?;
        Ok(Page { status, body })
    }
}

fn is_transient(err: &anyhow::Error) -> bool {
    err.downcast_ref::<reqwest::Error>()
        .map(|e| e.is_connect() || e.is_timeout() || e.is_request() || e.is_body())
        .unwrap_or(false)
}
