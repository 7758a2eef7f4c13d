//! Page rendering with exponential backoff retry logic.
//!
//! Rendering is the only network-facing capability of the scraper: given a
//! URL, return the page's HTML. Listing pages and article pages both go
//! through it.
//!
//! # Architecture
//!
//! - [`PageRenderer`]: core trait defining async rendering
//! - [`HttpRenderer`]: plain HTTP download via `reqwest`
//! - [`BrowserlessRenderer`]: fully rendered HTML via a Browserless `/content` endpoint
//! - [`Renderer`]: runtime choice between the two
//! - [`RetryRender`]: decorator that adds retry logic to any `PageRenderer`
//!
//! # Retry Strategy
//!
//! - Attempt budget from [`RetryPolicy::max_attempts`] (2 by default)
//! - Exponential backoff starting at [`RetryPolicy::base_delay`]
//! - Delay capped at [`RetryPolicy::max_delay`]
//! - Random jitter up to [`RetryPolicy::max_jitter`] added to every delay

use crate::config::RetryPolicy;
use crate::error::RenderError;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) isranews_scraper/",
    env!("CARGO_PKG_VERSION")
);

/// One navigation.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub url: &'a str,
    /// Upper bound for the page load.
    pub timeout: Duration,
    /// Extra wait after load so late content can settle.
    pub settle: Duration,
}

/// Trait for async page rendering.
///
/// Implementors turn a URL into HTML. This abstraction lets the crawler run
/// against a real site, a headless browser service, or canned pages in tests.
pub trait PageRenderer {
    /// Render `request.url` and return its HTML.
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError>;
}

impl<T: PageRenderer> PageRenderer for &T {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        (**self).render(request).await
    }
}

/// Downloads pages directly. Good enough for server-rendered listings.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RenderError::from_reqwest("<client>", e))?;
        Ok(Self { client })
    }
}

impl PageRenderer for HttpRenderer {
    #[instrument(level = "debug", skip_all, fields(url = %request.url))]
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        let url = request.url;
        let resp = self
            .client
            .get(url)
            .timeout(request.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RenderError::from_reqwest(url, e))?;
        let html = resp
            .text()
            .await
            .map_err(|e| RenderError::from_reqwest(url, e))?;

        if !request.settle.is_zero() {
            sleep(request.settle).await;
        }
        debug!(bytes = html.len(), "Downloaded page");
        Ok(html)
    }
}

/// Renders pages in a headless browser through Browserless' `/content` API.
#[derive(Clone)]
pub struct BrowserlessRenderer {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl fmt::Debug for BrowserlessRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserlessRenderer")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl BrowserlessRenderer {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, RenderError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RenderError::from_reqwest(base_url, e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self) -> String {
        match &self.token {
            Some(token) => format!("{}/content?token={token}", self.base_url),
            None => format!("{}/content", self.base_url),
        }
    }
}

impl PageRenderer for BrowserlessRenderer {
    #[instrument(level = "debug", skip_all, fields(url = %request.url))]
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        let url = request.url;
        let timeout_ms = request.timeout.as_millis() as u64;
        let body = serde_json::json!({
            "url": url,
            "gotoOptions": { "waitUntil": "domcontentloaded", "timeout": timeout_ms },
            "waitForTimeout": request.settle.as_millis() as u64,
        });

        // the service needs headroom beyond the navigation timeout for the settle wait
        let resp = self
            .client
            .post(self.endpoint())
            .timeout(request.timeout + request.settle + Duration::from_secs(5))
            .json(&body)
            .send()
            .await
            .map_err(|e| RenderError::from_reqwest(url, e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::REQUEST_TIMEOUT {
            return Err(RenderError::Timeout {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text()
            .await
            .map_err(|e| RenderError::from_reqwest(url, e))
    }
}

/// The renderer picked at startup.
#[derive(Debug, Clone)]
pub enum Renderer {
    Http(HttpRenderer),
    Browserless(BrowserlessRenderer),
}

impl PageRenderer for Renderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        match self {
            Renderer::Http(r) => r.render(request).await,
            Renderer::Browserless(r) => r.render(request).await,
        }
    }
}

/// Delay before retrying after the `attempt`-th failure (1-based).
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
/// ```
pub fn backoff_delay(policy: &RetryPolicy, attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    let delay = policy
        .base_delay
        .saturating_mul(1u32 << shift)
        .min(policy.max_delay);
    let max_jitter_ms = policy.max_jitter.as_millis() as u64;
    let jitter_ms = if max_jitter_ms == 0 {
        0
    } else {
        rng().random_range(0..=max_jitter_ms)
    };
    delay + Duration::from_millis(jitter_ms)
}

/// Wrapper that adds exponential backoff retry logic to any [`PageRenderer`].
///
/// Every [`RenderError`] is treated as transient: timeouts, transport errors
/// and error statuses are all retried until the attempt budget is spent.
pub struct RetryRender<T> {
    /// The underlying renderer to wrap.
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryRender<T>
where
    T: PageRenderer,
{
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Total attempts made before giving up.
    pub fn max_attempts(&self) -> usize {
        self.policy.max_attempts.max(1)
    }
}

impl<T> fmt::Debug for RetryRender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRender")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T> PageRenderer for RetryRender<T>
where
    T: PageRenderer,
{
    #[instrument(level = "debug", skip_all, fields(url = %request.url))]
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, RenderError> {
        let total_t0 = Instant::now();
        let max_attempts = self.max_attempts();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.render(request).await {
                Ok(html) => return Ok(html),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt >= max_attempts {
                        error!(
                            attempt,
                            max = max_attempts,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "render exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = backoff_delay(&self.policy, attempt);
                    warn!(
                        attempt,
                        max = max_attempts,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "render attempt failed; backing off"
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }
}
