// src/utils/http.rs

//! HTTP client shared by the adapters and the detector.
//!
//! Every request goes through one retry loop:
//! - transient failures (timeouts, connection errors, 5xx, malformed bodies)
//!   retry with exponential backoff up to `max_retries` times;
//! - 4xx other than 429 fails at once;
//! - 429 gets one cooldown and retry, then fails as rate limited.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Retry behaviour for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
    pub rate_limit_cooldown: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
            rate_limit_cooldown: Duration::from_millis(config.rate_limit_cooldown_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Configured asynchronous HTTP client with the shared retry policy.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    policy: RetryPolicy,
    request_delay: Duration,
}

impl HttpClient {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            policy: RetryPolicy::from_config(config),
            request_delay: Duration::from_millis(config.request_delay_ms),
        })
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the delay between pages.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Pause between consecutive pages of one pagination sweep.
    pub async fn pace(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }

    /// GET `url` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.execute(url, || self.client.get(url), parse_json).await
    }

    /// POST a JSON body to `url` and decode a JSON response.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_json_with(url, body, &[]).await
    }

    /// POST a JSON body with extra headers.
    pub async fn post_json_with<B, T>(
        &self,
        url: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let build = || {
            headers
                .iter()
                .fold(self.client.post(url).json(body), |req, (k, v)| {
                    req.header(*k, *v)
                })
        };
        self.execute(url, build, parse_json).await
    }

    /// GET `url` and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.execute(url, || self.client.get(url), |_, body| Ok(body))
            .await
    }

    async fn execute<T, B, P>(&self, url: &str, build: B, parse: P) -> Result<T>
    where
        B: Fn() -> RequestBuilder,
        P: Fn(&str, String) -> Result<T>,
    {
        let mut retries = 0u32;
        let mut cooled_down = false;

        loop {
            let err = match self.attempt(url, &build).await {
                Ok(body) => match parse(url, body) {
                    Ok(value) => return Ok(value),
                    Err(e) => e,
                },
                Err(e) => e,
            };

            match err {
                AppError::RateLimited { .. } if !cooled_down => {
                    cooled_down = true;
                    log::warn!(
                        "429 from {}, cooling down {}ms",
                        url,
                        self.policy.rate_limit_cooldown.as_millis()
                    );
                    tokio::time::sleep(self.policy.rate_limit_cooldown).await;
                }
                AppError::RateLimited { .. } => return Err(err),
                e if e.is_transient() && retries < self.policy.max_retries => {
                    retries += 1;
                    let delay = self.policy.delay(retries);
                    log::warn!(
                        "Attempt {} for {} failed ({}), retrying after {}ms",
                        retries,
                        url,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                e => return Err(e),
            }
        }
    }

    /// One request with status classification.
    async fn attempt<B>(&self, url: &str, build: &B) -> Result<String>
    where
        B: Fn() -> RequestBuilder,
    {
        let response = build()
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    AppError::permanent(url, None, e)
                } else {
                    AppError::transient(url, e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimited {
                url: url.to_string(),
            });
        }
        if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            return Err(AppError::transient(url, format!("status {}", status)));
        }
        if !status.is_success() {
            return Err(AppError::permanent(
                url,
                Some(status.as_u16()),
                format!("status {}", status),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::transient(url, format!("body read failed: {}", e)))
    }
}

fn parse_json<T: DeserializeOwned>(url: &str, body: String) -> Result<T> {
    serde_json::from_str(&body)
        .map_err(|e| AppError::transient(url, format!("malformed body: {}", e)))
}
