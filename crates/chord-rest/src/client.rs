//! Paced REST client

use crate::policy::RateLimitPolicy;
use crate::response::interpret_response;
use chord_common::{BotConfig, ClientError, ClientResult};
use reqwest::header::{AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const DEFAULT_USER_AGENT: &str = concat!("DiscordBot (chord, ", env!("CARGO_PKG_VERSION"), ")");

/// REST API client
///
/// Cheap to clone; clones share the HTTP connection pool and the pacing gate.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestInner>,
}

struct RestInner {
    http: reqwest::Client,
    base_url: String,
    token: String,
    api_sleep: Duration,
    policy: RateLimitPolicy,
    /// Serialises calls so the post-call pause applies between every pair of requests
    gate: Mutex<()>,
}

impl RestClient {
    /// Create a client for the given API base URL and bot token
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> ClientResult<Self> {
        Self::with_settings(base_url, token, Duration::from_millis(50), RateLimitPolicy::default())
    }

    /// Create a client from bot configuration
    pub fn from_config(config: &BotConfig) -> ClientResult<Self> {
        Self::with_settings(
            config.rest.api_url.clone(),
            config.token.clone(),
            config.rest.api_sleep(),
            RateLimitPolicy::from_retries(config.rest.rate_limit_retries),
        )
    }

    /// Create a client with explicit pacing and rate-limit policy
    pub fn with_settings(
        base_url: impl Into<String>,
        token: impl Into<String>,
        api_sleep: Duration,
        policy: RateLimitPolicy,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ClientError::internal)?;

        Ok(Self {
            inner: Arc::new(RestInner {
                http,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                token: token.into(),
                api_sleep,
                policy,
                gate: Mutex::new(()),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.inner.policy
    }

    /// Perform an API call and return the decoded JSON body
    ///
    /// A 429 answer is retried or surfaced according to the configured
    /// [`RateLimitPolicy`]; every other failure is returned as is.
    pub async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        let mut retries = 0;

        loop {
            match self.call_once(method.clone(), path, body).await {
                Err(ClientError::RateLimited { retry_after }) if self.inner.policy.should_retry(retries) => {
                    let delay = RateLimitPolicy::backoff(retry_after);
                    retries += 1;

                    tracing::warn!(
                        path = %path,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, retrying"
                    );

                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn call_once(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        let url = self.url(path);
        let _gate = self.inner.gate.lock().await;

        let mut request = self
            .inner
            .http
            .request(method.clone(), &url)
            .header(AUTHORIZATION, format!("Bot {}", self.inner.token))
            .header(USER_AGENT, DEFAULT_USER_AGENT);
        if let Some(body) = body {
            request = request.json(body);
        }

        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                match response.text().await {
                    Ok(text) => interpret_response(status, retry_after.as_deref(), &text),
                    Err(e) => Err(ClientError::Transport(e.to_string())),
                }
            }
            Err(e) => Err(ClientError::Transport(e.to_string())),
        };

        match &outcome {
            Ok(_) => tracing::debug!(method = %method, path = %path, "API call succeeded"),
            Err(e) => tracing::debug!(
                method = %method,
                path = %path,
                code = e.error_code(),
                error = %e,
                "API call failed"
            ),
        }

        // Pause while still holding the gate so the next call waits for it
        if !self.inner.api_sleep.is_zero() {
            tokio::time::sleep(self.inner.api_sleep).await;
        }

        outcome
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.inner.base_url)
            .field("api_sleep", &self.inner.api_sleep)
            .field("policy", &self.inner.policy)
            .finish()
    }
}
