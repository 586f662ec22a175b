use super::signer::{SignaturePayload, SignaturePlacement, Signer};
use crate::error::SocketError;
use crate::rate_limit::{EndpointRateLimitTable, Priority};
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Per-request configuration overridable on individual calls: timeout, retry
/// count, retry delay, concurrency cap, and default auth flag.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub max_delay: Duration,
    pub require_auth: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            require_auth: false,
        }
    }
}

/// Deserialises a successful response body, or maps a non-2xx / malformed body into a
/// caller-specific error, per exchange.
pub trait HttpParser: Send + Sync {
    type Error: From<SocketError> + std::fmt::Debug;

    fn parse<T: DeserializeOwned>(&self, status: StatusCode, payload: &Bytes) -> Result<T, Self::Error>;

    /// `true` iff the call is worth retrying (rate-limit, connection, 5xx).
    fn is_retryable(&self, status: StatusCode, error: &Self::Error) -> bool;

    /// `true` iff `error` represents an HTTP 429 / exchange rate-limit rejection
    /// specifically (used to trigger
    /// [`crate::rate_limit::RateLimiter::report_violation`]).
    fn is_rate_limited(&self, status: StatusCode, error: &Self::Error) -> bool;
}

/// Connection-pooled, authenticated, retrying HTTP client. One instance is constructed
/// per exchange. The underlying `reqwest::Client` keeps a single long-lived session
/// with its own connection pool, DNS cache, and keepalive; `concurrency` caps in-flight
/// requests across all calls made through this client.
pub struct RestClient<S, P> {
    pub http_client: reqwest::Client,
    pub base_url: String,
    pub api_key: Option<String>,
    pub signer: S,
    pub parser: P,
    pub default_config: RequestConfig,
    concurrency: Arc<Semaphore>,
    rate_limits: EndpointRateLimitTable,
}

impl<S, P> RestClient<S, P>
where
    S: Signer,
    P: HttpParser,
{
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        signer: S,
        parser: P,
        default_config: RequestConfig,
        max_concurrent_requests: usize,
        rate_limits: EndpointRateLimitTable,
    ) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .pool_max_idle_per_host(30)
                .pool_idle_timeout(Duration::from_secs(300))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .expect("reqwest::Client builder invariants hold"),
            base_url: base_url.into(),
            api_key,
            signer,
            parser,
            default_config,
            concurrency: Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
            rate_limits,
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<BTreeMap<String, String>>,
    ) -> Result<T, P::Error> {
        self.request(Method::GET, endpoint, params, None, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<BTreeMap<String, String>>,
        json: Option<Value>,
    ) -> Result<T, P::Error> {
        self.request(Method::POST, endpoint, params, json, None).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<BTreeMap<String, String>>,
        json: Option<Value>,
    ) -> Result<T, P::Error> {
        self.request(Method::PUT, endpoint, params, json, None).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<BTreeMap<String, String>>,
    ) -> Result<T, P::Error> {
        self.request(Method::DELETE, endpoint, params, None, None).await
    }

    /// Execute one authenticated, rate-limited, retrying request.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<BTreeMap<String, String>>,
        json: Option<Value>,
        config: Option<RequestConfig>,
    ) -> Result<T, P::Error> {
        let config = config.unwrap_or_else(|| self.default_config.clone());
        let mut params = params.unwrap_or_default();
        let mut attempt = 0u32;
        let mut delay = config.retry_delay;

        loop {
            self.rate_limits.acquire(endpoint, Priority::Normal).await;
            let _permit = self.concurrency.acquire().await.expect("semaphore not closed");

            let result = self
                .execute_once(&method, endpoint, &mut params, json.clone(), &config)
                .await;

            match result {
                Ok(value) => return Ok(value),
                Err((status, error)) => {
                    if self.parser.is_rate_limited(status, &error) {
                        self.rate_limits.report_violation(endpoint).await;
                    }

                    let retryable = self.parser.is_retryable(status, &error);
                    if !retryable || attempt >= config.max_retries {
                        return Err(error);
                    }

                    attempt += 1;
                    warn!(
                        endpoint,
                        attempt,
                        status = status.as_u16(),
                        ?error,
                        "retrying REST request after recoverable error"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, config.max_delay);
                }
            }
        }
    }

    async fn execute_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        endpoint: &str,
        params: &mut BTreeMap<String, String>,
        json: Option<Value>,
        config: &RequestConfig,
    ) -> Result<T, (StatusCode, P::Error)> {
        let timestamp_ms = Utc::now().timestamp_millis();

        if config.require_auth {
            self.signer.prepare_params(params, timestamp_ms);
        }

        let query = serde_urlencoded::to_string(&*params).unwrap_or_default();
        let body_bytes = json
            .as_ref()
            .map(|v| serde_json::to_vec(v).unwrap_or_default())
            .unwrap_or_default();

        let mut builder = self
            .http_client
            .request(method.clone(), format!("{}{}", self.base_url, endpoint))
            .timeout(config.timeout)
            .query(&*params);

        if let Some(body) = &json {
            builder = builder.json(body);
        }

        if config.require_auth {
            let placements = self.signer.sign(SignaturePayload {
                method: method.clone(),
                path: endpoint,
                query: &query,
                body: &body_bytes,
                timestamp_ms,
            });

            for placement in placements {
                builder = match placement {
                    SignaturePlacement::QueryParam { name, value } => builder.query(&[(name, value)]),
                    SignaturePlacement::Header { name, value } => builder.header(name, value),
                };
            }

            if let Some(api_key) = &self.api_key {
                builder = builder.header("X-API-KEY", api_key);
            }
        }

        let request = builder
            .build()
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, SocketError::from(e).into()));
        let request = match request {
            Ok(r) => r,
            Err(e) => return Err(e),
        };

        debug!(?method, endpoint, "dispatching REST request");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, SocketError::from(e).into()))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(retry_after) = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
            {
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
            }
        }

        let payload = response
            .bytes()
            .await
            .map_err(|e| (status, SocketError::from(e).into()))?;

        self.parser
            .parse::<T>(status, &payload)
            .map_err(|e| (status, e))
    }
}
