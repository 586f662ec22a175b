use super::message::{MexcDepthSnapshot, MexcListenKeyResponse};
use crate::books::Level;
use crate::error::DataError;
use arc_integration::protocol::http::client::{HttpParser, RequestConfig, RestClient};
use arc_integration::protocol::http::encoder::{Encoder, HexEncoder};
use arc_integration::protocol::http::signer::{SignaturePayload, SignaturePlacement, Signer};
use arc_integration::rate_limit::{EndpointLimit, EndpointRateLimitTable};
use arc_integration::SocketError;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const REST_BASE_URL: &str = "https://api.mexc.com";
const DEFAULT_CONCURRENCY: usize = 8;
/// MEXC listen-keys are refreshed well inside their server-side 60-minute expiry.
pub const LISTEN_KEY_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Query-parameter HMAC-SHA256 signing.
#[derive(Debug, Clone)]
pub struct MexcSigner {
    api_key: String,
    api_secret: String,
}

impl MexcSigner {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self { api_key, api_secret }
    }
}

impl Signer for MexcSigner {
    fn prepare_params(&self, params: &mut BTreeMap<String, String>, timestamp_ms: i64) {
        params.insert("timestamp".to_string(), timestamp_ms.to_string());
    }

    fn sign(&self, payload: SignaturePayload<'_>) -> Vec<SignaturePlacement> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload.query.as_bytes());
        let signature = HexEncoder.encode(&mac.finalize().into_bytes());
        vec![
            SignaturePlacement::QueryParam {
                name: "signature",
                value: signature,
            },
            SignaturePlacement::Header {
                name: "X-MEXC-APIKEY",
                value: self.api_key.clone(),
            },
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct MexcParser;

#[derive(Debug, Clone, Deserialize)]
struct MexcErrorBody {
    code: i64,
    msg: String,
}

impl HttpParser for MexcParser {
    type Error = DataError;

    fn parse<T: DeserializeOwned>(&self, status: StatusCode, payload: &Bytes) -> Result<T, Self::Error> {
        if status.is_success() {
            serde_json::from_slice(payload).map_err(|error| {
                DataError::Parse(format!("{error}: {}", String::from_utf8_lossy(payload)))
            })
        } else {
            let detail = serde_json::from_slice::<MexcErrorBody>(payload)
                .map(|body| format!("code={} msg={}", body.code, body.msg))
                .unwrap_or_else(|_| String::from_utf8_lossy(payload).to_string());
            Err(DataError::Transport(SocketError::HttpResponse(status, detail)))
        }
    }

    fn is_retryable(&self, status: StatusCode, _error: &Self::Error) -> bool {
        status.is_server_error()
    }

    fn is_rate_limited(&self, status: StatusCode, _error: &Self::Error) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS
    }
}

/// MEXC's public market-data endpoints run on a shared per-IP weight budget;
/// `/api/v3/depth` is the only one this client calls.
fn public_rate_limits() -> EndpointRateLimitTable {
    EndpointRateLimitTable::new(
        Duration::from_millis(10),
        &[(
            "/api/v3/depth",
            EndpointLimit {
                requests_per_second: 20.0,
                burst_capacity: 20,
                weight: 1,
            },
        )],
    )
}

/// MEXC's listen-key endpoints are narrowly rate limited relative to general account
/// traffic, so they get their own table entry distinct from the trading client's.
fn listen_key_rate_limits() -> EndpointRateLimitTable {
    EndpointRateLimitTable::new(
        Duration::from_millis(10),
        &[(
            "/api/v3/userDataStream",
            EndpointLimit {
                requests_per_second: 1.0,
                burst_capacity: 2,
                weight: 1,
            },
        )],
    )
}

pub fn public_client() -> RestClient<arc_integration::protocol::http::signer::NoAuth, MexcParser> {
    RestClient::new(
        REST_BASE_URL.to_string(),
        None,
        arc_integration::protocol::http::signer::NoAuth,
        MexcParser,
        RequestConfig::default(),
        DEFAULT_CONCURRENCY,
        public_rate_limits(),
    )
}

pub fn private_client(api_key: String, api_secret: String) -> RestClient<MexcSigner, MexcParser> {
    // `api_key` is carried by `MexcSigner` itself (it emits the
    // `X-MEXC-APIKEY` header via `sign()`), not by `RestClient`'s generic
    // `api_key` slot - that slot unconditionally names its header
    // `X-API-KEY`, which is wrong for MEXC.
    RestClient::new(
        REST_BASE_URL.to_string(),
        None,
        MexcSigner::new(api_key, api_secret),
        MexcParser,
        RequestConfig {
            require_auth: true,
            ..RequestConfig::default()
        },
        DEFAULT_CONCURRENCY,
        listen_key_rate_limits(),
    )
}

/// Fetch a depth snapshot for `symbol` via `GET /api/v3/depth` (public,
/// used for L2 hydration and gap-recovery resync).
pub async fn fetch_order_book_snapshot(
    client: &RestClient<arc_integration::protocol::http::signer::NoAuth, MexcParser>,
    symbol: &str,
    limit: u32,
) -> Result<(Vec<Level>, Vec<Level>, Option<u64>), DataError> {
    let mut params = BTreeMap::new();
    params.insert("symbol".to_string(), symbol.to_string());
    params.insert("limit".to_string(), limit.to_string());

    let snapshot: MexcDepthSnapshot = client.get("/api/v3/depth", Some(params)).await?;

    let bids = snapshot.bids.iter().map(|(p, s)| Level::new(*p, *s)).collect();
    let asks = snapshot.asks.iter().map(|(p, s)| Level::new(*p, *s)).collect();
    Ok((bids, asks, Some(snapshot.last_update_id)))
}

/// Obtain a new listen-key via `POST /api/v3/userDataStream`.
pub async fn create_listen_key(
    client: &RestClient<MexcSigner, MexcParser>,
) -> Result<String, DataError> {
    let response: MexcListenKeyResponse = client
        .post("/api/v3/userDataStream", None, None)
        .await?;
    Ok(response.listen_key)
}

/// Keep an existing listen-key alive via `PUT /api/v3/userDataStream`.
pub async fn refresh_listen_key(
    client: &RestClient<MexcSigner, MexcParser>,
    listen_key: &str,
) -> Result<(), DataError> {
    let mut params = BTreeMap::new();
    params.insert("listenKey".to_string(), listen_key.to_string());
    let _: serde_json::Value = client.put("/api/v3/userDataStream", Some(params), None).await?;
    Ok(())
}
