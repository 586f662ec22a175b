use reqwest::Method;
use std::collections::BTreeMap;

/// Everything an exchange-specific signature generator needs to compute a
/// signature: for exchanges that sign a canonical string (method + path +
/// query + body-hash + timestamp), the generator receives all components.
#[derive(Debug, Clone)]
pub struct SignaturePayload<'a> {
    pub method: Method,
    pub path: &'a str,
    pub query: &'a str,
    pub body: &'a [u8],
    pub timestamp_ms: i64,
}

/// Where a computed signature is placed on the outgoing request.
#[derive(Debug, Clone)]
pub enum SignaturePlacement {
    /// Appended as `params[name] = signature`.
    QueryParam { name: &'static str, value: String },
    /// Set as a request header.
    Header { name: &'static str, value: String },
}

/// Exchange-specific signing strategy, invoked by [`super::client::RestClient`] with
/// the fully-prepared parameter map (including any injected `timestamp` / `recvWindow`)
/// for authenticated requests.
pub trait Signer: Send + Sync {
    /// Inject any mandatory auth parameters (eg/ `timestamp`, `recvWindow`)
    /// ahead of signing. Default is a no-op.
    fn prepare_params(&self, params: &mut BTreeMap<String, String>, timestamp_ms: i64) {
        let _ = (params, timestamp_ms);
    }

    /// Compute the signature placements to attach to the request.
    fn sign(&self, payload: SignaturePayload<'_>) -> Vec<SignaturePlacement>;
}

/// A [`Signer`] for public (unauthenticated) endpoints - adds nothing.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoAuth;

impl Signer for NoAuth {
    fn sign(&self, _payload: SignaturePayload<'_>) -> Vec<SignaturePlacement> {
        Vec::new()
    }
}
