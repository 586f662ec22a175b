use super::rest::{create_listen_key, refresh_listen_key, MexcParser, MexcSigner};
use crate::error::DataError;
use arc_integration::protocol::http::client::RestClient;
use parking_lot::RwLock;
use tracing::{info, warn};

/// Owns one MEXC user-data-stream listen-key across its lifetime and applies the
/// reuse-until-reject policy: every call keeps the existing key alive via `refresh`,
/// and only mints a replacement once the exchange rejects that refresh (expired or
/// unknown key), rather than rotating keys on a fixed schedule.
#[derive(Debug, Default)]
pub struct ListenKeySession {
    key: RwLock<Option<String>>,
}

impl ListenKeySession {
    pub fn new() -> Self {
        Self { key: RwLock::new(None) }
    }

    /// Returns the current listen-key, minting one if this session has never held one.
    pub async fn ensure(&self, client: &RestClient<MexcSigner, MexcParser>) -> Result<String, DataError> {
        if let Some(key) = self.key.read().clone() {
            return Ok(key);
        }
        let key = create_listen_key(client).await?;
        info!("created new MEXC listen-key");
        *self.key.write() = Some(key.clone());
        Ok(key)
    }

    /// Keeps the current listen-key alive. If the exchange rejects the keep-alive call
    /// the key is treated as gone and a fresh one is minted and adopted in its place.
    pub async fn refresh_or_rotate(&self, client: &RestClient<MexcSigner, MexcParser>) -> Result<String, DataError> {
        let current = self.ensure(client).await?;
        match refresh_listen_key(client, &current).await {
            Ok(()) => Ok(current),
            Err(error) => {
                warn!(%error, "MEXC listen-key refresh rejected, minting a replacement");
                let fresh = create_listen_key(client).await?;
                *self.key.write() = Some(fresh.clone());
                Ok(fresh)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_holds_no_key_until_ensure_is_called() {
        let session = ListenKeySession::new();
        assert!(session.key.read().is_none());
    }
}
