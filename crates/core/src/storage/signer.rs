//! HMAC-signed download URLs for providers without native presigning.
//!
//! URL shape: `{base}/api/images/{key}?expires={unix_secs}&signature={hex}`.
//! The signature covers `{key}\n{expires}`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::error::StorageError;

type HmacSha256 = Hmac<Sha256>;

/// Path prefix under which self-signed images are served.
pub const IMAGE_ROUTE_PREFIX: &str = "/api/images/";

/// Signs and verifies download URLs served by this backend.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
    base_url: String,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .field("secret", &"[hidden]")
            .finish()
    }
}

impl UrlSigner {
    /// Create a signer for the given secret and public base URL.
    #[must_use]
    pub fn new(secret: &str, base_url: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn mac(&self, key: &str, expires: i64) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    /// Hex signature for a key and expiry.
    #[must_use]
    pub fn signature(&self, key: &str, expires: i64) -> String {
        hex::encode(self.mac(key, expires).finalize().into_bytes())
    }

    /// Build a signed URL valid until `expires_at`.
    #[must_use]
    pub fn sign(&self, key: &str, expires_at: DateTime<Utc>) -> String {
        let expires = expires_at.timestamp();
        format!(
            "{}{}{}?expires={}&signature={}",
            self.base_url,
            IMAGE_ROUTE_PREFIX,
            key,
            expires,
            self.signature(key, expires)
        )
    }

    /// Check a signature and expiry against `now`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` if the signature is malformed or does not
    /// match, `SignatureExpired` if `now` is past `expires`.
    pub fn verify(
        &self,
        key: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let provided = hex::decode(signature).map_err(|_| StorageError::InvalidSignature)?;
        self.mac(key, expires)
            .verify_slice(&provided)
            .map_err(|_| StorageError::InvalidSignature)?;

        if now.timestamp() > expires {
            return Err(StorageError::SignatureExpired);
        }
        Ok(())
    }
}
