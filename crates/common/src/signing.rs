//! HMAC token signing for unsubscribe links.
//!
//! A token carries its value in the clear followed by an HMAC-SHA256
//! signature: `{value}:{hex_mac}`. Verification recomputes the signature
//! and compares in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies opaque string values.
#[derive(Clone)]
pub struct Signer {
    secret: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

impl Signer {
    /// Create a signer with the given secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self) -> AppResult<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::Internal(format!("invalid signing key: {e}")))
    }

    /// Sign a value, producing a `{value}:{signature}` token.
    pub fn sign(&self, value: &str) -> AppResult<String> {
        let mut mac = self.mac()?;
        mac.update(value.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{value}:{signature}"))
    }

    /// Verify a token and return the signed value.
    ///
    /// Returns [`AppError::BadSignature`] for malformed or forged tokens.
    pub fn unsign(&self, token: &str) -> AppResult<String> {
        let (value, signature) = token.rsplit_once(':').ok_or(AppError::BadSignature)?;
        let raw = hex::decode(signature).map_err(|_| AppError::BadSignature)?;
        let mut mac = self.mac()?;
        mac.update(value.as_bytes());
        mac.verify_slice(&raw).map_err(|_| AppError::BadSignature)?;
        Ok(value.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_round_trip() {
        let signer = Signer::new("secret");
        let token = signer.sign("user1").unwrap();

        assert!(token.starts_with("user1:"));
        assert_eq!(signer.unsign(&token).unwrap(), "user1");
    }

    #[test]
    fn test_unsign_rejects_tampered_value() {
        let signer = Signer::new("secret");
        let token = signer.sign("user1").unwrap();
        let tampered = token.replacen("user1", "user2", 1);

        assert!(matches!(
            signer.unsign(&tampered),
            Err(AppError::BadSignature)
        ));
    }

    #[test]
    fn test_unsign_rejects_other_key() {
        let signer = Signer::new("secret");
        let other = Signer::new("other-secret");
        let token = signer.sign("user1").unwrap();

        assert!(matches!(other.unsign(&token), Err(AppError::BadSignature)));
    }

    #[test]
    fn test_unsign_rejects_garbage() {
        let signer = Signer::new("secret");

        assert!(matches!(
            signer.unsign("no-separator"),
            Err(AppError::BadSignature)
        ));
        assert!(matches!(
            signer.unsign("user1:nothex"),
            Err(AppError::BadSignature)
        ));
    }
}
