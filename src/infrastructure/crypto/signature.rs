//! HMAC-SHA256 payload signatures
//!
//! Gateways sign callbacks and webhooks as lowercase hex
//! `HMAC_SHA256(secret, payload)`. Comparison is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::application::ports::SignatureVerifier;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct HmacSha256Verifier {
    secret: Vec<u8>,
}

impl HmacSha256Verifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Hex signature of `payload`. Also used by the mock gateway and tests
    /// to produce valid callbacks.
    pub fn sign(&self, payload: &[u8]) -> String {
        hex::encode(self.mac(payload))
    }

    fn mac(&self, payload: &[u8]) -> Vec<u8> {
        // HMAC accepts keys of any length
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => return Vec::new(),
        };
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

impl SignatureVerifier for HmacSha256Verifier {
    fn verify(&self, payload: &[u8], signature: &str) -> bool {
        let Ok(provided) = hex::decode(signature.trim()) else {
            return false;
        };
        let expected = self.mac(payload);
        if expected.is_empty() || provided.len() != expected.len() {
            return false;
        }
        bool::from(expected.ct_eq(&provided))
    }
}

impl std::fmt::Debug for HmacSha256Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSha256Verifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        let v = HmacSha256Verifier::new("Jefe");
        assert_eq!(
            v.sign(b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn verifies_own_signature_only() {
        let v = HmacSha256Verifier::new("key_secret");
        let payload = b"order_1|pay_1";
        let sig = v.sign(payload);

        assert!(v.verify(payload, &sig));
        assert!(v.verify(payload, &sig.to_uppercase()));
        assert!(!v.verify(b"order_1|pay_2", &sig));
        assert!(!HmacSha256Verifier::new("other").verify(payload, &sig));
    }

    #[test]
    fn malformed_signatures_are_rejected() {
        let v = HmacSha256Verifier::new("key_secret");
        assert!(!v.verify(b"x", ""));
        assert!(!v.verify(b"x", "not-hex"));
        assert!(!v.verify(b"x", "abcd"));
    }
}
