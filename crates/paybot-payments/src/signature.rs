//! Webhook signature verification.
//!
//! Both providers sign the raw request body with HMAC and send the digest
//! hex-encoded in a header. The PIX provider uses HMAC-SHA256, the crypto
//! provider HMAC-SHA512, each with its own secret.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

use crate::gateway::PaymentMethod;

/// Signature header sent by the PIX provider
pub const PIX_SIGNATURE_HEADER: &str = "x-pushinpay-signature";

/// Signature header sent by the crypto provider
pub const CRYPTO_SIGNATURE_HEADER: &str = "x-nowpayments-sig";

/// Keyed verifier for one provider
#[derive(Clone)]
pub struct SignatureVerifier {
    method: PaymentMethod,
    secret: Vec<u8>,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(method: PaymentMethod, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            method,
            secret: secret.into(),
        }
    }

    /// Header name carrying this provider's signature
    pub const fn header_name(&self) -> &'static str {
        match self.method {
            PaymentMethod::Pix => PIX_SIGNATURE_HEADER,
            PaymentMethod::Crypto => CRYPTO_SIGNATURE_HEADER,
        }
    }

    /// Hex digest of `body`
    pub fn sign(&self, body: &[u8]) -> String {
        match self.method {
            PaymentMethod::Pix => hex::encode(digest::<Hmac<Sha256>>(&self.secret, body)),
            PaymentMethod::Crypto => hex::encode(digest::<Hmac<Sha512>>(&self.secret, body)),
        }
    }

    /// Check `signature` against `body`.
    ///
    /// The header must be exactly the lowercase hex digest that [`sign`]
    /// produces; anything else is invalid. The digest comparison is
    /// constant-time.
    ///
    /// [`sign`]: Self::sign
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> bool {
        let Some(expected) = signature.and_then(decode_lower_hex) else {
            return false;
        };

        match self.method {
            PaymentMethod::Pix => verify_mac::<Hmac<Sha256>>(&self.secret, body, &expected),
            PaymentMethod::Crypto => verify_mac::<Hmac<Sha512>>(&self.secret, body, &expected),
        }
    }
}

/// Decode hex, rejecting uppercase digits and surrounding whitespace so
/// that exactly one encoding of each digest is accepted
fn decode_lower_hex(s: &str) -> Option<Vec<u8>> {
    if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return None;
    }
    hex::decode(s).ok()
}

fn digest<M: Mac + hmac::digest::KeyInit>(secret: &[u8], body: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    let Ok(mut mac) = <M as hmac::digest::KeyInit>::new_from_slice(secret) else {
        return Vec::new();
    };
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

fn verify_mac<M: Mac + hmac::digest::KeyInit>(secret: &[u8], body: &[u8], expected: &[u8]) -> bool {
    let Ok(mut mac) = <M as hmac::digest::KeyInit>::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pix() -> SignatureVerifier {
        SignatureVerifier::new(PaymentMethod::Pix, "pix-secret")
    }

    fn crypto() -> SignatureVerifier {
        SignatureVerifier::new(PaymentMethod::Crypto, "ipn-secret")
    }

    #[test]
    fn test_digest_lengths() {
        assert_eq!(pix().sign(b"{}").len(), 64);
        assert_eq!(crypto().sign(b"{}").len(), 128);
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let verifier = SignatureVerifier::new(PaymentMethod::Pix, "Jefe");
        assert_eq!(
            verifier.sign(b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_missing_or_malformed_header_fails_closed() {
        let body = br#"{"transactionId":"tx1","status":"COMPLETED"}"#;
        assert!(!pix().verify(body, None));
        assert!(!pix().verify(body, Some("")));
        assert!(!pix().verify(body, Some("not-hex!")));
        assert!(!pix().verify(body, Some("abc")));
    }

    #[test]
    fn test_only_the_exact_lowercase_digest_verifies() {
        let body = b"payload";
        let signature = crypto().sign(body);
        assert!(crypto().verify(body, Some(&signature)));
        assert!(!crypto().verify(body, Some(&signature.to_uppercase())));
        assert!(!crypto().verify(body, Some(&format!(" {signature}"))));
        assert!(!crypto().verify(body, Some(&format!("{signature}\n"))));
    }

    #[test]
    fn test_every_header_bit_flip_fails() {
        let body = br#"{"transactionId":"tx1","status":"COMPLETED"}"#;
        for verifier in [pix(), crypto()] {
            let header = verifier.sign(body).into_bytes();
            for i in 0..header.len() {
                for bit in 0..8 {
                    let mut tampered = header.clone();
                    tampered[i] ^= 1 << bit;
                    if let Ok(tampered) = String::from_utf8(tampered) {
                        assert!(
                            !verifier.verify(body, Some(&tampered)),
                            "flip of bit {bit} at {i} verified"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_secrets_and_algorithms_are_not_interchangeable() {
        let body = b"payload";
        let signature = pix().sign(body);
        assert!(!crypto().verify(body, Some(&signature)));
        assert!(!SignatureVerifier::new(PaymentMethod::Pix, "other").verify(body, Some(&signature)));
    }

    proptest! {
        #[test]
        fn prop_valid_signature_verifies(body in proptest::collection::vec(any::<u8>(), 0..512)) {
            for verifier in [pix(), crypto()] {
                let signature = verifier.sign(&body);
                prop_assert!(verifier.verify(&body, Some(&signature)));
            }
        }

        #[test]
        fn prop_body_bit_flip_fails(
            body in proptest::collection::vec(any::<u8>(), 1..512),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            for verifier in [pix(), crypto()] {
                let signature = verifier.sign(&body);
                let mut tampered = body.clone();
                tampered[index.index(body.len())] ^= 1 << bit;
                prop_assert!(!verifier.verify(&tampered, Some(&signature)));
            }
        }

        #[test]
        fn prop_signature_bit_flip_fails(
            body in proptest::collection::vec(any::<u8>(), 0..512),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            for verifier in [pix(), crypto()] {
                let mut raw = hex::decode(verifier.sign(&body)).unwrap();
                let i = index.index(raw.len());
                raw[i] ^= 1 << bit;
                prop_assert!(!verifier.verify(&body, Some(&hex::encode(raw))));
            }
        }

        #[test]
        fn prop_header_bit_flip_fails(
            body in proptest::collection::vec(any::<u8>(), 0..512),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            for verifier in [pix(), crypto()] {
                let mut header = verifier.sign(&body).into_bytes();
                let i = index.index(header.len());
                header[i] ^= 1 << bit;
                // Non-UTF-8 bytes never reach `verify` as a header string
                if let Ok(header) = String::from_utf8(header) {
                    prop_assert!(!verifier.verify(&body, Some(&header)));
                }
            }
        }
    }
}
