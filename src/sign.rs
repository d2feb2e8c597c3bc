// sign.rs
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use md5::{Digest, Md5};

/// Length of a hex encoded signature.
pub const SIGNATURE_LEN: usize = 32;

/// Computes the vendor signature for a request or webhook body.
///
/// The body is base64 encoded, the secret key is appended to the encoded
/// text and the MD5 digest of the result is returned as lowercase hex.
/// This is the scheme the gateway mandates; it must be reproduced exactly.
pub fn sign(secret_key: &str, payload: &[u8]) -> String {
    let encoded = STANDARD.encode(payload);

    let mut hasher = Md5::new();
    hasher.update(encoded.as_bytes());
    hasher.update(secret_key.as_bytes());

    hex::encode(hasher.finalize())
}

/// Compares two signatures without short-circuiting on the first mismatch.
pub fn signatures_match(expected: &str, actual: &str) -> bool {
    let (a, b) = (expected.as_bytes(), actual.as_bytes());
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = br#"{"type":"payment","amount":"1"}"#;

    #[test]
    fn known_vector() {
        assert_eq!(sign("abc", PAYLOAD), "f11a2915381b47c5f6826b2e1188f379");
    }

    #[test]
    fn signature_is_lowercase_hex_of_fixed_length() {
        let signature = sign("abc", PAYLOAD);
        assert_eq!(signature.len(), SIGNATURE_LEN);
        assert!(signature
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn signing_is_deterministic() {
        assert_eq!(sign("abc", PAYLOAD), sign("abc", PAYLOAD));
    }

    #[test]
    fn key_changes_signature() {
        assert_ne!(sign("abc", PAYLOAD), sign("abd", PAYLOAD));
    }

    #[test]
    fn empty_payload_still_signs() {
        assert_eq!(sign("", b"").len(), SIGNATURE_LEN);
    }

    #[test]
    fn match_is_exact() {
        let signature = sign("abc", PAYLOAD);
        assert!(signatures_match(&signature, &signature));
        assert!(!signatures_match(&signature, &signature.to_uppercase()));
        assert!(!signatures_match(&signature, &signature[1..]));
        assert!(!signatures_match(&signature, ""));
    }
}
