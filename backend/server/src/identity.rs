//! # Identity
//!
//! Short key correlating a generated QR code with its analytics record.
//!
//! ## Derivation
//!
//! - Standard base64 of the raw UTF-8 text
//! - Drop everything that is not `[A-Za-z0-9]` (`+`, `/`, `=` padding)
//! - Keep the first 16 characters
//!
//! ## Notes
//!
//! This is an encoding, not a hash. 12 bytes of input fill 16 base64
//! characters, so any two texts sharing their first 12 bytes share a key and
//! their analytics are merged. Switching to a content hash would change the
//! observable key format.
use base64::{Engine, engine::general_purpose::STANDARD};

pub const QR_ID_LEN: usize = 16;

pub fn qr_id(text: &str) -> String {
    STANDARD
        .encode(text.as_bytes())
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(QR_ID_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{QR_ID_LEN, qr_id};

    fn is_key(key: &str) -> bool {
        key.len() <= QR_ID_LEN && key.chars().all(|c| c.is_ascii_alphanumeric())
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(qr_id("https://example.com"), qr_id("https://example.com"));
        assert_eq!(qr_id("hello"), qr_id("hello"));
    }

    #[test]
    fn test_known_values() {
        // base64("https://example.com") = "aHR0cHM6Ly9leGFtcGxlLmNvbQ=="
        assert_eq!(qr_id("https://example.com"), "aHR0cHM6Ly9leGFt");
        // base64("hi") = "aGk="
        assert_eq!(qr_id("hi"), "aGk");
    }

    #[test]
    fn test_alphabet_and_length() {
        for text in [
            "a",
            "https://example.com/path?query=1&other=two",
            "???>>>???>>>",
            "ünïcödé ☃ text",
            "   ",
            &"x".repeat(4096),
        ] {
            let key = qr_id(text);
            assert!(is_key(&key), "{text:?} produced {key:?}");
        }
    }

    #[test]
    fn test_long_text_is_full_length() {
        assert_eq!(qr_id("https://example.com").len(), QR_ID_LEN);
    }

    #[test]
    fn test_shared_prefix_collides() {
        // Both texts start with the same 12 bytes "https://exam".
        assert_eq!(qr_id("https://example.com"), qr_id("https://example.org"));
        assert_ne!(qr_id("https://example.com"), qr_id("http://example.com"));
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(qr_id(""), "");
    }
}
