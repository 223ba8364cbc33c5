//! Password attribute encoding.
//!
//! The directory expects the password attribute value to be produced with a
//! fixed three-step encoding: wrap the plaintext in double quotes, encode
//! the quoted string as UTF-16LE bytes, then base64 the bytes. Nothing else
//! is applied, and the steps invert exactly.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode a plaintext password as a `unicodePwd` attribute value.
///
/// Pure and deterministic; the plaintext only ever lives on the call stack.
#[must_use]
pub fn encode_unicode_pwd(password: &str) -> String {
    let quoted = format!("\"{password}\"");
    let utf16le: Vec<u8> = quoted.encode_utf16().flat_map(u16::to_le_bytes).collect();
    STANDARD.encode(utf16le)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode(encoded: &str) -> String {
        let raw = STANDARD.decode(encoded).unwrap();
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let quoted = String::from_utf16(&units).unwrap();
        quoted
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap()
            .to_string()
    }

    #[test]
    fn known_vectors() {
        assert_eq!(
            encode_unicode_pwd("newPassword"),
            "IgBuAGUAdwBQAGEAcwBzAHcAbwByAGQAIgA="
        );
        assert_eq!(
            encode_unicode_pwd("P@ssw0rd!"),
            "IgBQAEAAcwBzAHcAMAByAGQAIQAiAA=="
        );
    }

    #[test]
    fn non_ascii_roundtrip() {
        assert_eq!(decode(&encode_unicode_pwd("пароль")), "пароль");
    }

    proptest! {
        #[test]
        fn roundtrip_recovers_plaintext(password in "\\PC{0,40}") {
            prop_assert_eq!(decode(&encode_unicode_pwd(&password)), password);
        }
    }
}
