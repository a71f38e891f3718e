//! Byte/text conversions between the decoder's pass-through encoding and
//! the national code page.

use encoding_rs::Encoding;

use crate::utils::{ScanError, ScanResult};

/// Single-byte encoding used to carry decoder bytes through text APIs
/// without loss: byte `b` is code point `U+00bb`.
pub const PASS_THROUGH_CODE_PAGE: &str = "ISO-8859-1";

/// Replacement byte for code points outside the pass-through range.
const UNMAPPABLE: u8 = b'?';

pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// One byte per char; anything above U+00FF becomes `?`.
pub fn latin1_encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(UNMAPPABLE))
        .collect()
}

pub fn is_latin1(text: &str) -> bool {
    text.chars().all(|c| u32::from(c) <= 0xFF)
}

pub fn resolve(label: &str) -> ScanResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| ScanError::UnknownCodePage(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_is_byte_preserving() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = latin1_decode(&bytes);
        assert_eq!(text.chars().count(), 256);
        assert_eq!(latin1_encode(&text), bytes);
    }

    #[test]
    fn test_wide_chars_become_question_marks() {
        assert_eq!(latin1_encode("a\u{0645}b"), b"a?b".to_vec());
        assert!(!is_latin1("\u{0645}"));
        assert!(is_latin1("\u{00e9}"));
    }

    #[test]
    fn test_resolve_labels() {
        assert_eq!(resolve("windows-1256").unwrap(), encoding_rs::WINDOWS_1256);
        assert!(matches!(resolve("klingon"), Err(ScanError::UnknownCodePage(_))));
    }
}
