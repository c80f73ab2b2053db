//! Recovery of values written before envelope encryption existed.
//!
//! Old rows hold one of two legacy shapes: plain text stored directly, or
//! plain text that was base64-encoded without encryption. Neither carries a
//! marker, so the shape is inferred from the candidate plaintext itself —
//! the decoded bytes when the value base64-decodes, the raw string
//! otherwise. Each step here is a total function returning success or
//! failure; the codec composes them first-match-wins.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Returns `true` if `s` is plausibly human-readable stored text: non-empty
/// and consisting entirely of printable ASCII (`0x20..=0x7E`) or whitespace.
///
/// A decoded envelope can never satisfy this — its first byte is `0x01`,
/// outside the printable range. Genuinely binary legacy data fails it too
/// and ends up in the caller's passthrough branch.
pub fn looks_like_plaintext(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| matches!(c, '\x20'..='\x7E') || c.is_whitespace())
}

/// Recovery step 1: the stored value is base64-wrapped readable text.
///
/// Tried before [`as_plaintext`]: a wrapped value is itself printable ASCII,
/// so the raw-text branch would swallow it and it would never be unwrapped.
pub fn as_base64_text(stored: &str) -> Option<String> {
    let raw = STANDARD.decode(stored).ok()?;
    let text = String::from_utf8(raw).ok()?;
    looks_like_plaintext(&text).then_some(text)
}

/// Recovery step 2: the stored value is already readable text.
pub fn as_plaintext(stored: &str) -> Option<&str> {
    looks_like_plaintext(stored).then_some(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_is_plaintext() {
        assert!(looks_like_plaintext("hello world"));
        assert!(looks_like_plaintext("https://example.com/page?q=1"));
    }

    #[test]
    fn whitespace_is_allowed() {
        assert!(looks_like_plaintext("line one\nline two\ttabbed"));
        assert!(looks_like_plaintext("   "));
    }

    #[test]
    fn empty_is_not_plaintext() {
        assert!(!looks_like_plaintext(""));
    }

    #[test]
    fn control_bytes_are_not_plaintext() {
        assert!(!looks_like_plaintext("abc\u{01}def"));
        assert!(!looks_like_plaintext("\u{7f}"));
    }

    #[test]
    fn non_ascii_text_is_not_plaintext() {
        // The heuristic is printable *ASCII*; accented or non-Latin text
        // falls through to the passthrough branch, which returns it
        // unchanged anyway.
        assert!(!looks_like_plaintext("héllo"));
        assert!(!looks_like_plaintext("日本語"));
    }

    #[test]
    fn as_plaintext_passes_readable_text_through() {
        assert_eq!(as_plaintext("bookmark title"), Some("bookmark title"));
        assert_eq!(as_plaintext(""), None);
    }

    #[test]
    fn as_base64_text_unwraps_wrapped_text() {
        let wrapped = STANDARD.encode("hello world");
        assert_eq!(as_base64_text(&wrapped).as_deref(), Some("hello world"));
    }

    #[test]
    fn as_base64_text_rejects_invalid_base64() {
        assert_eq!(as_base64_text("hello world"), None);
    }

    #[test]
    fn as_base64_text_rejects_wrapped_binary() {
        let wrapped = STANDARD.encode([0x01u8, 0x02, 0x9c, 0xff]);
        assert_eq!(as_base64_text(&wrapped), None);
    }

    #[test]
    fn as_base64_text_rejects_non_utf8_payload() {
        let wrapped = STANDARD.encode([0xc3u8, 0x28]);
        assert_eq!(as_base64_text(&wrapped), None);
    }
}
