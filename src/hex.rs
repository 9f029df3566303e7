//! Hex text helpers for WKB and raster payloads.

const UPPER_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Encode bytes as upper-case hex, the form the database prints for geometry and raster values.
pub(crate) fn encode_upper(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(UPPER_DIGITS[usize::from(byte >> 4)]));
        out.push(char::from(UPPER_DIGITS[usize::from(byte & 0x0f)]));
    }
    out
}

/// Whether the buffer is hex text rather than raw WKB.
///
/// Raw WKB always starts with a byte-order byte of 0x00 or 0x01, neither of
/// which is an ASCII hex digit, so the two never overlap.
pub(crate) fn is_hex_text(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_hexdigit)
}

/// Decode hex text; `None` on odd length or a non-hex digit.
pub(crate) fn decode(text: &[u8]) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    text.chunks_exact(2)
        .map(|pair| Some((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

fn nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_upper() {
        assert_eq!(encode_upper(&[0x01, 0xe6, 0x10]), "01E610");
        assert_eq!(encode_upper(&[]), "");
    }

    #[test]
    fn test_decode_mixed_case() {
        assert_eq!(decode(b"01e610F0"), Some(vec![0x01, 0xe6, 0x10, 0xf0]));
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert_eq!(decode(b"11110008066C00000000000000000"), None);
    }

    #[test]
    fn test_is_hex_text() {
        assert!(is_hex_text(b"0101000000"));
        assert!(!is_hex_text(&[0x01, 0x01, 0x00]));
        assert!(!is_hex_text(b""));
        assert!(!is_hex_text(b"POINT (0 0)"));
    }
}
