//! Source encoding → UTF-8

/// Decode ISO-8859-1: every byte is the code point of the same value.
pub fn decode_latin1(raw: &[u8]) -> String {
    raw.iter().copied().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_unchanged() {
        assert_eq!(decode_latin1(b"<html>ok</html>"), "<html>ok</html>");
    }

    #[test]
    fn high_bytes_map_to_code_points() {
        assert_eq!(decode_latin1(b"caf\xe9"), "café");
        assert_eq!(decode_latin1(b"\xb5g"), "µg");
        assert_eq!(decode_latin1(b"\xa0"), "\u{a0}");
    }

    #[test]
    fn empty() {
        assert_eq!(decode_latin1(b""), "");
    }
}
