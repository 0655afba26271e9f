/// Decode a possibly RFC 2047 encoded header value.
///
/// mailparse expects a full "Key: value" header line, so one is synthesized.
/// Undecodable input falls back to lossy UTF-8 — header decoding never fails
/// the pipeline. Already-plain input comes back unchanged.
pub fn decode_header_bytes(raw: &[u8]) -> String {
    let mut line = b"X: ".to_vec();
    line.extend_from_slice(raw);
    line.extend_from_slice(b"\r\n");

    match mailparse::parse_header(&line) {
        Ok((h, _idx)) => h.get_value(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

pub fn decode_header_str(raw: &str) -> String {
    decode_header_bytes(raw.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_header_is_unchanged() {
        assert_eq!(
            decode_header_str("[Weekly Update] Week 3"),
            "[Weekly Update] Week 3"
        );
        assert_eq!(decode_header_str("photo.JPG"), "photo.JPG");
    }

    #[test]
    fn decoding_is_idempotent() {
        let once = decode_header_str("=?utf-8?B?d2Vla8OkbHk=?=");
        let twice = decode_header_str(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn decodes_encoded_word() {
        assert_eq!(decode_header_str("=?utf-8?Q?caf=C3=A9?="), "café");
    }

    #[test]
    fn decodes_multi_part_encoded_header() {
        let decoded = decode_header_str("=?utf-8?Q?Week?= =?utf-8?Q?_3?=");
        assert_eq!(decoded, "Week 3");
    }

    #[test]
    fn invalid_bytes_fall_back_to_lossy() {
        let decoded = decode_header_bytes(&[0x66, 0xff, 0x6f]);
        assert!(decoded.contains('f'));
        assert!(decoded.contains('o'));
    }
}
