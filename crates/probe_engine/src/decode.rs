use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
    /// Malformed sequences were replaced with U+FFFD.
    pub lossy: bool,
}

/// Decode raw bytes into UTF-8 using: BOM -> Content-Type charset -> chardetng fallback.
///
/// Never fails: malformed input is decoded lossily and flagged, since a page
/// with a few bad bytes can still carry the comments header.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> DecodedHtml {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches(['"', '\'']).to_string())
        })
        .find(|label| !label.is_empty())
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedHtml {
    let (text, _, had_errors) = enc.decode(bytes);
    DecodedHtml {
        html: text.into_owned(),
        encoding_label: enc.name().to_string(),
        lossy: had_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_parameter_is_case_insensitive() {
        assert_eq!(
            extract_charset("text/html; CharSet=\"windows-1256\""),
            Some("windows-1256".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }

    #[test]
    fn arabic_windows_1256_is_decoded_from_header() {
        // "تعليق" in windows-1256
        let bytes = [0xca, 0xda, 0xe1, 0xed, 0xde];
        let decoded = decode_html(&bytes, Some("text/html; charset=windows-1256"));
        assert_eq!(decoded.html, "تعليق");
        assert_eq!(decoded.encoding_label, "windows-1256");
        assert!(!decoded.lossy);
    }

    #[test]
    fn utf8_bom_wins_over_header() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice("التعليقات".as_bytes());
        let decoded = decode_html(&bytes, Some("text/html; charset=ISO-8859-1"));
        assert_eq!(decoded.html, "التعليقات");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn malformed_utf8_is_flagged_not_rejected() {
        let decoded = decode_html(b"ok \xff\xfe tail", Some("text/html; charset=utf-8"));
        assert!(decoded.lossy);
        assert!(decoded.html.starts_with("ok "));
        assert!(decoded.html.ends_with(" tail"));
    }
}
