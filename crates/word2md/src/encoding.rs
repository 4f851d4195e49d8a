//! Source character encoding detection and transcoding.

use encoding_rs::{DecoderResult, Encoding, MACINTOSH, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;

/// Name returned when the markup declares no charset
pub const DEFAULT_ENCODING: &str = "UTF-8";

static RE_CHARSET: Lazy<Regex> = Lazy::new(|| Regex::new(r#"charset=([^"]+)"#).unwrap());

/// Determine the encoding declared by an HTML export.
///
/// The bytes are decoded leniently and searched for a `charset=` declaration.
/// LibreOffice names Mac Roman `macintosh`; that name is reported as
/// `MacRoman`. Without a declaration the result is `UTF-8`. Never fails.
pub fn detect(raw: &[u8]) -> String {
    let markup = decode_lossy(raw, UTF_8);
    match RE_CHARSET.captures(&markup) {
        Some(caps) => caps[1].replacen("macintosh", "MacRoman", 1),
        None => DEFAULT_ENCODING.to_string(),
    }
}

/// Map an encoding name to its decoder.
///
/// Accepts WHATWG labels plus `MacRoman`; anything unknown decodes as UTF-8.
pub fn lookup(name: &str) -> &'static Encoding {
    let name = name.trim();
    if name.eq_ignore_ascii_case("macroman") {
        return MACINTOSH;
    }
    Encoding::for_label(name.as_bytes()).unwrap_or(UTF_8)
}

/// Decode `raw` with the named encoding into UTF-8, dropping any byte
/// sequence that does not decode.
pub fn transcode(raw: &[u8], encoding: &str) -> String {
    decode_lossy(raw, lookup(encoding))
}

fn decode_lossy(raw: &[u8], encoding: &'static Encoding) -> String {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let capacity = decoder
        .max_utf8_buffer_length_without_replacement(raw.len())
        .unwrap_or(raw.len() * 3);
    let mut out = String::with_capacity(capacity);
    let mut input = raw;

    loop {
        let (result, read) = decoder.decode_to_string_without_replacement(input, &mut out, true);
        input = &input[read..];
        match result {
            DecoderResult::InputEmpty => break,
            DecoderResult::OutputFull => out.reserve(input.len() * 3 + 16),
            // Malformed bytes are already consumed, keep going
            DecoderResult::Malformed(_, _) => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_utf8() {
        assert_eq!(detect(b"<html></html>"), "UTF-8");
    }

    #[test]
    fn test_detects_meta_charset() {
        let html = br#"<meta http-equiv="content-type" content="text/html; charset=windows-1252"/>"#;
        assert_eq!(detect(html), "windows-1252");
    }

    #[test]
    fn test_remaps_macintosh() {
        assert_eq!(detect(b"charset=macintosh"), "MacRoman");
    }

    #[test]
    fn test_detect_survives_invalid_bytes() {
        let mut html = b"<meta content=\"text/html; charset=utf-8\">".to_vec();
        html.extend_from_slice(&[0xff, 0xfe, 0x80]);
        assert_eq!(detect(&html), "utf-8");
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("MacRoman"), MACINTOSH);
        assert_eq!(lookup("utf-8"), UTF_8);
        assert_eq!(lookup("windows-1252").name(), "windows-1252");
        assert_eq!(lookup("no-such-encoding"), UTF_8);
    }

    #[test]
    fn test_transcode_windows_1252() {
        // 0x93 / 0x94 are curly double quotes in windows-1252
        assert_eq!(transcode(b"\x93hi\x94", "windows-1252"), "\u{201C}hi\u{201D}");
    }

    #[test]
    fn test_transcode_mac_roman() {
        // 0x8E is e-acute in Mac Roman
        assert_eq!(transcode(b"caf\x8E", "MacRoman"), "caf\u{e9}");
    }

    #[test]
    fn test_transcode_drops_invalid_sequences() {
        assert_eq!(transcode(b"a\xffb\xc3", "UTF-8"), "ab");
    }
}
