//! XML decoding shim.
//!
//! Real-world feeds routinely carry illegal control characters, lie about
//! their encoding, and embed named HTML entities that plain XML forbids.
//! Everything XML-shaped goes through [`decode_document`] before any format
//! parser sees it:
//!
//! 1. the declared charset is sniffed from the prolog and transcoded to
//!    UTF-8 when it is not already UTF-8,
//! 2. every Unicode scalar outside the legal XML ranges is dropped,
//! 3. named HTML entities are rewritten into literal characters so the
//!    strict entity layer of the XML reader never fails on `&nbsp;`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported document encoding: {0}")]
    UnsupportedEncoding(String),
}

/// The five entity names plain XML predefines; these must survive untouched
/// or escaped markup would leak back into the token stream.
const XML_PREDEFINED_ENTITIES: &[&str] = &["lt", "gt", "amp", "quot", "apos"];

/// Decodes raw feed bytes into a clean UTF-8 document string.
pub fn decode_document(data: &[u8]) -> Result<String, DecodeError> {
    let text = match declared_encoding(data) {
        Some(label) if !label.eq_ignore_ascii_case("utf-8") => {
            let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
                .ok_or(DecodeError::UnsupportedEncoding(label))?;
            let (decoded, _, _) = encoding.decode(data);
            decoded.into_owned()
        }
        _ => String::from_utf8_lossy(data).into_owned(),
    };

    // A leading BOM would surface as stray text before the root element.
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(&text);

    Ok(rewrite_entities(&filter_valid_xml_chars(text)))
}

/// Extracts the `encoding="..."` label from the XML declaration, if any.
///
/// The scan is deliberately loose (first `encoding=` followed by a quoted
/// value); it matches what feeds actually write rather than the grammar.
fn declared_encoding(data: &[u8]) -> Option<String> {
    let haystack = &data[..data.len().min(1024)];
    let needle = b"encoding=";
    let start = haystack
        .windows(needle.len())
        .position(|window| window == needle)?
        + needle.len();

    let rest = &haystack[start..];
    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = rest[1..].iter().position(|&b| b == quote)?;
    Some(String::from_utf8_lossy(&rest[1..=end]).into_owned())
}

/// Drops every scalar outside the ranges the XML specification allows:
/// tab, CR, LF, U+0020–U+D7FF, U+E000–U+FFFD, U+10000–U+10FFFF.
fn filter_valid_xml_chars(text: &str) -> String {
    text.chars().filter(|&c| is_valid_xml_char(c)).collect()
}

fn is_valid_xml_char(c: char) -> bool {
    matches!(c,
        '\u{09}' | '\u{0A}' | '\u{0D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Rewrites named HTML entities into their literal characters.
///
/// XML builtins and numeric character references pass through unchanged.
/// A name the HTML table does not know either is left ampersand-escaped so
/// the reader sees plain text instead of failing the whole document.
fn rewrite_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        match entity_name(rest) {
            Some(name) => {
                let advance = name.len() + 2; // '&' + name + ';'
                if XML_PREDEFINED_ENTITIES.contains(&name) {
                    out.push_str(&rest[..advance]);
                } else {
                    let entity = &rest[..advance];
                    let decoded = html_escape::decode_html_entities(entity);
                    if decoded == entity {
                        // Unknown name; keep it visible as text.
                        out.push_str("&amp;");
                        out.push_str(&rest[1..advance]);
                    } else {
                        // Decoded characters could in principle collide with
                        // markup, so escape anything structural.
                        for c in decoded.chars() {
                            match c {
                                '<' => out.push_str("&lt;"),
                                '>' => out.push_str("&gt;"),
                                '&' => out.push_str("&amp;"),
                                _ => out.push(c),
                            }
                        }
                    }
                }
                rest = &rest[advance..];
            }
            None => {
                // Bare ampersand or numeric reference; numeric references are
                // legal XML, a bare '&' is escaped.
                if rest[1..].starts_with('#') {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Returns the name of a `&name;` reference at the start of `s`, or `None`
/// for numeric references, bare ampersands, and unterminated names.
fn entity_name(s: &str) -> Option<&str> {
    let body = &s[1..];
    let end = body.find(';')?;
    let name = &body[..end];
    if name.is_empty() || name.len() > 32 {
        return None;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric())
        || !name.starts_with(|c: char| c.is_ascii_alphabetic())
    {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_document_passes_through() {
        let doc = br#"<?xml version="1.0" encoding="utf-8"?><rss><channel/></rss>"#;
        let decoded = decode_document(doc).unwrap();
        assert!(decoded.contains("<rss>"));
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut doc = b"\xEF\xBB\xBF".to_vec();
        doc.extend_from_slice(b"<rss><channel/></rss>");
        let decoded = decode_document(&doc).unwrap();
        assert!(decoded.starts_with("<rss>"));
    }

    #[test]
    fn test_declared_encoding_sniff() {
        assert_eq!(
            declared_encoding(br#"<?xml version="1.0" encoding="ISO-8859-1"?>"#),
            Some("ISO-8859-1".to_string())
        );
        assert_eq!(declared_encoding(br#"<?xml version="1.0"?>"#), None);
    }

    #[test]
    fn test_latin1_transcoding() {
        let mut doc = br#"<?xml version="1.0" encoding="ISO-8859-1"?><rss><channel><title>caf"#.to_vec();
        doc.push(0xE9); // é in latin-1
        doc.extend_from_slice(b"</title></channel></rss>");
        let decoded = decode_document(&doc).unwrap();
        assert!(decoded.contains("café"));
    }

    #[test]
    fn test_illegal_control_chars_dropped() {
        let doc = b"<rss><channel><title>a\x08b\x00c</title></channel></rss>";
        let decoded = decode_document(doc).unwrap();
        assert!(decoded.contains("<title>abc</title>"));
    }

    #[test]
    fn test_named_html_entity_rewritten() {
        let decoded = rewrite_entities("<title>a&nbsp;b &rsquo; c</title>");
        assert_eq!(decoded, "<title>a\u{a0}b \u{2019} c</title>");
    }

    #[test]
    fn test_xml_builtins_untouched() {
        let decoded = rewrite_entities("<t>&lt;b&gt; &amp; &quot;x&quot; &apos;y&apos;</t>");
        assert_eq!(decoded, "<t>&lt;b&gt; &amp; &quot;x&quot; &apos;y&apos;</t>");
    }

    #[test]
    fn test_numeric_references_untouched() {
        let decoded = rewrite_entities("<t>&#169; &#x2122;</t>");
        assert_eq!(decoded, "<t>&#169; &#x2122;</t>");
    }

    #[test]
    fn test_unknown_entity_escaped() {
        let decoded = rewrite_entities("<t>&doesnotexist;</t>");
        assert_eq!(decoded, "<t>&amp;doesnotexist;</t>");
    }

    #[test]
    fn test_bare_ampersand_escaped() {
        let decoded = rewrite_entities("<t>fish & chips</t>");
        assert_eq!(decoded, "<t>fish &amp; chips</t>");
    }

    #[test]
    fn test_unsupported_encoding_errors() {
        let doc = br#"<?xml version="1.0" encoding="no-such-charset"?><rss/>"#;
        assert!(matches!(
            decode_document(doc),
            Err(DecodeError::UnsupportedEncoding(_))
        ));
    }
}
