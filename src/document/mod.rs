//! XML document queries shared by title derivation and the built-in transform

pub mod transform;

pub use transform::{DocumentTransformer, TransformRegistry};

use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Text content of the first element with the given local name, if any
///
/// Streaming scan; namespace prefixes on element names are ignored. Returns
/// `None` when no such element exists or its content is only whitespace.
pub fn first_element_text(xml: &str, local_name: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut capturing = false;
    let mut depth_in_match = 0usize;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if capturing {
                    depth_in_match += 1;
                } else if e.local_name().as_ref() == local_name.as_bytes() {
                    capturing = true;
                    depth_in_match = 0;
                }
            }
            Ok(Event::Text(ref e)) => {
                if capturing {
                    if let Ok(t) = e.unescape() {
                        text.push_str(&t);
                    }
                }
            }
            Ok(Event::CData(ref e)) => {
                if capturing {
                    if let Ok(t) = String::from_utf8(e.to_vec()) {
                        text.push_str(&t);
                    }
                }
            }
            Ok(Event::End(_)) if capturing => {
                if depth_in_match == 0 {
                    break;
                }
                depth_in_match -= 1;
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The first `<title>` element under the document root
pub fn extract_title(xml: &str) -> Option<String> {
    first_element_text(xml, "title")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title() {
        let xml = r#"<record><title>A Study of Things</title><creator>Doe, J.</creator></record>"#;
        assert_eq!(extract_title(xml), Some("A Study of Things".to_string()));
    }

    #[test]
    fn test_extract_title_prefixed() {
        let xml = r#"<mods:mods xmlns:mods="urn:x"><mods:titleInfo><mods:title>Nested</mods:title></mods:titleInfo></mods:mods>"#;
        assert_eq!(extract_title(xml), Some("Nested".to_string()));
    }

    #[test]
    fn test_extract_title_absent() {
        assert_eq!(extract_title("<record><creator>Doe</creator></record>"), None);
        assert_eq!(extract_title("<record><title>  </title></record>"), None);
    }

    #[test]
    fn test_first_element_text_entity() {
        let xml = "<r><identifier>a&amp;b</identifier></r>";
        assert_eq!(
            first_element_text(xml, "identifier"),
            Some("a&b".to_string())
        );
    }
}
