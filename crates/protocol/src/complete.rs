//! `CompleteMultipartUpload` request body.

use std::borrow::Cow;

/// Content type of the finalize request.
pub const XML_CONTENT_TYPE: &str = "application/xml";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// A part that the storage service acknowledged with an ETag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

/// Builds the XML document that finalizes a multipart upload.
///
/// Parts are always emitted in ascending part number, whatever the order of
/// `parts`.
pub fn complete_multipart_body(parts: &[CompletedPart]) -> String {
    let mut sorted: Vec<&CompletedPart> = parts.iter().collect();
    sorted.sort_by_key(|p| p.part_number);

    let mut xml = String::with_capacity(XML_DECLARATION.len() + 64 + 80 * parts.len());
    xml.push_str(XML_DECLARATION);
    xml.push_str("<CompleteMultipartUpload>");
    for part in sorted {
        xml.push_str("<Part><PartNumber>");
        xml.push_str(&part.part_number.to_string());
        xml.push_str("</PartNumber><ETag>");
        xml.push_str(&escape_text(&part.etag));
        xml.push_str("</ETag></Part>");
    }
    xml.push_str("</CompleteMultipartUpload>");
    xml
}

/// Escapes XML text content. Quotes are legal in text nodes and ETags usually
/// carry them, so they are kept as-is.
fn escape_text(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
