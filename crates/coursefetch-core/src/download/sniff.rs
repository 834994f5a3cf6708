//! Detects HTML pages served where a file was expected.

const SNIFF_LEN: usize = 1024;

/// Content type says HTML and the body opens like a complete document.
///
/// A bare `text/html` fragment (an error snippet, an empty body) is not a
/// full document and is accepted as the payload.
pub(crate) fn is_full_html_document(content_type: Option<&str>, body: &[u8]) -> bool {
    let html_type = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
    if !html_type {
        return false;
    }
    let head = &body[..body.len().min(SNIFF_LEN)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    head.contains("<html") || head.contains("<!doctype html")
}
