//! Content-Type classification.

/// Substrings marking a document content type, checked case-insensitively.
const DOCUMENT_MARKERS: &[&str] = &[
    "application/pdf",
    "msword",
    "officedocument",
    "ms-excel",
    "ms-powerpoint",
    "opendocument",
    "application/rtf",
    "application/zip",
    "application/x-rar",
    "application/x-7z",
    "application/octet-stream",
    "text/plain",
    "text/csv",
];

/// Extension inference, first matching substring wins.
const EXTENSION_BY_SUBSTRING: &[(&str, &str)] = &[
    ("pdf", "pdf"),
    ("word", "docx"),
    ("excel", "xlsx"),
    ("spreadsheet", "xlsx"),
    ("powerpoint", "pptx"),
    ("presentation", "pptx"),
    ("text", "txt"),
];

pub fn is_document_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    DOCUMENT_MARKERS.iter().any(|m| ct.contains(m))
}

pub fn is_html_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

/// Extension (without dot) to append to a filename that has none.
///
/// `text/html` maps to nothing; a page is never saved as `.txt`.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    if is_html_content_type(content_type) {
        return None;
    }
    let ct = content_type.to_ascii_lowercase();
    EXTENSION_BY_SUBSTRING
        .iter()
        .find(|(needle, _)| ct.contains(needle))
        .map(|(_, ext)| *ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents() {
        assert!(is_document_content_type("application/pdf"));
        assert!(is_document_content_type(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        ));
        assert!(is_document_content_type("Application/PDF; charset=binary"));
        assert!(!is_document_content_type("text/html; charset=utf-8"));
        assert!(!is_document_content_type("image/png"));
    }

    #[test]
    fn extension_order() {
        assert_eq!(extension_for_content_type("application/pdf"), Some("pdf"));
        assert_eq!(extension_for_content_type("application/msword"), Some("docx"));
        assert_eq!(
            extension_for_content_type(
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            ),
            Some("xlsx")
        );
        assert_eq!(
            extension_for_content_type(
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            ),
            Some("pptx")
        );
        assert_eq!(extension_for_content_type("text/plain"), Some("txt"));
        assert_eq!(extension_for_content_type("text/html"), None);
        assert_eq!(extension_for_content_type("application/octet-stream"), None);
    }
}
