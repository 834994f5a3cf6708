//! Filename extraction from URL path.

use super::content_disposition::percent_decode;

/// Tails that name the script serving the page, not the file it returns.
const SERVER_SCRIPT_EXTENSIONS: &[&str] = &["php", "asp", "aspx", "jsp", "cgi"];

/// Extracts the last path segment from a URL for use as a filename hint.
///
/// The segment is percent-decoded. Returns `None` if the URL cannot be parsed,
/// the path is empty or root, or the tail is a server script such as
/// `view.php`.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    let segment = percent_decode(segment);
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    if let Some((_, ext)) = segment.rsplit_once('.') {
        if SERVER_SCRIPT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return None;
        }
    }
    Some(segment)
}
