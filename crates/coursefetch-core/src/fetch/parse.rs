//! Parse raw HTTP response header lines collected by curl.

/// Headers of the last response in `lines`.
///
/// With redirects followed, curl hands every hop's header block to the header
/// callback; each block starts with a status line (`HTTP/1.1 302 Found`), so
/// the list is reset whenever one is seen.
pub(crate) fn final_response_headers(lines: &[String]) -> Vec<(String, String)> {
    let mut headers = Vec::new();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            headers.clear();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    headers
}
