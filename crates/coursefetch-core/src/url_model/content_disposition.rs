//! Content-Disposition header parsing (filename and filename*).

/// Extracts the filename from a raw Content-Disposition header value.
///
/// Supports:
/// - `filename="value"` (quoted; strips quotes and unescapes)
/// - `filename=value` (token)
/// - `filename*=UTF-8''percent-encoded` (RFC 5987; decoded, any charset label)
///
/// If both `filename` and `filename*` exist, `filename*` takes precedence.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let mut plain: Option<String> = None;

    for param in header_value.trim().split(';') {
        let Some((name, v)) = param.trim().split_once('=') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let v = v.trim();

        match name.as_str() {
            "filename*" => {
                // charset'lang'value
                let encoded = v.splitn(3, '\'').nth(2).unwrap_or(v);
                let decoded = percent_decode(encoded.trim_matches('"'));
                let decoded = decoded.trim();
                if !decoded.is_empty() {
                    return Some(decoded.to_string());
                }
            }
            "filename" => {
                let unquoted = if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
                    decode_quoted_filename(&v[1..v.len() - 1])
                } else {
                    v.trim_matches('"').to_string()
                };
                if !unquoted.trim().is_empty() {
                    plain = Some(unquoted.trim().to_string());
                }
            }
            _ => {}
        }
    }

    plain
}

/// Header marks the response as a file: an `attachment` disposition or any
/// filename parameter.
pub fn disposition_signals_file(header_value: &str) -> bool {
    let lower = header_value.to_ascii_lowercase();
    lower.trim_start().starts_with("attachment") || lower.contains("filename")
}

/// Decode backslash-escaped quotes in a quoted filename value.
fn decode_quoted_filename(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '"' || next == '\\' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Percent-decode, replacing invalid UTF-8 lossily. Malformed escapes are
/// kept literally.
pub(super) fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(h), Some(l)) = (
                bytes.get(i + 1).copied().and_then(hex_digit),
                bytes.get(i + 2).copied().and_then(hex_digit),
            ) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
