//! Filesystem-safe filename sanitization.

/// Characters rejected by at least one common filesystem.
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Sanitizes a candidate filename for saving on disk.
///
/// - Replaces NUL, path separators, reserved punctuation and control
///   characters with `_`
/// - Collapses whitespace runs to a single space
/// - Trims leading/trailing spaces, dots and underscores
/// - Limits length to 255 bytes (NAME_MAX)
pub fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    let mut prev_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
            continue;
        }
        prev_space = false;
        if c == '\0' || c.is_control() || RESERVED.contains(&c) {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.' || c == '_');
    if trimmed.len() <= NAME_MAX {
        return trimmed.to_string();
    }
    let mut take = NAME_MAX;
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_separators_and_reserved() {
        assert_eq!(sanitize_filename("a/b\\c.txt"), "a_b_c.txt");
        assert_eq!(sanitize_filename("TD: série <1>?.pdf"), "TD_ série _1_.pdf");
    }

    #[test]
    fn keeps_single_spaces() {
        assert_eq!(sanitize_filename("  Cours \n\t 1.pdf "), "Cours 1.pdf");
    }

    #[test]
    fn trims_dots() {
        assert_eq!(sanitize_filename("..hidden.pdf.."), "hidden.pdf");
        assert_eq!(sanitize_filename(".."), "");
    }

    #[test]
    fn control_chars() {
        assert_eq!(sanitize_filename("file\x00\x01name.txt"), "file_name.txt");
    }

    #[test]
    fn caps_length_on_char_boundary() {
        let long = "é".repeat(200);
        let s = sanitize_filename(&long);
        assert!(s.len() <= 255);
        assert!(s.chars().all(|c| c == 'é'));
    }
}
