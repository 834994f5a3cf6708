//! Session cookie jar.

/// Cookies carried by a session, stored as Netscape cookie-file lines
/// (the format libcurl exports and accepts back through `CURLOPT_COOKIELIST`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    lines: Vec<String>,
}

impl CookieJar {
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            lines: lines
                .into_iter()
                .map(|l| l.trim_end().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Cookie names, for logging. Values are never exposed.
    pub fn names(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| line.split('\t').nth(5))
            .collect()
    }
}
