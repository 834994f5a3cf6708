//! libcurl-backed [`PageFetcher`].
//!
//! One `Easy` handle per request. Cookies are seeded from the request's jar
//! into curl's in-memory cookie engine and exported back afterwards, so
//! cookies set on intermediate redirect hops (e.g. a session id regenerated
//! by the login POST) are applied to the following hops and returned to the
//! caller.

use std::time::Duration;

use curl::easy::Easy;

use super::parse::final_response_headers;
use super::{CookieJar, FetchError, FetchRequest, FetchResponse, Method, PageFetcher};

const MAX_REDIRECTS: u32 = 10;

/// Default `User-Agent`; some portals serve reduced markup to unknown agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct CurlFetcher {
    connect_timeout: Duration,
    user_agent: String,
}

impl Default for CurlFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(15), DEFAULT_USER_AGENT)
    }
}

impl CurlFetcher {
    pub fn new(connect_timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            connect_timeout,
            user_agent: user_agent.into(),
        }
    }

    fn configure(&self, easy: &mut Easy, request: &FetchRequest<'_>) -> Result<(), curl::Error> {
        match &request.method {
            Method::Get => easy.get(true)?,
            Method::Head => easy.nobody(true)?,
            Method::PostForm(fields) => {
                let body = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .finish();
                easy.post(true)?;
                easy.post_fields_copy(body.as_bytes())?;
            }
        }
        easy.follow_location(request.follow_redirects)?;
        easy.max_redirections(MAX_REDIRECTS)?;
        easy.connect_timeout(self.connect_timeout.min(request.timeout))?;
        easy.timeout(request.timeout)?;
        easy.useragent(&self.user_agent)?;
        easy.accept_encoding("")?;

        // Empty path enables the cookie engine without reading a file.
        easy.cookie_file("")?;
        if let Some(jar) = request.cookies {
            for line in jar.lines() {
                easy.cookie_list(line)?;
            }
        }
        Ok(())
    }
}

impl PageFetcher for CurlFetcher {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<FetchResponse, FetchError> {
        let url = request.url;
        let classify = |e: curl::Error| classify_error(url, e);

        let mut easy = Easy::new();
        easy.url(url).map_err(classify)?;
        self.configure(&mut easy, request).map_err(classify)?;

        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    header_lines.push(header_line(data));
                    true
                })
                .map_err(classify)?;
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(classify)?;
            transfer.perform().map_err(classify)?;
        }

        let status = easy.response_code().map_err(classify)?;
        let final_url = easy
            .effective_url()
            .map_err(classify)?
            .unwrap_or(url)
            .to_string();
        let cookies = CookieJar::from_lines(
            easy.cookies()
                .map_err(classify)?
                .iter()
                .map(|line| String::from_utf8_lossy(line).into_owned()),
        );

        tracing::trace!(
            method = request.method.as_str(),
            url,
            status,
            final_url = %final_url,
            bytes = body.len(),
            "fetch complete"
        );

        Ok(FetchResponse {
            status,
            headers: final_response_headers(&header_lines),
            final_url,
            body,
            cookies,
        })
    }
}

/// Raw header line as text. Non-UTF-8 bytes (e.g. a Latin-1 filename)
/// degrade to U+FFFD instead of dropping the header.
fn header_line(data: &[u8]) -> String {
    String::from_utf8_lossy(data).trim_end().to_string()
}

fn classify_error(url: &str, e: curl::Error) -> FetchError {
    if e.is_operation_timedout() {
        return FetchError::Timeout {
            url: url.to_string(),
        };
    }
    if e.is_url_malformed() || e.is_unsupported_protocol() {
        return FetchError::InvalidUrl {
            url: url.to_string(),
        };
    }
    FetchError::Transport {
        url: url.to_string(),
        source: e,
    }
}
