//! In-memory [`PageFetcher`] for unit tests: canned responses keyed by
//! method and URL, with a record of every call made.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{CookieJar, FetchError, FetchRequest, FetchResponse, Method, PageFetcher};

pub(crate) const SESSION_COOKIE: &str = "portal.test\tFALSE\t/\tFALSE\t0\tMoodleSession\tauth";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Verb {
    Get,
    Head,
    Post,
}

impl Verb {
    fn of(method: &Method) -> Self {
        match method {
            Method::Get => Verb::Get,
            Method::Head => Verb::Head,
            Method::PostForm(_) => Verb::Post,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub verb: Verb,
    pub url: String,
    pub form: Vec<(String, String)>,
    pub cookies: Option<CookieJar>,
}

enum Reply {
    Ok(FetchResponse),
    Delayed(FetchResponse, Duration),
    Timeout,
}

#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    routes: HashMap<(Verb, String), Reply>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(mut self, url: &str, response: FetchResponse) -> Self {
        self.routes
            .insert((Verb::Get, url.to_string()), Reply::Ok(response));
        self
    }

    pub fn on_head(mut self, url: &str, response: FetchResponse) -> Self {
        self.routes
            .insert((Verb::Head, url.to_string()), Reply::Ok(response));
        self
    }

    pub fn on_post(mut self, url: &str, response: FetchResponse) -> Self {
        self.routes
            .insert((Verb::Post, url.to_string()), Reply::Ok(response));
        self
    }

    /// GET on `url` answers after sleeping for `delay`.
    pub fn on_get_after(mut self, url: &str, delay: Duration, response: FetchResponse) -> Self {
        self.routes.insert(
            (Verb::Get, url.to_string()),
            Reply::Delayed(response, delay),
        );
        self
    }

    /// Only HEAD on `url` times out.
    pub fn fail_head(mut self, url: &str) -> Self {
        self.routes
            .insert((Verb::Head, url.to_string()), Reply::Timeout);
        self
    }

    /// Every method on `url` times out.
    pub fn fail(mut self, url: &str) -> Self {
        for verb in [Verb::Get, Verb::Head, Verb::Post] {
            self.routes.insert((verb, url.to_string()), Reply::Timeout);
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn count(&self, verb: Verb, url: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.verb == verb && c.url == url)
            .count()
    }
}

impl PageFetcher for ScriptedFetcher {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<FetchResponse, FetchError> {
        let verb = Verb::of(&request.method);
        let form = match &request.method {
            Method::PostForm(fields) => fields.clone(),
            _ => Vec::new(),
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                verb,
                url: request.url.to_string(),
                form,
                cookies: request.cookies.cloned(),
            });
        }

        let reply = match self.routes.get(&(verb, request.url.to_string())) {
            Some(Reply::Ok(resp)) => Some(Ok(resp.clone())),
            Some(Reply::Delayed(resp, delay)) => {
                std::thread::sleep(*delay);
                Some(Ok(resp.clone()))
            }
            Some(Reply::Timeout) => Some(Err(FetchError::Timeout {
                url: request.url.to_string(),
            })),
            None => None,
        };
        match reply {
            Some(Ok(mut resp)) => {
                if resp.final_url.is_empty() {
                    resp.final_url = request.url.to_string();
                }
                if resp.cookies.is_empty() {
                    resp.cookies = request.cookies.cloned().unwrap_or_default();
                }
                if verb == Verb::Head {
                    resp.body.clear();
                }
                Ok(resp)
            }
            Some(Err(e)) => Err(e),
            None => Ok(FetchResponse {
                status: 404,
                final_url: request.url.to_string(),
                cookies: request.cookies.cloned().unwrap_or_default(),
                ..Default::default()
            }),
        }
    }
}

pub(crate) fn session_jar() -> CookieJar {
    CookieJar::from_lines(vec![SESSION_COOKIE.to_string()])
}

/// 200 `text/html` page.
pub(crate) fn html(body: &str) -> FetchResponse {
    FetchResponse {
        status: 200,
        headers: vec![(
            "Content-Type".to_string(),
            "text/html; charset=utf-8".to_string(),
        )],
        body: body.as_bytes().to_vec(),
        ..Default::default()
    }
}

/// 200 response with the given content type and body.
pub(crate) fn file(content_type: &str, body: &[u8]) -> FetchResponse {
    FetchResponse {
        status: 200,
        headers: vec![("Content-Type".to_string(), content_type.to_string())],
        body: body.to_vec(),
        ..Default::default()
    }
}

pub(crate) fn status(code: u32) -> FetchResponse {
    FetchResponse {
        status: code,
        ..Default::default()
    }
}

pub(crate) fn with_header(mut resp: FetchResponse, name: &str, value: &str) -> FetchResponse {
    resp.headers.push((name.to_string(), value.to_string()));
    resp
}

pub(crate) fn landed_at(mut resp: FetchResponse, final_url: &str) -> FetchResponse {
    resp.final_url = final_url.to_string();
    resp
}

pub(crate) fn with_cookies(mut resp: FetchResponse, jar: CookieJar) -> FetchResponse {
    resp.cookies = jar;
    resp
}
