//! Minimal HTTP/1.1 Moodle-like portal for integration tests.
//!
//! Serves a login form guarded by a `logintoken`, sets a session cookie on
//! a valid POST and redirects everything else to the login page until that
//! cookie comes back. Content: course 7 with two files, category 3 listing
//! course 7 and an empty category 9.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "tok123";
const ANON_COOKIE: &str = "MoodleSession=anon";
const AUTH_COOKIE: &str = "MoodleSession=auth123";

pub const TD2_BODY: &[u8] = b"%PDF-1.4 td2";
pub const COURS1_BODY: &[u8] = b"%PDF-1.4 cours1";

/// Starts the portal in a background thread. Returns the base URL
/// (e.g. "http://127.0.0.1:12345/"). The server runs until the process exits.
pub fn start() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}/", port);
    let shared = base.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let base = shared.clone();
            thread::spawn(move || handle(stream, &base));
        }
    });
    base
}

struct Request {
    method: String,
    target: String,
    headers: HashMap<String, String>,
    body: String,
}

impl Request {
    fn cookie_has(&self, pair: &str) -> bool {
        self.headers
            .get("cookie")
            .map(|c| c.split(';').any(|p| p.trim() == pair))
            .unwrap_or(false)
    }

    fn form(&self) -> HashMap<String, String> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .into_owned()
            .collect()
    }
}

struct Response {
    status: &'static str,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
}

impl Response {
    fn html(body: String) -> Self {
        Self {
            status: "200 OK",
            headers: vec![("Content-Type", "text/html; charset=utf-8".to_string())],
            body: body.into_bytes(),
        }
    }

    fn pdf(body: &[u8], disposition: Option<&str>) -> Self {
        let mut headers = vec![("Content-Type", "application/pdf".to_string())];
        if let Some(d) = disposition {
            headers.push(("Content-Disposition", d.to_string()));
        }
        Self {
            status: "200 OK",
            headers,
            body: body.to_vec(),
        }
    }

    fn redirect(location: String) -> Self {
        Self {
            status: "303 See Other",
            headers: vec![("Location", location)],
            body: Vec::new(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: "404 Not Found",
            headers: vec![("Content-Type", "text/plain".to_string())],
            body: b"not found".to_vec(),
        }
    }

    fn cookie(mut self, pair: &str) -> Self {
        self.headers
            .push(("Set-Cookie", format!("{pair}; path=/; HttpOnly")));
        self
    }
}

fn handle(stream: TcpStream, base: &str) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    });
    let Some(request) = read_request(&mut reader) else {
        return;
    };
    let response = route(&request, base);
    write_response(stream, &request.method, response);
}

fn read_request(reader: &mut BufReader<TcpStream>) -> Option<Request> {
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let len = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).ok()?;
    Some(Request {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn write_response(mut stream: TcpStream, method: &str, response: Response) {
    let mut head = format!("HTTP/1.1 {}\r\n", response.status);
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        response.body.len()
    ));
    let _ = stream.write_all(head.as_bytes());
    if !method.eq_ignore_ascii_case("HEAD") {
        let _ = stream.write_all(&response.body);
    }
}

fn login_page(base: &str, error: bool) -> String {
    let error = if error {
        r#"<div class="loginerrors"><span class="error">Invalid login, please try again</span></div>"#
    } else {
        ""
    };
    format!(
        r#"<html><head><title>Log in</title></head><body>{error}
        <form id="login" action="{base}login/index.php" method="post">
          <input type="hidden" name="logintoken" value="{TOKEN}">
          <input type="text" name="username"><input type="password" name="password">
        </form></body></html>"#
    )
}

const COURSE_7: &str = r#"<html><head><title>Course: Algèbre</title></head><body>
    <h1>Algèbre linéaire</h1>
    <ul class="topics">
      <li class="activity resource"><a class="aalink" href="/mod/resource/view.php?id=11">
        <span class="instancename">TD 2<span class="accesshide"> File</span></span></a></li>
      <li class="activity url"><a href="/pluginfile.php/55/mod_resource/content/1/cours1.pdf">Cours 1</a></li>
    </ul></body></html>"#;

const CATEGORY_3: &str = r#"<html><body><h1>Mathématiques</h1>
    <div class="courses"><div class="coursebox"><h3 class="coursename">
      <a href="/course/view.php?id=7">Algèbre linéaire</a></h3></div></div></body></html>"#;

const CATEGORY_9: &str = r#"<html><body><h1>Archives</h1><p>No courses in this category</p></body></html>"#;

const CATEGORY_INDEX: &str = r#"<html><body><form><select name="jump">
    <option value="/course/index.php?categoryid=3">Mathématiques</option>
    <option value="/course/index.php?categoryid=9">Archives</option>
    </select></form></body></html>"#;

fn route(req: &Request, base: &str) -> Response {
    let (path, query) = req.target.split_once('?').unwrap_or((&req.target, ""));

    if path == "/login/index.php" {
        if req.method.eq_ignore_ascii_case("POST") {
            let form = req.form();
            let field = |k: &str| form.get(k).map(String::as_str).unwrap_or("");
            let valid = field("username") == USERNAME
                && field("password") == PASSWORD
                && field("logintoken") == TOKEN
                && req.cookie_has(ANON_COOKIE);
            return if valid {
                Response::redirect(format!("{base}my/")).cookie(AUTH_COOKIE)
            } else {
                Response::html(login_page(base, true))
            };
        }
        return Response::html(login_page(base, false)).cookie(ANON_COOKIE);
    }

    if !req.cookie_has(AUTH_COOKIE) {
        return Response::redirect(format!("{base}login/index.php"));
    }

    match (path, query) {
        ("/my/", _) => Response::html("<html><body><h1>Dashboard</h1></body></html>".to_string()),
        ("/course/view.php", "id=7") => Response::html(COURSE_7.to_string()),
        ("/mod/resource/view.php", "id=11") => {
            Response::pdf(TD2_BODY, Some("attachment; filename=\"td2.pdf\""))
        }
        ("/pluginfile.php/55/mod_resource/content/1/cours1.pdf", _) => {
            Response::pdf(COURS1_BODY, None)
        }
        ("/course/index.php", "categoryid=3") => Response::html(CATEGORY_3.to_string()),
        ("/course/index.php", "categoryid=9") => Response::html(CATEGORY_9.to_string()),
        ("/course/index.php", "") => Response::html(CATEGORY_INDEX.to_string()),
        _ => Response::not_found(),
    }
}
