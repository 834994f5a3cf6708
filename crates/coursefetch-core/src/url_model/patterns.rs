//! Portal URL shapes: file URLs, module view pages, course and category pages.

use url::Url;

/// Extensions treated as downloadable documents.
pub const FILE_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "rtf", "txt", "csv",
    "zip", "rar", "7z",
];

const FILE_SERVING_SCRIPT: &str = "/pluginfile.php";
const RESOURCE_VIEW: &str = "/mod/resource/view.php";
const FOLDER_VIEW: &str = "/mod/folder/view.php";
const COURSE_VIEW: &str = "/course/view.php";
const CATEGORY_INDEX: &str = "/course/index.php";
const LOGIN_PAGE: &str = "/login/index.php";

/// Kind of page handed to discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Course,
    Category,
}

impl PageKind {
    /// `course/index.php?categoryid=N` is a category; everything else is
    /// scanned as a course page.
    pub fn of(url: &str) -> PageKind {
        if category_id(url).is_some() {
            PageKind::Category
        } else {
            PageKind::Course
        }
    }
}

fn path_of(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| u.path().to_string())
}

fn query_param(url: &str, key: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let value = parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned());
    value
}

/// Lowercased extension of the last path segment, if any.
pub fn path_extension(url: &str) -> Option<String> {
    let path = path_of(url)?;
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn has_file_extension(url: &str) -> bool {
    path_extension(url).is_some_and(|ext| FILE_EXTENSIONS.contains(&ext.as_str()))
}

/// Path goes through the portal's file-serving script.
pub fn is_file_serving_path(url: &str) -> bool {
    path_of(url).is_some_and(|p| p.contains(FILE_SERVING_SCRIPT))
}

/// URL that can be fetched as a file without further resolution.
pub fn is_file_url(url: &str) -> bool {
    has_file_extension(url) || is_file_serving_path(url)
}

pub fn is_resource_view(url: &str) -> bool {
    path_of(url).is_some_and(|p| p.ends_with(RESOURCE_VIEW))
}

pub fn is_folder_view(url: &str) -> bool {
    path_of(url).is_some_and(|p| p.ends_with(FOLDER_VIEW))
}

/// Resource or folder view page.
pub fn is_module_view(url: &str) -> bool {
    is_resource_view(url) || is_folder_view(url)
}

pub fn is_course_view(url: &str) -> bool {
    path_of(url).is_some_and(|p| p.ends_with(COURSE_VIEW))
}

pub fn is_login_url(url: &str) -> bool {
    path_of(url).is_some_and(|p| p.ends_with(LOGIN_PAGE))
}

/// `id` query parameter of a course view URL.
pub fn course_id(url: &str) -> Option<u64> {
    if !is_course_view(url) {
        return None;
    }
    query_param(url, "id")?.parse().ok()
}

/// `categoryid` query parameter of a category index URL.
pub fn category_id(url: &str) -> Option<u64> {
    if !path_of(url).is_some_and(|p| p.ends_with(CATEGORY_INDEX)) {
        return None;
    }
    query_param(url, "categoryid")?.parse().ok()
}

/// Login page of the portal rooted at `base`.
pub fn login_url(base: &Url) -> Option<Url> {
    join(base, "login/index.php")
}

/// Category index of the portal rooted at `base`.
pub fn category_index_url(base: &Url) -> Option<Url> {
    join(base, "course/index.php")
}

fn join(base: &Url, rel: &str) -> Option<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(rel).ok()
}
