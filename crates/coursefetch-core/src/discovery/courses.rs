//! Course and category extraction from category index pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

use crate::page::{absolutize, collapse_whitespace, first_heading, text_of};
use crate::url_model::{category_id, course_id};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseRef {
    pub id: u64,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRef {
    pub id: u64,
    pub name: String,
    pub url: String,
}

/// Courses listed on one category page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryListing {
    pub category_id: Option<u64>,
    pub category_name: Option<String>,
    pub courses: Vec<CourseRef>,
}

static COURSE_ANCHOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href*="/course/view.php?id="]"#).expect("valid selector")
});
static JUMP_OPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"select[name="jump"] option[value]"#).expect("valid selector")
});
static CATEGORY_ANCHOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href*="categoryid="]"#).expect("valid selector")
});

pub(crate) fn extract_courses(doc: &Html, page_url: &Url) -> CategoryListing {
    let mut seen = HashSet::new();
    let mut courses = Vec::new();
    for a in doc.select(&COURSE_ANCHOR) {
        let Some(url) = a.value().attr("href").and_then(|h| absolutize(page_url, h)) else {
            continue;
        };
        let Some(id) = course_id(&url) else {
            continue;
        };
        let name = text_of(a);
        // Course images link to the course too; keep the first named anchor.
        if name.is_empty() || !seen.insert(id) {
            continue;
        }
        courses.push(CourseRef { id, name, url });
    }

    CategoryListing {
        category_id: category_id(page_url.as_str()),
        category_name: first_heading(doc),
        courses,
    }
}

/// Categories from the "jump to" select on the category index, falling back
/// to category links when the select is absent.
pub(crate) fn extract_categories(doc: &Html, page_url: &Url) -> Vec<CategoryRef> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    let from_select = doc.select(&JUMP_OPTION).filter_map(|opt| {
        let url = absolutize(page_url, opt.value().attr("value")?)?;
        let name = collapse_whitespace(&opt.text().collect::<String>());
        Some((url, name))
    });
    for (url, name) in from_select {
        push_category(&mut out, &mut seen, url, name);
    }
    if !out.is_empty() {
        return out;
    }

    for a in doc.select(&CATEGORY_ANCHOR) {
        if let Some(url) = a.value().attr("href").and_then(|h| absolutize(page_url, h)) {
            push_category(&mut out, &mut seen, url, text_of(a));
        }
    }
    out
}

fn push_category(out: &mut Vec<CategoryRef>, seen: &mut HashSet<u64>, url: String, name: String) {
    let Some(id) = category_id(&url) else {
        return;
    };
    if name.is_empty() || !seen.insert(id) {
        return;
    }
    out.push(CategoryRef { id, name, url });
}
