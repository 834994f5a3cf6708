//! URL modeling and filename derivation.
//!
//! Recognizes the portal's URL shapes (file URLs, module view pages, course
//! and category pages) and derives safe local filenames from the
//! Content-Disposition header, the URL path, or the resource's name.

mod content_disposition;
mod content_type;
mod path;
mod patterns;
mod sanitize;

pub use content_disposition::{disposition_signals_file, parse_content_disposition_filename};
pub use content_type::{
    extension_for_content_type, is_document_content_type, is_html_content_type,
};
pub use path::filename_from_url_path;
pub use patterns::{
    category_id, category_index_url, course_id, has_file_extension, is_course_view,
    is_file_serving_path, is_file_url, is_folder_view, is_login_url, is_module_view,
    is_resource_view, login_url, path_extension, PageKind, FILE_EXTENSIONS,
};
pub use sanitize::sanitize_filename;

/// Base name used when no source yields anything usable.
const DEFAULT_FILENAME: &str = "document";

/// Inputs to [`derive_filename`], in precedence order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameSources<'a> {
    pub content_disposition: Option<&'a str>,
    /// URL of the response after redirects.
    pub final_url: Option<&'a str>,
    /// Filename suggested while resolving (probe disposition or URL tail).
    pub name_hint: Option<&'a str>,
    /// Display name of the resource on the course page.
    pub resource_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
}

/// Derives a safe filename for a downloaded resource.
///
/// The first usable source wins: disposition filename, final URL tail
/// (server scripts such as `view.php` are skipped), name hint, resource name.
/// The result is sanitized; if it has no extension, one inferred from the
/// content type is appended.
///
/// # Examples
///
/// - disposition `attachment; filename="td2.pdf"` → `"td2.pdf"`
/// - final URL `.../mod/resource/view.php?id=3`, resource name `TD 2`,
///   content type `application/pdf` → `"TD 2.pdf"`
pub fn derive_filename(sources: &FilenameSources<'_>) -> String {
    let candidates = [
        sources
            .content_disposition
            .and_then(parse_content_disposition_filename),
        sources.final_url.and_then(filename_from_url_path),
        sources.name_hint.map(str::to_string),
        sources.resource_name.map(str::to_string),
    ];

    let base = candidates
        .into_iter()
        .flatten()
        .map(|c| sanitize_filename(&c))
        .find(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    if has_extension(&base) {
        return base;
    }
    match sources.content_type.and_then(extension_for_content_type) {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

/// Name ends in a short alphanumeric extension with at least one letter
/// (`.pdf`, `.docx`, `.7z`). Numbered titles like `Chapitre 2.1` have none.
fn has_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && ext.chars().any(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}
