//! Header-only probe classification.

use crate::fetch::FetchResponse;
use crate::url_model::{
    disposition_signals_file, filename_from_url_path, is_document_content_type, is_file_url,
    parse_content_disposition_filename,
};

/// A probe response that points at a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProbeHit {
    pub file_url: String,
    pub name_hint: Option<String>,
}

/// Accepts the probe when it succeeded and its content type is a document
/// type, its disposition signals a file, or it landed on a file URL.
pub(crate) fn classify_probe(resp: &FetchResponse) -> Option<ProbeHit> {
    if !resp.is_success() {
        return None;
    }
    let document = resp.content_type().is_some_and(is_document_content_type);
    let attachment = resp.content_disposition().is_some_and(disposition_signals_file);
    if !(document || attachment || is_file_url(&resp.final_url)) {
        return None;
    }
    Some(ProbeHit {
        file_url: resp.final_url.clone(),
        name_hint: name_hint(resp),
    })
}

/// Disposition filename, else URL tail.
pub(crate) fn name_hint(resp: &FetchResponse) -> Option<String> {
    resp.content_disposition()
        .and_then(parse_content_disposition_filename)
        .or_else(|| filename_from_url_path(&resp.final_url))
}
