//! Share-URL resolution.
//!
//! Catalog entries carry publicly shared hosting links, not direct byte
//! streams. This module rewrites a share link into the provider's
//! direct-content endpoint so the fetcher receives raw PDF bytes instead
//! of an interstitial HTML page.
//!
//! All functions here are pure and total: when no provider file id can be
//! extracted, the input URL is returned unchanged and the downstream fetch
//! is left to succeed or fail on its own. Resolution is idempotent — the
//! direct form carries no `/d/<id>` segment, so resolving it again is the
//! identity.

use crate::constants::{
    DRIVE_DIRECT_URL_PREFIX, DRIVE_PREVIEW_URL_PREFIX, DRIVE_PREVIEW_URL_SUFFIX,
};
use regex::Regex;
use std::sync::OnceLock;

static FILE_ID_PATTERN: OnceLock<Regex> = OnceLock::new();

fn file_id_pattern() -> &'static Regex {
    FILE_ID_PATTERN.get_or_init(|| {
        Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("file id pattern is valid")
    })
}

/// Extract the opaque provider file identifier from a share URL.
///
/// Matches the `/d/<id>` path segment used by share-page links
/// (e.g. `https://drive.google.com/file/d/ABC123/view?usp=sharing`).
pub fn drive_file_id(url: &str) -> Option<&str> {
    file_id_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Rewrite a share URL into a direct-download URL.
///
/// Returns the input unchanged when it does not look like a share-page
/// link. Never fails.
pub fn resolve_direct_url(share_url: &str) -> String {
    match drive_file_id(share_url) {
        Some(id) => format!("{}{}", DRIVE_DIRECT_URL_PREFIX, id),
        None => share_url.to_string(),
    }
}

/// Rewrite a share URL into the provider's embeddable preview URL.
///
/// Used by the (external) in-browser viewer; the pipeline itself never
/// fetches this form. Returns the input unchanged when no file id is
/// present.
pub fn preview_url(share_url: &str) -> String {
    match drive_file_id(share_url) {
        Some(id) => format!(
            "{}{}{}",
            DRIVE_PREVIEW_URL_PREFIX, id, DRIVE_PREVIEW_URL_SUFFIX
        ),
        None => share_url.to_string(),
    }
}
