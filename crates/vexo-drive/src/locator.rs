//! Sharing-URL resolution.
//!
//! Turns the link formats users paste (file links, docs links, legacy
//! `open?id=` redirects) into the opaque file id the API wants. An
//! unrecognized shape is a normal `None`, not an error.

use reqwest::Url;

/// Opaque key naming one object in the remote storage provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        FileId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract a file id from a sharing URL.
///
/// Recognized shapes, in priority order:
/// - path-embedded: `https://drive.google.com/file/d/{ID}/view`,
///   `https://docs.google.com/document/d/{ID}/edit`, or any other `/d/{ID}`
///   segment pair, with or without trailing segments;
/// - query form: `https://drive.google.com/open?id={ID}`.
///
/// Everything else (other hosts, malformed URLs, missing ids) resolves to
/// `None`.
pub fn resolve(url: &str) -> Option<FileId> {
    let parsed = Url::parse(url).ok()?;

    let host = parsed.host_str()?;
    if host != "drive.google.com" && host != "docs.google.com" {
        return None;
    }

    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();

    // Path-embedded id: the segment after a literal "d"
    if let Some(pos) = segments.iter().position(|s| *s == "d") {
        if let Some(id) = segments.get(pos + 1) {
            if !id.is_empty() {
                return Some(FileId::new(*id));
            }
        }
    }

    // Legacy redirect: /open?id={ID}
    if segments.first() == Some(&"open") {
        if let Some((_, id)) = parsed.query_pairs().find(|(key, _)| key == "id") {
            if !id.is_empty() {
                return Some(FileId::new(id.into_owned()));
            }
        }
    }

    None
}
