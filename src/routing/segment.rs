//! Path segments.

use percent_encoding::percent_decode_str;

/// Marker that turns a segment into a parameter.
pub const PARAM_MARKER: char = ':';

/// One component of a route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    /// Classify a raw segment key.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(PARAM_MARKER) {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(raw.to_string()),
        }
    }
}

/// Split a path into segments, ignoring leading and trailing separators.
///
/// `"/a/b/"`, `"a/b"` and `"/a/b"` all yield `["a", "b"]`; the root path
/// yields no segments.
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

/// Split a request path and percent-decode each segment.
///
/// Decoding happens after the split, so an encoded `/` stays inside its
/// segment. Invalid UTF-8 is replaced rather than rejected.
pub fn decode_segments(path: &str) -> Vec<String> {
    split_path(path)
        .into_iter()
        .map(|raw| percent_decode_str(raw).decode_utf8_lossy().into_owned())
        .collect()
}
