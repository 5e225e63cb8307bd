//! Candidate normalization for consensus grouping.

use crate::generation::comment_marker;

/// Maps a candidate to its grouping key. An empty key means the candidate
/// carries no code and is left out of grouping.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, candidate: &str) -> String;
}

/// Drops every line whose trimmed text starts with a comment marker, then
/// trims trailing whitespace per line and surrounding blank space overall.
///
/// Indentation is kept since it is significant in some languages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLineNormalizer {
    marker: String,
}

impl CommentLineNormalizer {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Normalizer using the comment marker of `file_type`.
    pub fn for_file_type(file_type: &str) -> Self {
        Self::new(comment_marker(file_type))
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for CommentLineNormalizer {
    fn default() -> Self {
        Self::new("//")
    }
}

impl Normalizer for CommentLineNormalizer {
    fn normalize(&self, candidate: &str) -> String {
        candidate
            .lines()
            .filter(|line| self.marker.is_empty() || !line.trim_start().starts_with(&self.marker))
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}
