//! Path grammar shared by resolution and declaration (spec §4.1):
//! `/seg(/seg)*`, each segment matching `[A-Za-z0-9_.-]+`.

/// A single path segment is non-empty and restricted to
/// `[A-Za-z0-9_.-]`; `..` is rejected even though every character in it
/// is individually legal, since it would otherwise let a relative path
/// escape the client's namespace.
pub fn is_valid_segment(segment: &str) -> bool {
    if segment.is_empty() || segment == ".." {
        return false;
    }
    segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Split a relative path (no leading `/`) into segments, rejecting empty
/// segments and `..`.
pub fn split_relative(path: &str) -> Option<Vec<&str>> {
    if path.is_empty() || path.starts_with('/') {
        return None;
    }
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| !is_valid_segment(s)) {
        return None;
    }
    Some(segments)
}

/// Split an absolute path (leading `/`) into segments. The first segment
/// selects a top-level namespace by convention (`app`, `obs`).
pub fn split_absolute(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix('/')?;
    split_relative(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_dotdot() {
        assert!(!is_valid_segment(""));
        assert!(!is_valid_segment(".."));
    }

    #[test]
    fn accepts_grammar_charset() {
        assert!(is_valid_segment("sensor-1.v2_beta"));
    }

    #[test]
    fn rejects_slash_in_segment() {
        assert!(!is_valid_segment("a/b"));
    }

    #[test]
    fn split_relative_rejects_leading_slash() {
        assert_eq!(split_relative("/a/b"), None);
    }

    #[test]
    fn split_relative_rejects_empty_segment() {
        assert_eq!(split_relative("a//b"), None);
    }

    #[test]
    fn split_absolute_requires_leading_slash() {
        assert_eq!(split_absolute("app/x"), None);
        assert_eq!(split_absolute("/app/x"), Some(vec!["app", "x"]));
    }
}
