//! Comparison of resolved descriptor targets with the query path.

use pf_config::PathMatch;
use std::fs;
use std::path::{Path, PathBuf};

/// Compares descriptor targets against one query path.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    query: PathBuf,
    canonical: Option<PathBuf>,
}

impl PathMatcher {
    pub fn new(query: &Path, mode: PathMatch) -> Self {
        let canonical = match mode {
            PathMatch::Literal => None,
            PathMatch::Canonical => fs::canonicalize(query).ok(),
        };
        Self {
            query: query.to_path_buf(),
            canonical,
        }
    }

    pub fn query(&self) -> &Path {
        &self.query
    }

    /// Literal mode: byte equality. Canonical mode additionally accepts a
    /// target whose canonical form equals the canonical query.
    pub fn matches(&self, target: &Path) -> bool {
        if target.as_os_str() == self.query.as_os_str() {
            return true;
        }
        let Some(canonical) = &self.canonical else {
            return false;
        };
        // socket:[..], pipe:[..], anon_inode:[..] never name a file.
        if !target.is_absolute() {
            return false;
        }
        match fs::canonicalize(target) {
            Ok(resolved) => resolved == *canonical,
            Err(_) => target == canonical.as_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_is_byte_exact() {
        let matcher = PathMatcher::new(Path::new("/tmp/a.txt"), PathMatch::Literal);
        assert!(matcher.matches(Path::new("/tmp/a.txt")));
        assert!(!matcher.matches(Path::new("/tmp/./a.txt")));
        assert!(!matcher.matches(Path::new("/tmp/a.txt/")));
        assert!(!matcher.matches(Path::new("/tmp/A.txt")));
        assert!(!matcher.matches(Path::new("socket:[1]")));
    }

    #[cfg(unix)]
    #[test]
    fn test_canonical_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.txt");
        fs::write(&real, "x").unwrap();
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let literal = PathMatcher::new(&link, PathMatch::Literal);
        assert!(!literal.matches(&fs::canonicalize(&real).unwrap()));

        let canonical = PathMatcher::new(&link, PathMatch::Canonical);
        assert!(canonical.matches(&fs::canonicalize(&real).unwrap()));
        assert!(canonical.matches(&link));
        assert!(!canonical.matches(Path::new("pipe:[42]")));
    }

    #[test]
    fn test_canonical_with_missing_query_falls_back_to_literal() {
        let matcher = PathMatcher::new(Path::new("/nonexistent/pfinder/q"), PathMatch::Canonical);
        assert!(matcher.matches(Path::new("/nonexistent/pfinder/q")));
        assert!(!matcher.matches(Path::new("/nonexistent/pfinder/r")));
    }
}
