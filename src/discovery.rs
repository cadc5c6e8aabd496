//! Walking the book directory for source pages.

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use ignore::WalkBuilder;
use std::cmp::Ordering;
use std::path::{Component, Path};

/// `*`, `?` and `[...]` stay within one path segment; `**` crosses them.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled exclude patterns, matched against `/`-separated paths relative
/// to the book root.
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    patterns: Vec<Pattern>,
}

impl ExcludeMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Pattern::new(p).with_context(|| format!("Invalid exclude pattern '{}'", p))
            })
            .collect::<Result<_>>()?;
        Ok(Self { patterns })
    }

    /// Whether the `/`-separated relative path is excluded.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(rel_path, MATCH_OPTIONS))
    }
}

/// `/`-separated form of `path` relative to `root`, if it is valid UTF-8.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// Files before directories, each group by name.
fn files_first(a: &Path, b: &Path) -> Ordering {
    a.is_dir()
        .cmp(&b.is_dir())
        .then_with(|| a.file_name().cmp(&b.file_name()))
}

/// Lists every file below `root` that no pattern excludes.
///
/// Paths are relative to `root` and `/`-separated. Each directory's files come
/// in sorted order before its subdirectories, which are also visited sorted.
/// Excluded directories are not descended into. Symlinks are followed and no
/// ignore files apply.
pub fn find_matching_files(root: &Path, matcher: &ExcludeMatcher) -> Result<Vec<String>> {
    let filter_root = root.to_path_buf();
    let filter = matcher.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(true)
        .sort_by_file_path(files_first)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            match relative_path(&filter_root, entry.path()) {
                Some(rel) if filter.is_excluded(&rel) => {
                    log::debug!("Excluded {}", rel);
                    false
                }
                Some(_) => true,
                None => {
                    log::warn!("Skipping non UTF-8 path {}", entry.path().display());
                    false
                }
            }
        })
        .build();

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if entry.depth() == 0 || entry.path().is_dir() {
            continue;
        }
        if let Some(rel) = relative_path(root, entry.path()) {
            found.push(rel);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn matcher(patterns: &[&str]) -> ExcludeMatcher {
        ExcludeMatcher::new(patterns).unwrap()
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let m = matcher(&["*.txt"]);
        assert!(m.is_excluded("notes.txt"));
        assert!(!m.is_excluded("sub/notes.txt"));
    }

    #[test]
    fn test_double_star_crosses_directories() {
        let m = matcher(&["drafts/**"]);
        assert!(m.is_excluded("drafts/a.md"));
        assert!(m.is_excluded("drafts/deep/b.md"));
        assert!(!m.is_excluded("drafts"));
        assert!(!m.is_excluded("final/a.md"));
    }

    #[test]
    fn test_patterns_are_anchored() {
        let m = matcher(&["_build"]);
        assert!(m.is_excluded("_build"));
        assert!(!m.is_excluded("_build.md"));
        assert!(!m.is_excluded("sub/_build"));
    }

    #[test]
    fn test_character_classes() {
        let m = matcher(&["ch[0-9].md", "x[!a]y", "q?.md"]);
        assert!(m.is_excluded("ch3.md"));
        assert!(!m.is_excluded("chA.md"));
        assert!(m.is_excluded("xby"));
        assert!(!m.is_excluded("xay"));
        assert!(!m.is_excluded("x/y"));
        assert!(m.is_excluded("q1.md"));
        assert!(!m.is_excluded("q/.md"));
    }

    #[test]
    fn test_unclosed_bracket_is_rejected() {
        let patterns: &[&str] = &["a[b"];
        let err = ExcludeMatcher::new(patterns).unwrap_err();
        assert!(err.to_string().contains("a[b"));
    }

    #[test]
    fn test_leading_double_star_matches_top_level() {
        let m = matcher(&["**/.ipynb_checkpoints"]);
        assert!(m.is_excluded(".ipynb_checkpoints"));
        assert!(m.is_excluded("ch/.ipynb_checkpoints"));
        assert!(!m.is_excluded("ch/notes"));
    }

    #[test]
    fn test_walk_is_sorted_and_prunes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join("_build/html")).unwrap();
        fs::write(root.join("z.md"), "").unwrap();
        fs::write(root.join("a.md"), "").unwrap();
        fs::write(root.join("b/c.md"), "").unwrap();
        fs::write(root.join("_build/html/x.md"), "").unwrap();

        let files = find_matching_files(root, &matcher(&["_build"])).unwrap();

        assert_eq!(files, vec!["a.md", "z.md", "b/c.md"]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(find_matching_files(&missing, &matcher(&[])).is_err());
    }
}
