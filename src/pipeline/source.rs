// src/pipeline/source.rs

//! Source selection: which files a stage reads.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::fs::FileSystem;

/// A compiled source glob such as `md/*` or `css/**/*.css`.
///
/// The glob is relative to the project root. Its leading literal directory
/// (`md`, `css`) is the *base*: enumeration starts there, and output names
/// are the matched paths relative to it. `*` never crosses a `/`.
#[derive(Debug, Clone)]
pub struct SourceSet {
    pattern: String,
    base: PathBuf,
    matcher: GlobMatcher,
}

/// One file selected by a [`SourceSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Path as seen by the filesystem (root joined with the relative path).
    pub path: PathBuf,
    /// Path relative to the glob base.
    pub relative: PathBuf,
}

impl SourceSet {
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pattern}"))?;

        Ok(Self {
            pattern: pattern.to_string(),
            base: literal_base(pattern),
            matcher: glob.compile_matcher(),
        })
    }

    /// Collect all files under `root` that match this set.
    ///
    /// A missing base directory selects nothing. The result is sorted for
    /// stable logs; consumers must not rely on any order.
    pub fn collect(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<SourceEntry>> {
        let base_dir = root.join(&self.base);
        if !fs.is_dir(&base_dir) {
            debug!(base = %base_dir.display(), pattern = %self.pattern, "source base missing; nothing to read");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut stack = vec![base_dir.clone()];

        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    let Ok(rel_to_root) = path.strip_prefix(root) else {
                        continue;
                    };
                    let rel_str = rel_to_root.to_string_lossy().replace('\\', "/");
                    let rel_str = rel_str.trim_start_matches("./");
                    if !self.matcher.is_match(rel_str) {
                        continue;
                    }
                    let relative = path
                        .strip_prefix(&base_dir)
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| rel_to_root.to_path_buf());
                    files.push(SourceEntry { path, relative });
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

/// Leading path components that contain no glob metacharacters.
///
/// For a fully literal pattern (a single file) the base is its parent.
fn literal_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').collect();
    let literal: Vec<&str> = parts
        .iter()
        .take_while(|part| !part.contains(['*', '?', '[', '{']))
        .copied()
        .collect();

    let take = if literal.len() == parts.len() {
        literal.len().saturating_sub(1)
    } else {
        literal.len()
    };

    let base: PathBuf = literal[..take].iter().filter(|p| !p.is_empty()).collect();
    if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base
    }
}
