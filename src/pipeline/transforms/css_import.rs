// src/pipeline/transforms/css_import.rs

//! Inline CSS `@import` rules.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};
use tracing::debug;

use crate::fs::{FileSystem, normalize_path};
use crate::pipeline::transform::{OutputFile, SourceFile, Transform};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"@import\s+(?:url\(\s*(?:"([^"]*)"|'([^']*)'|([^)\s]*))\s*\)|"([^"]*)"|'([^']*)')\s*([^;]*);"#,
    )
    .expect("import pattern is a valid regex")
});

/// Replaces every local `@import` with the imported file's contents.
///
/// Imports resolve relative to the importing file and are inlined
/// recursively. `@import "x.css" print;` becomes `@media print { ... }`.
/// Remote imports (`http:`, `https:`, protocol-relative) stay as they are.
#[derive(Debug, Clone)]
pub struct CssImports {
    fs: Arc<dyn FileSystem>,
}

impl CssImports {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Inline the imports of `text`, which was read from `path`.
    pub fn inline(&self, path: &Path, text: &str) -> Result<String> {
        let mut chain = vec![normalize_path(path)];
        self.inline_nested(text, &mut chain)
    }

    fn inline_nested(&self, text: &str, chain: &mut Vec<PathBuf>) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in IMPORT_RE.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let url = import_url(&caps);
            if is_remote(url) {
                continue;
            }

            let current = chain.last().cloned().unwrap_or_default();
            let dir = current.parent().unwrap_or(Path::new(""));
            let target = normalize_path(&dir.join(url));

            if let Some(pos) = chain.iter().position(|p| *p == target) {
                let mut cycle: Vec<String> = chain[pos..].iter().map(|p| p.display().to_string()).collect();
                cycle.push(target.display().to_string());
                bail!("import cycle: {}", cycle.join(" -> "));
            }

            let imported = self.fs.read_to_string(&target).with_context(|| {
                format!("{} imports {}, which cannot be read", current.display(), target.display())
            })?;
            debug!(from = %current.display(), import = %target.display(), "inlining import");

            chain.push(target);
            let inner = self.inline_nested(&imported, chain)?;
            chain.pop();

            out.push_str(&text[last..whole.start()]);
            let media = caps.get(6).map(|m| m.as_str().trim()).unwrap_or("");
            if media.is_empty() {
                out.push_str(inner.trim_end());
            } else {
                out.push_str(&format!("@media {media} {{\n{}\n}}", inner.trim_end()));
            }
            last = whole.end();
        }

        out.push_str(&text[last..]);
        Ok(out)
    }
}

impl Transform for CssImports {
    fn apply(&self, file: SourceFile) -> Result<OutputFile> {
        let inlined = self.inline(&file.path, file.text()?)?;
        Ok(OutputFile::new(file.relative, inlined))
    }
}

fn import_url<'t>(caps: &Captures<'t>) -> &'t str {
    (1..=5)
        .find_map(|i| caps.get(i))
        .map(|m| m.as_str())
        .unwrap_or("")
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http:") || url.starts_with("https:") || url.starts_with("//")
}
