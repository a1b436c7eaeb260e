// src/pipeline/transforms/template.rs

//! Page rendering through the shared template.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::{Environment, UndefinedBehavior, Value, context};
use pulldown_cmark::{Options, Parser, html};

use crate::errors::StageError;
use crate::fs::FileSystem;
use crate::pipeline::transform::{OutputFile, SourceFile, Transform};
use crate::pipeline::transforms::pretty::pretty_html;

/// The single template every content file is rendered through.
///
/// The render context has one field, `contents`, holding the raw text of the
/// content file. A `markdown` filter turns CommonMark into HTML, so a typical
/// template contains `{{ contents | markdown }}`.
#[derive(Debug)]
pub struct PageTemplate {
    path: PathBuf,
    source: String,
    extension: String,
    pretty: bool,
    env: Environment<'static>,
}

impl PageTemplate {
    /// Read and validate the template. Problems are reported against the
    /// template path so they show up in the owning stage's failure list.
    pub fn load(fs: &dyn FileSystem, path: &Path, extension: &str) -> std::result::Result<Self, StageError> {
        let source = fs.read_to_string(path).map_err(|error| StageError::SourceRead {
            path: path.to_path_buf(),
            error,
        })?;

        Self::from_source(path, source, extension).map_err(|error| StageError::Transform {
            path: path.to_path_buf(),
            error,
        })
    }

    pub fn from_source(path: impl Into<PathBuf>, source: impl Into<String>, extension: &str) -> Result<Self> {
        let path = path.into();
        let source = source.into();

        page_environment()
            .template_from_str(&source)
            .with_context(|| format!("invalid template {}", path.display()))?;

        Ok(Self {
            path,
            source,
            extension: extension.to_string(),
            pretty: false,
            env: page_environment(),
        })
    }

    /// Re-indent every rendered page with [`pretty_html`].
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Render one page from raw content text.
    pub fn render(&self, contents: &str) -> Result<String> {
        let html = self
            .env
            .render_str(&self.source, context! { contents => contents })
            .with_context(|| format!("rendering template {}", self.path.display()))?;
        Ok(if self.pretty { pretty_html(&html) } else { html })
    }
}

impl Transform for PageTemplate {
    fn apply(&self, file: SourceFile) -> Result<OutputFile> {
        let rendered = self.render(file.text()?)?;
        Ok(OutputFile::new(file.relative.with_extension(&self.extension), rendered))
    }
}

fn page_environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_filter("markdown", markdown_filter);
    env
}

fn markdown_filter(text: &str) -> Value {
    Value::from_safe_string(markdown_to_html(text))
}

/// Render CommonMark (with tables, footnotes and strikethrough) to HTML.
pub fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(text, options);
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
