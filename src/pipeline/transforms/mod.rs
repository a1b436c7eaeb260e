// src/pipeline/transforms/mod.rs

//! Concrete per-file transforms used by the site stages.

pub mod css_import;
pub mod minify;
pub mod pretty;
pub mod template;

pub use css_import::CssImports;
pub use minify::{Minify, minify_js};
pub use pretty::pretty_html;
pub use template::{PageTemplate, markdown_to_html};
