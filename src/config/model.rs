// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// content = "md/*"
/// scripts = "scripts/*"
/// styles = "css/*"
/// graphics = "graphics/*"
/// template = "template.html"
/// build = "build"
/// dist = "dist"
///
/// [pages]
/// extension = "html"
/// pretty = false
///
/// [task.deploy]
/// cmd = "rsync -a dist/ host:/srv/site"
/// after = ["default"]
/// ```
///
/// All sections are optional and default to the layout above.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSiteConfig {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub pages: PagesSection,

    /// Extra shell-command tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, CommandTaskConfig>,
}

/// Validated configuration. Only obtainable through `TryFrom<RawSiteConfig>`
/// (see `config::validate`) or [`SiteConfig::default`].
#[derive(Debug, Clone)]
pub struct SiteConfig {
    paths: PathsSection,
    pages: PagesSection,
    task: BTreeMap<String, CommandTaskConfig>,
}

impl SiteConfig {
    pub(crate) fn new_unchecked(
        paths: PathsSection,
        pages: PagesSection,
        task: BTreeMap<String, CommandTaskConfig>,
    ) -> Self {
        Self { paths, pages, task }
    }

    pub fn paths(&self) -> &PathsSection {
        &self.paths
    }

    pub fn pages(&self) -> &PagesSection {
        &self.pages
    }

    pub fn tasks(&self) -> &BTreeMap<String, CommandTaskConfig> {
        &self.task
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::new_unchecked(
            PathsSection::default(),
            PagesSection::default(),
            BTreeMap::new(),
        )
    }
}

/// `[paths]` section. Globs and directories are relative to the project
/// root (the directory holding the config file).
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Markdown content files rendered into pages.
    #[serde(default = "default_content")]
    pub content: String,

    #[serde(default = "default_scripts")]
    pub scripts: String,

    #[serde(default = "default_styles")]
    pub styles: String,

    #[serde(default = "default_graphics")]
    pub graphics: String,

    /// The single template every page is rendered through.
    #[serde(default = "default_template")]
    pub template: String,

    /// Intermediate output root for styles and scripts.
    #[serde(default = "default_build")]
    pub build: String,

    /// Final output root for pages and graphics.
    #[serde(default = "default_dist")]
    pub dist: String,
}

fn default_content() -> String {
    "md/*".to_string()
}

fn default_scripts() -> String {
    "scripts/*".to_string()
}

fn default_styles() -> String {
    "css/*".to_string()
}

fn default_graphics() -> String {
    "graphics/*".to_string()
}

fn default_template() -> String {
    "template.html".to_string()
}

fn default_build() -> String {
    "build".to_string()
}

fn default_dist() -> String {
    "dist".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            content: default_content(),
            scripts: default_scripts(),
            styles: default_styles(),
            graphics: default_graphics(),
            template: default_template(),
            build: default_build(),
            dist: default_dist(),
        }
    }
}

/// `[pages]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PagesSection {
    /// Extension (without the dot) given to rendered pages; the source
    /// extension is replaced.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Re-indent rendered pages, one block element per line.
    #[serde(default)]
    pub pretty: bool,
}

fn default_extension() -> String {
    "html".to_string()
}

impl Default for PagesSection {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            pretty: false,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandTaskConfig {
    /// The command to execute, through `sh -c` (or `cmd /C` on Windows).
    pub cmd: String,

    /// Tasks that must succeed first; built-in task names are allowed.
    #[serde(default)]
    pub after: Vec<String>,
}
