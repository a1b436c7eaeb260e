// src/pipeline/clean.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::fs::FileSystem;

/// Removes the output roots left by a previous build.
#[derive(Debug, Clone)]
pub struct Cleaner {
    fs: Arc<dyn FileSystem>,
    targets: Vec<PathBuf>,
}

impl Cleaner {
    pub fn new(fs: Arc<dyn FileSystem>, targets: Vec<PathBuf>) -> Self {
        Self { fs, targets }
    }

    /// Delete every target. Targets that do not exist are fine.
    pub fn clean(&self) -> Result<()> {
        for target in &self.targets {
            self.fs
                .remove_dir_all(target)
                .with_context(|| format!("cleaning {}", target.display()))?;
            info!(path = %target.display(), "removed");
        }
        Ok(())
    }

    pub async fn run(&self) -> Result<()> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.clean())
            .await
            .context("clean worker aborted")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::path::Path;

    #[tokio::test]
    async fn removes_targets_and_is_idempotent() {
        let fs = MockFileSystem::new();
        fs.add_file("dist/index.html", "x");
        fs.add_file("build/css/site.css", "y");
        fs.add_file("md/index.md", "keep");

        let cleaner = Cleaner::new(
            Arc::new(fs.clone()),
            vec![PathBuf::from("dist"), PathBuf::from("build")],
        );
        cleaner.run().await.unwrap();

        assert!(!fs.exists(Path::new("dist")));
        assert!(!fs.exists(Path::new("build")));
        assert!(fs.exists(Path::new("md/index.md")));

        cleaner.run().await.unwrap();
    }
}
