// src/pipeline/stage.rs

//! The generic read → transform → write stage.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::{StageError, StageFailed};
use crate::fs::FileSystem;
use crate::pipeline::source::{SourceEntry, SourceSet};
use crate::pipeline::transform::{SourceFile, Transform};

/// Outcome of one stage run: what was written and what failed.
#[derive(Debug, Default)]
pub struct StageReport {
    /// Destination paths successfully written.
    pub written: Vec<PathBuf>,
    pub failures: Vec<StageError>,
}

impl StageReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn a report with failures into a task-level error.
    pub fn into_result(self, stage: &str) -> std::result::Result<Vec<PathBuf>, StageFailed> {
        if self.failures.is_empty() {
            Ok(self.written)
        } else {
            Err(StageFailed {
                stage: stage.to_string(),
                failures: self.failures,
            })
        }
    }
}

/// Runs a transform over every file selected by a glob.
///
/// Files are processed independently and in parallel on the blocking pool.
/// A failure on one file never prevents the others from being attempted.
/// Two sources mapping to the same destination is a write failure for the
/// second one to finish; the first one's output stands.
#[derive(Debug, Clone)]
pub struct FileStage {
    name: String,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl FileStage {
    pub fn new(name: impl Into<String>, fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            fs,
            root: root.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Transform every file matching `source_glob` (relative to the root) and
    /// write the results below `destination` (also relative to the root).
    ///
    /// Returns `Err` only if the glob is invalid or the source tree cannot be
    /// enumerated; per-file problems are collected in the report.
    pub async fn run(
        &self,
        source_glob: &str,
        destination: &Path,
        transform: Arc<dyn Transform>,
    ) -> Result<StageReport> {
        let sources = SourceSet::new(source_glob)?;
        let entries = sources.collect(self.fs.as_ref(), &self.root)?;
        let dest_dir = self.root.join(destination);

        info!(
            stage = %self.name,
            pattern = %source_glob,
            files = entries.len(),
            destination = %dest_dir.display(),
            "running stage"
        );

        let claims: Claims = Arc::default();
        let mut jobs = JoinSet::new();
        for entry in entries {
            let fs = Arc::clone(&self.fs);
            let transform = Arc::clone(&transform);
            let claims = Arc::clone(&claims);
            let dest_dir = dest_dir.clone();
            jobs.spawn_blocking(move || {
                process_file(fs.as_ref(), transform.as_ref(), &claims, entry, &dest_dir)
            });
        }

        let mut report = StageReport::default();
        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok(Ok(written)) => {
                    debug!(stage = %self.name, file = %written.display(), "wrote output");
                    report.written.push(written);
                }
                Ok(Err(failure)) => {
                    warn!(stage = %self.name, error = %failure, "file failed");
                    report.failures.push(failure);
                }
                Err(join_err) => {
                    return Err(anyhow!("stage '{}' worker aborted: {join_err}", self.name));
                }
            }
        }

        report.written.sort();
        info!(
            stage = %self.name,
            written = report.written.len(),
            failed = report.failures.len(),
            "stage finished"
        );
        Ok(report)
    }
}

/// Destinations already taken in one stage run, mapped to the source that took them.
type Claims = Arc<Mutex<HashMap<PathBuf, PathBuf>>>;

fn claim(claims: &Claims, target: &Path, source: &Path) -> Result<()> {
    let mut taken = match claims.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    match taken.get(target) {
        Some(owner) if owner != source => Err(anyhow!(
            "{} and {} both produce this file",
            owner.display(),
            source.display()
        )),
        _ => {
            taken.insert(target.to_path_buf(), source.to_path_buf());
            Ok(())
        }
    }
}

fn process_file(
    fs: &dyn FileSystem,
    transform: &dyn Transform,
    claims: &Claims,
    entry: SourceEntry,
    dest_dir: &Path,
) -> std::result::Result<PathBuf, StageError> {
    let contents = fs.read(&entry.path).map_err(|error| StageError::SourceRead {
        path: entry.path.clone(),
        error,
    })?;

    let source = SourceFile {
        path: entry.path.clone(),
        relative: entry.relative,
        contents,
    };

    let output = match catch_unwind(AssertUnwindSafe(|| transform.apply(source))) {
        Ok(result) => result,
        Err(_) => Err(anyhow!("transform panicked")),
    }
    .map_err(|error| StageError::Transform {
        path: entry.path.clone(),
        error,
    })?;

    let target = dest_dir.join(&output.name);
    claim(claims, &target, &entry.path).map_err(|error| StageError::DestinationWrite {
        path: target.clone(),
        error,
    })?;
    fs.write(&target, &output.contents)
        .map_err(|error| StageError::DestinationWrite {
            path: target.clone(),
            error,
        })?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::transform::{OutputFile, SetExtension, Verbatim};

    fn stage(fs: &MockFileSystem) -> FileStage {
        FileStage::new("test", Arc::new(fs.clone()), ".")
    }

    #[tokio::test]
    async fn writes_one_output_per_input() {
        let fs = MockFileSystem::new();
        fs.add_file("graphics/a.png", vec![1u8]);
        fs.add_file("graphics/b.svg", "<svg/>");

        let report = stage(&fs)
            .run("graphics/*", Path::new("dist/graphics"), Arc::new(Verbatim))
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.written.len(), 2);
        assert_eq!(fs.file_string("dist/graphics/b.svg").as_deref(), Some("<svg/>"));
    }

    #[tokio::test]
    async fn one_bad_file_does_not_stop_the_others() {
        let fs = MockFileSystem::new();
        fs.add_file("scripts/good.js", "ok");
        fs.add_file("scripts/bad.js", "boom");
        fs.add_file("scripts/also_good.js", "ok");

        let picky = |file: SourceFile| -> Result<OutputFile> {
            if file.text()? == "boom" {
                anyhow::bail!("refusing to process");
            }
            Ok(OutputFile::new(file.relative, file.contents))
        };

        let report = stage(&fs)
            .run("scripts/*", Path::new("build/scripts"), Arc::new(picky))
            .await
            .unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0], StageError::Transform { .. }));
        assert!(fs.file_string("build/scripts/good.js").is_some());
        assert!(fs.file_string("build/scripts/also_good.js").is_some());

        let err = report.into_result("scripts").unwrap_err();
        assert!(err.to_string().contains("bad.js"));
    }

    #[tokio::test]
    async fn write_failures_are_destination_errors() {
        let fs = MockFileSystem::new();
        fs.add_file("graphics/a.png", vec![1u8]);
        fs.deny_writes_under("dist");

        let report = stage(&fs)
            .run("graphics/*", Path::new("dist/graphics"), Arc::new(Verbatim))
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0], StageError::DestinationWrite { .. }));
    }

    #[tokio::test]
    async fn two_sources_with_one_destination_fail_instead_of_overwriting() {
        let fs = MockFileSystem::new();
        fs.add_file("md/a.md", "first");
        fs.add_file("md/a.markdown", "second");

        let report = stage(&fs)
            .run("md/*", Path::new("dist"), Arc::new(SetExtension("html".into())))
            .await
            .unwrap();

        assert_eq!(report.written, vec![PathBuf::from("./dist/a.html")]);
        assert_eq!(report.failures.len(), 1);
        match &report.failures[0] {
            StageError::DestinationWrite { path, error } => {
                assert_eq!(path, Path::new("./dist/a.html"));
                assert!(error.to_string().contains("both produce"));
            }
            other => panic!("unexpected failure: {other:?}"),
        }

        let html = fs.file_string("dist/a.html").unwrap();
        assert!(html == "first" || html == "second");
    }

    #[tokio::test]
    async fn panicking_transform_is_a_transform_error() {
        let fs = MockFileSystem::new();
        fs.add_file("md/a.md", "x");

        let explode = |_: SourceFile| -> Result<OutputFile> { panic!("kaboom") };
        let report = stage(&fs)
            .run("md/*", Path::new("dist"), Arc::new(explode))
            .await
            .unwrap();

        assert!(matches!(report.failures[0], StageError::Transform { .. }));
    }
}
