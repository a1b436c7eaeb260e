// src/pipeline/transform.rs

//! The per-file transformation seam shared by every stage.
//!
//! A [`Transform`] is a pure function from one source file to one output
//! file. Multi-step pipelines are ordinary composition via
//! [`Transform::then`]: the output of the first step is fed to the second
//! as its source.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// A content item: one source file read from disk.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path the file was read from; used to resolve relative references.
    pub path: PathBuf,
    /// Name relative to the stage's source base; the default output name.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, relative: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            relative: relative.into(),
            contents: contents.into(),
        }
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents)
            .with_context(|| format!("{} is not valid UTF-8", self.path.display()))
    }
}

/// Result of transforming one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Output path relative to the stage destination directory.
    pub name: PathBuf,
    pub contents: Vec<u8>,
}

impl OutputFile {
    pub fn new(name: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

pub trait Transform: Send + Sync {
    fn apply(&self, file: SourceFile) -> Result<OutputFile>;

    /// Feed this transform's output into `next`.
    fn then<T>(self, next: T) -> Chain<Self, T>
    where
        Self: Sized,
        T: Transform,
    {
        Chain {
            first: self,
            second: next,
        }
    }
}

impl<F> Transform for F
where
    F: Fn(SourceFile) -> Result<OutputFile> + Send + Sync,
{
    fn apply(&self, file: SourceFile) -> Result<OutputFile> {
        self(file)
    }
}

/// Two transforms applied one after the other.
#[derive(Debug, Clone)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A: Transform, B: Transform> Transform for Chain<A, B> {
    fn apply(&self, file: SourceFile) -> Result<OutputFile> {
        let path = file.path.clone();
        let intermediate = self.first.apply(file)?;
        self.second.apply(SourceFile {
            path,
            relative: intermediate.name,
            contents: intermediate.contents,
        })
    }
}

/// Copies the file unchanged under its relative name.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl Transform for Verbatim {
    fn apply(&self, file: SourceFile) -> Result<OutputFile> {
        Ok(OutputFile {
            name: file.relative,
            contents: file.contents,
        })
    }
}

/// Replaces the extension of the output name.
#[derive(Debug, Clone)]
pub struct SetExtension(pub String);

impl Transform for SetExtension {
    fn apply(&self, file: SourceFile) -> Result<OutputFile> {
        Ok(OutputFile {
            name: file.relative.with_extension(&self.0),
            contents: file.contents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(file: SourceFile) -> Result<OutputFile> {
        let text = file.text()?.to_uppercase();
        Ok(OutputFile::new(file.relative, text))
    }

    #[test]
    fn chain_feeds_output_into_next_step() {
        let t = upper.then(SetExtension("txt".into()));
        let out = t
            .apply(SourceFile::new("md/a.md", "a.md", "hello"))
            .unwrap();
        assert_eq!(out, OutputFile::new("a.txt", "HELLO"));
    }

    #[test]
    fn verbatim_keeps_name_and_bytes() {
        let out = Verbatim
            .apply(SourceFile::new("graphics/logo.png", "logo.png", vec![0u8, 159, 146]))
            .unwrap();
        assert_eq!(out.name, PathBuf::from("logo.png"));
        assert_eq!(out.contents, vec![0u8, 159, 146]);
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let file = SourceFile::new("md/bad.md", "bad.md", vec![0xff, 0xfe]);
        assert!(upper(file).is_err());
    }
}
