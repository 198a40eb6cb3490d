//! Local filesystem [`FileSource`].
//!
//! File URIs are paths relative to `[files].root`. Absolute URIs and `..`
//! components are refused so a record cannot point outside the root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use ithenticate_core::entity::{FileRef, FileSource, LoadedFile};

pub struct FsFileSource {
    root: PathBuf,
}

impl FsFileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, uri: &str) -> Result<PathBuf> {
        let relative = Path::new(uri);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!("file URI must be relative to the files root: {}", uri);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileSource for FsFileSource {
    async fn load(&self, file: &FileRef) -> Result<Option<LoadedFile>> {
        let path = self.resolve(&file.uri)?;
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(Some(LoadedFile {
                filename: file.filename.clone(),
                contents,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}
