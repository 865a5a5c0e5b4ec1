use std::borrow::Cow;
use std::fs;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use super::{ExecutionContext, Step};
use crate::error::InstallError;

/// Copies bundled assets into the public assets directory.
///
/// Skipped when the source directory does not exist. Symlinks in the source
/// tree are not followed.
#[derive(Debug, Clone)]
pub struct PublishAssets {
    source: Utf8PathBuf,
    target: Utf8PathBuf,
}

impl PublishAssets {
    pub fn new(source: Utf8PathBuf, target: Utf8PathBuf) -> Self {
        Self { source, target }
    }
}

impl Step for PublishAssets {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("publish-assets")
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<()> {
        if !self.source.is_dir() {
            info!("no bundled assets at {}, skipping", self.source);
            return Ok(());
        }
        if ctx.dry_run() {
            info!("would copy assets from {} to {}", self.source, self.target);
            return Ok(());
        }

        let copied = copy_tree(&self.source, &self.target)?;
        info!("published {} asset file(s) to {}", copied, self.target);
        Ok(())
    }
}

fn copy_tree(source: &Utf8Path, target: &Utf8Path) -> Result<usize> {
    fs::create_dir_all(target)
        .map_err(|e| InstallError::io(format!("failed to create directory: {}", target), e))?;

    let entries = source
        .read_dir_utf8()
        .map_err(|e| InstallError::io(format!("failed to read directory: {}", source), e))?;

    let mut copied = 0;
    for entry in entries {
        let entry =
            entry.map_err(|e| InstallError::io(format!("failed to read entry in {}", source), e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| InstallError::io(format!("failed to stat {}", entry.path()), e))?;
        let destination = target.join(entry.file_name());

        if file_type.is_dir() {
            copied += copy_tree(entry.path(), &destination)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &destination).map_err(|e| {
                InstallError::io(format!("failed to copy {} to {}", entry.path(), destination), e)
            })?;
            copied += 1;
        } else {
            debug!("skipping non-regular file {}", entry.path());
        }
    }
    Ok(copied)
}
