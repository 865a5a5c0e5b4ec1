use std::borrow::Cow;
use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use super::{ExecutionContext, Step};
use crate::error::InstallError;

/// Placeholder replaced with the table prefix in migration files.
pub const PREFIX_PLACEHOLDER: &str = "{prefix}";

/// Applies the SQL migration files in a directory, in file name order.
#[derive(Debug, Clone)]
pub struct RunMigrations {
    dir: Utf8PathBuf,
}

impl RunMigrations {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    /// Lists `*.sql` files in the migration directory, sorted by name.
    pub fn migration_files(&self) -> Result<Vec<Utf8PathBuf>> {
        list_sql_files(&self.dir)
    }
}

impl Step for RunMigrations {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("run-migrations")
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<()> {
        let connection = ctx.connection()?;
        let files = self.migration_files()?;
        info!("running {} migration(s) from {}", files.len(), self.dir);

        for (index, file) in files.iter().enumerate() {
            let sql = fs::read_to_string(file)
                .map_err(|e| InstallError::io(format!("failed to read migration {}", file), e))?;
            let sql = sql.replace(PREFIX_PLACEHOLDER, connection.config().prefix());
            if sql.trim().is_empty() {
                debug!("skipping empty migration {}", file);
                continue;
            }
            info!("running migration {}/{}: {}", index + 1, files.len(), file_label(file));
            connection
                .execute(&sql)
                .with_context(|| format!("migration {} failed", file_label(file)))?;
        }
        Ok(())
    }
}

fn file_label(path: &Utf8Path) -> &str {
    path.file_name().unwrap_or(path.as_str())
}

fn list_sql_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let entries = dir
        .read_dir_utf8()
        .map_err(|e| InstallError::io(format!("failed to read migrations directory {}", dir), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| InstallError::io(format!("failed to read entry in {}", dir), e))?;
        let path = entry.path();
        if path.extension() == Some("sql") && path.is_file() {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}
