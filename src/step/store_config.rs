use std::borrow::Cow;
use std::fs::{self, OpenOptions};
use std::io::Write;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use rustix::fs::{self as rfs, CWD, Mode, OFlags};
use serde::Serialize;
use tracing::info;

use super::{ExecutionContext, Step};
use crate::database::{DatabaseConfig, DatabaseDriver};
use crate::error::InstallError;
use crate::settings::BaseUrl;

/// File name of the configuration written into the install directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Serialize)]
struct StoredConfig<'a> {
    debug: bool,
    database: StoredDatabase<'a>,
    url: &'a str,
    paths: StoredPaths,
}

#[derive(Debug, Serialize)]
struct StoredDatabase<'a> {
    driver: DatabaseDriver,
    host: &'a str,
    port: u16,
    database: &'a str,
    username: &'a str,
    password: &'a str,
    charset: &'static str,
    collation: &'static str,
    prefix: &'a str,
    strict: bool,
}

#[derive(Debug, Serialize)]
struct StoredPaths {
    api: &'static str,
    admin: &'static str,
}

/// Writes the resolved configuration file.
///
/// Refuses to overwrite an existing file, since its presence marks the
/// instance as installed.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    dir: Utf8PathBuf,
    debug: bool,
    database: DatabaseConfig,
    base_url: BaseUrl,
}

impl StoreConfig {
    pub fn new(dir: Utf8PathBuf, debug: bool, database: DatabaseConfig, base_url: BaseUrl) -> Self {
        Self {
            dir,
            debug,
            database,
            base_url,
        }
    }

    pub fn path(&self) -> Utf8PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Renders the configuration file content.
    pub fn render(&self) -> Result<String> {
        let stored = StoredConfig {
            debug: self.debug,
            database: StoredDatabase {
                driver: self.database.driver(),
                host: self.database.host(),
                port: self.database.port(),
                database: self.database.database(),
                username: self.database.username(),
                password: self.database.password(),
                charset: "utf8mb4",
                collation: "utf8mb4_unicode_ci",
                prefix: self.database.prefix(),
                strict: false,
            },
            url: self.base_url.as_str(),
            paths: StoredPaths {
                api: "api",
                admin: "admin",
            },
        };
        serde_yaml::to_string(&stored).context("failed to serialize configuration")
    }
}

impl Step for StoreConfig {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("store-config")
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<()> {
        let path = self.path();
        let content = self.render()?;

        if ctx.dry_run() {
            info!("would write configuration to {}", path);
            return Ok(());
        }

        ensure_real_directory(&self.dir)?;

        if fs::symlink_metadata(&path).is_ok() {
            anyhow::bail!(
                "configuration file already exists at {}; the forum appears to be installed",
                path
            );
        }

        write_atomically(&self.dir, &path, &content)?;
        info!("wrote configuration to {}", path);
        Ok(())
    }
}

/// Opens `dir` without following symlinks to make sure it is a real directory.
fn ensure_real_directory(dir: &Utf8Path) -> Result<()> {
    rfs::openat(
        CWD,
        dir.as_str(),
        OFlags::NOFOLLOW | OFlags::DIRECTORY | OFlags::RDONLY | OFlags::CLOEXEC,
        Mode::empty(),
    )
    .map_err(|e| match e {
        rustix::io::Errno::LOOP | rustix::io::Errno::NOTDIR => anyhow::anyhow!(
            "{} is a symlink or not a directory, refusing to write configuration",
            dir
        ),
        _ => InstallError::io(format!("failed to open {}", dir), std::io::Error::from(e)).into(),
    })?;
    Ok(())
}

/// Writes to a uniquely named sibling file, then links it into place.
///
/// The link fails if `path` already exists, so a file created after the
/// existence check is never replaced.
fn write_atomically(dir: &Utf8Path, path: &Utf8Path, content: &str) -> Result<()> {
    let temp_path = dir.join(format!(".{}.{}.tmp", CONFIG_FILE_NAME, uuid::Uuid::new_v4()));

    let write_result = (|| -> Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&temp_path)
            .map_err(|e| InstallError::io(format!("failed to create {}", temp_path), e))?;
        file.write_all(content.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| InstallError::io(format!("failed to write {}", temp_path), e))?;
        fs::hard_link(&temp_path, path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                anyhow::anyhow!(
                    "configuration file already exists at {}; the forum appears to be installed",
                    path
                )
            } else {
                InstallError::io(format!("failed to move config into {}", path), e).into()
            }
        })?;
        Ok(())
    })();

    if let Err(e) = fs::remove_file(&temp_path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %temp_path, "failed to remove temporary config file: {}", e);
    }
    write_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{CommandExecutor, CommandSpec, ExecutionResult};
    use std::sync::Arc;

    struct NullExecutor;

    impl CommandExecutor for NullExecutor {
        fn execute(&self, _spec: &CommandSpec) -> Result<ExecutionResult> {
            Ok(ExecutionResult::default())
        }
    }

    fn step(dir: &Utf8Path) -> StoreConfig {
        let database =
            DatabaseConfig::new(DatabaseDriver::Mysql, "db", 3306, "forum", "root", "pw", "fl_")
                .unwrap();
        StoreConfig::new(
            dir.to_path_buf(),
            false,
            database,
            BaseUrl::parse("http://example.com/").unwrap(),
        )
    }

    fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .expect("path should be valid UTF-8");
        (temp, path)
    }

    #[test]
    fn test_render_contains_resolved_values() {
        let (_temp, dir) = utf8_tempdir();
        let rendered = step(&dir).render().unwrap();
        assert!(rendered.contains("driver: mysql"));
        assert!(rendered.contains("port: 3306"));
        assert!(rendered.contains("http://example.com"));
        assert!(!rendered.contains("example.com/"));
        assert!(rendered.contains("charset: utf8mb4"));
        assert!(rendered.contains("prefix: fl_"));
    }

    #[test]
    fn test_execute_writes_file() {
        let (_temp, dir) = utf8_tempdir();
        let mut ctx = ExecutionContext::new(Arc::new(NullExecutor), false);
        step(&dir).execute(&mut ctx).unwrap();

        let written = fs::read_to_string(dir.join(CONFIG_FILE_NAME)).unwrap();
        assert!(written.contains("database: forum"));
        let leftovers = fs::read_dir(&dir).unwrap().count();
        assert_eq!(leftovers, 1, "temporary file should have been removed");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dir.join(CONFIG_FILE_NAME)).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_execute_refuses_existing_config() {
        let (_temp, dir) = utf8_tempdir();
        fs::write(dir.join(CONFIG_FILE_NAME), "existing").unwrap();
        let mut ctx = ExecutionContext::new(Arc::new(NullExecutor), false);
        let err = step(&dir).execute(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(dir.join(CONFIG_FILE_NAME)).unwrap(), "existing");
    }

    #[test]
    fn test_execute_dry_run_writes_nothing() {
        let (_temp, dir) = utf8_tempdir();
        let mut ctx = ExecutionContext::new(Arc::new(NullExecutor), true);
        step(&dir).execute(&mut ctx).unwrap();
        assert!(!dir.join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_final_move_never_replaces_existing_file() {
        let (_temp, dir) = utf8_tempdir();
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, "created concurrently").unwrap();

        let err = write_atomically(&dir, &path, "debug: false\n").unwrap_err();
        assert!(err.to_string().contains("already exists"), "unexpected error: {:#}", err);
        assert_eq!(fs::read_to_string(&path).unwrap(), "created concurrently");
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1, "temporary file should be removed");
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_refuses_symlinked_directory() {
        let (_temp, dir) = utf8_tempdir();
        let real = dir.join("real");
        let link = dir.join("link");
        fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let mut ctx = ExecutionContext::new(Arc::new(NullExecutor), false);
        let err = step(&link).execute(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("symlink"), "unexpected error: {:#}", err);
        assert!(!real.join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_execute_fails_for_missing_directory() {
        let (_temp, dir) = utf8_tempdir();
        let mut ctx = ExecutionContext::new(Arc::new(NullExecutor), false);
        let err = step(&dir.join("missing")).execute(&mut ctx).unwrap_err();
        let typed = err.downcast_ref::<InstallError>();
        assert!(matches!(typed, Some(InstallError::Io { .. })), "unexpected error: {:#}", err);
    }
}
