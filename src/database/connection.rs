//! SQL access through the `mysql` command-line client.
//!
//! A [`DatabaseConnection`] does not hold a socket: each statement batch runs
//! one `mysql` invocation through the shared [`CommandExecutor`], with the
//! SQL on stdin and the password in `MYSQL_PWD` so it never shows up in argv.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::DatabaseConfig;
use crate::error::InstallError;
use crate::executor::{CommandExecutor, CommandSpec, ExecutionResult};

/// Name of the client binary looked up in `PATH`.
pub const MYSQL_CLIENT: &str = "mysql";

/// Lowest supported MySQL server version.
pub const MIN_MYSQL_VERSION: (u32, u32, u32) = (5, 5, 0);
/// Lowest supported MariaDB server version.
pub const MIN_MARIADB_VERSION: (u32, u32, u32) = (10, 0, 5);

/// Handle for issuing SQL against the configured server.
pub struct DatabaseConnection {
    config: DatabaseConfig,
    executor: Arc<dyn CommandExecutor>,
    server_version: Option<String>,
    open: bool,
}

impl DatabaseConnection {
    /// Connects to the server and checks that its version is supported.
    ///
    /// In dry-run mode the executor returns no output, so the version check
    /// is skipped.
    pub fn open(config: DatabaseConfig, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        let mut connection = Self {
            config,
            executor,
            server_version: None,
            open: true,
        };

        let version = connection
            .query_value("SELECT VERSION();")
            .with_context(|| {
                format!(
                    "could not connect to database server at {}:{}",
                    connection.config.host(),
                    connection.config.port()
                )
            })?;

        match version {
            Some(version) => {
                check_server_version(&version)?;
                info!("connected to database server version {}", version);
                connection.server_version = Some(version);
            }
            None => debug!("no server version reported, skipping version check"),
        }

        Ok(connection)
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Version string reported by the server, if it was queried.
    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Returns `name` with the table prefix applied.
    pub fn table(&self, name: &str) -> String {
        self.config.table(name)
    }

    /// Runs a batch of statements.
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.run(sql, false).map(|_| ())
    }

    /// Runs a query and returns the first column of its first row.
    pub fn query_value(&self, sql: &str) -> Result<Option<String>> {
        let result = self.run(sql, true)?;
        Ok(result
            .stdout
            .as_deref()
            .and_then(|out| out.lines().next())
            .map(|line| line.split('\t').next().unwrap_or(line).trim().to_string())
            .filter(|value| !value.is_empty()))
    }

    /// Marks the connection closed; later statements are rejected.
    pub fn close(&mut self) {
        if self.open {
            self.open = false;
            debug!(
                "closed database connection to {}:{}/{}",
                self.config.host(),
                self.config.port(),
                self.config.database()
            );
        }
    }

    fn run(&self, sql: &str, capture: bool) -> Result<ExecutionResult> {
        if !self.open {
            anyhow::bail!("database connection has already been closed");
        }

        debug!("sql: {}", sql);
        let mut spec = CommandSpec::new(MYSQL_CLIENT, self.client_args())
            .with_env("MYSQL_PWD", self.config.password())
            .with_stdin(sql);
        if capture {
            spec = spec.capturing_stdout();
        }

        let result = self.executor.execute(&spec)?;
        if !result.success() {
            return Err(InstallError::Execution {
                command: MYSQL_CLIENT.to_string(),
                status: result
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            }
            .into());
        }
        Ok(result)
    }

    fn client_args(&self) -> Vec<String> {
        vec![
            "--protocol=TCP".to_string(),
            format!("--host={}", self.config.host()),
            format!("--port={}", self.config.port()),
            format!("--user={}", self.config.username()),
            "--default-character-set=utf8mb4".to_string(),
            "--batch".to_string(),
            "--skip-column-names".to_string(),
            format!("--database={}", self.config.database()),
        ]
    }
}

impl Drop for DatabaseConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Quotes a value as a MySQL string literal.
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\'' => quoted.push_str("\\'"),
            '\\' => quoted.push_str("\\\\"),
            '\0' => quoted.push_str("\\0"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\x1a' => quoted.push_str("\\Z"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

/// Rejects servers older than MySQL 5.5 / MariaDB 10.0.5.
pub(crate) fn check_server_version(version: &str) -> Result<(), InstallError> {
    let parsed = parse_version(version).ok_or_else(|| InstallError::Execution {
        command: "SELECT VERSION()".to_string(),
        status: format!("unrecognized server version: {}", version),
    })?;

    let minimum = if version.to_ascii_lowercase().contains("mariadb") {
        MIN_MARIADB_VERSION
    } else {
        MIN_MYSQL_VERSION
    };

    if parsed < minimum {
        return Err(InstallError::Execution {
            command: "SELECT VERSION()".to_string(),
            status: format!(
                "MySQL version too low ({}). You need at least MySQL 5.5 or MariaDB 10.0.5.",
                version
            ),
        });
    }
    Ok(())
}

fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
    let numeric = version
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .next()?;
    let mut parts = numeric.split('.').map(|p| p.parse::<u32>().ok());
    let major = parts.next()??;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseDriver;
    use std::sync::Mutex;

    struct ScriptedExecutor {
        stdout: Option<String>,
        specs: Mutex<Vec<CommandSpec>>,
    }

    impl CommandExecutor for ScriptedExecutor {
        fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
            self.specs.lock().unwrap().push(spec.clone());
            Ok(ExecutionResult {
                status: None,
                stdout: if spec.capture_stdout { self.stdout.clone() } else { None },
            })
        }
    }

    fn config() -> DatabaseConfig {
        DatabaseConfig::new(DatabaseDriver::Mysql, "db", 3307, "forum", "admin", "pw", "fl_")
            .unwrap()
    }

    fn executor(stdout: Option<&str>) -> Arc<ScriptedExecutor> {
        Arc::new(ScriptedExecutor {
            stdout: stdout.map(str::to_string),
            specs: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_open_checks_version_and_passes_password_via_env() {
        let exec = executor(Some("8.0.36\n"));
        let conn = DatabaseConnection::open(config(), exec.clone()).unwrap();
        assert_eq!(conn.server_version(), Some("8.0.36"));

        let specs = exec.specs.lock().unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].command, "mysql");
        assert!(specs[0].args.contains(&"--port=3307".to_string()));
        assert!(specs[0].args.iter().all(|a| !a.contains("pw")));
        assert_eq!(specs[0].env, vec![("MYSQL_PWD".to_string(), "pw".to_string())]);
        assert_eq!(specs[0].stdin.as_deref(), Some("SELECT VERSION();"));
        assert_eq!(specs[0].args.last().map(String::as_str), Some("--database=forum"));
    }

    #[test]
    fn test_database_name_is_never_positional() {
        let exec = executor(None);
        DatabaseConnection::open(config(), exec.clone()).unwrap();
        let specs = exec.specs.lock().unwrap();
        assert!(specs[0].args.iter().all(|a| a.starts_with("--")));
        assert!(!specs[0].args.iter().any(|a| a == "forum"));
    }

    #[test]
    fn test_open_rejects_old_server() {
        let exec = executor(Some("5.1.73\n"));
        let err = DatabaseConnection::open(config(), exec).err().unwrap();
        assert!(format!("{:#}", err).contains("MySQL version too low"));
    }

    #[test]
    fn test_open_without_output_skips_version_check() {
        let conn = DatabaseConnection::open(config(), executor(None)).unwrap();
        assert!(conn.server_version().is_none());
    }

    #[test]
    fn test_closed_connection_rejects_statements() {
        let mut conn = DatabaseConnection::open(config(), executor(None)).unwrap();
        conn.close();
        assert!(!conn.is_open());
        let err = conn.execute("SELECT 1;").unwrap_err();
        assert!(err.to_string().contains("already been closed"));
    }

    #[test]
    fn test_check_server_version() {
        assert!(check_server_version("5.5.0").is_ok());
        assert!(check_server_version("8.0.36-0ubuntu0.22.04.1").is_ok());
        assert!(check_server_version("10.0.5-MariaDB").is_ok());
        assert!(check_server_version("10.0.4-MariaDB").is_err());
        assert!(check_server_version("5.4.99").is_err());
        assert!(check_server_version("garbage").is_err());
    }

    #[test]
    fn test_quote_literal_escapes() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("it's"), "'it\\'s'");
        assert_eq!(quote_literal("a\\b\nc"), "'a\\\\b\\nc'");
    }
}
