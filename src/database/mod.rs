//! Database connection parameters.
//!
//! [`DatabaseConfig`] holds the normalized connection settings submitted with
//! the setup form. The host is always stored without a port: a submitted
//! `host:port` string is split by [`DatabaseConfig::from_host_input`].

pub mod connection;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use connection::DatabaseConnection;

use crate::error::InstallError;

/// Longest accepted table prefix.
pub const MAX_PREFIX_LEN: usize = 10;

static PREFIX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]*$").expect("table prefix pattern should be valid")
});

/// Database server flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DatabaseDriver {
    /// MySQL or MariaDB
    Mysql,
    /// PostgreSQL (recognized, but not supported by the installer)
    Pgsql,
}

impl DatabaseDriver {
    /// Port the server listens on when none was given.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Mysql => 3306,
            Self::Pgsql => 5432,
        }
    }
}

/// Validated, immutable database connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    driver: DatabaseDriver,
    host: String,
    port: u16,
    database: String,
    username: String,
    password: String,
    prefix: String,
}

impl DatabaseConfig {
    /// Builds a config from already-split host and port.
    pub fn new(
        driver: DatabaseDriver,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Result<Self, InstallError> {
        let config = Self {
            driver,
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            prefix: prefix.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from a host string that may carry a `:port` suffix.
    ///
    /// The string is split at the first `:`. Without one, the driver's
    /// default port is used.
    pub fn from_host_input(
        driver: DatabaseDriver,
        host_input: &str,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Result<Self, InstallError> {
        let (host, port) = split_host_port(host_input, driver)?;
        Self::new(driver, host, port, database, username, password, prefix)
    }

    fn validate(&self) -> Result<(), InstallError> {
        if self.driver != DatabaseDriver::Mysql {
            return Err(InstallError::validation("Currently, only MySQL/MariaDB is supported."));
        }
        if self.host.trim().is_empty() {
            return Err(InstallError::validation(
                "Please specify the hostname of your database server.",
            ));
        }
        if self.host.contains(':') {
            return Err(InstallError::validation(
                "The database host must not contain a port; it has to be given separately.",
            ));
        }
        if self.port == 0 {
            return Err(invalid_port());
        }
        if self.database.trim().is_empty() {
            return Err(InstallError::validation("Please specify the database name."));
        }
        if self.database.starts_with('-') {
            return Err(InstallError::validation("The database name must not start with a dash."));
        }
        if self.username.trim().is_empty() {
            return Err(InstallError::validation(
                "Please specify the username for accessing the database.",
            ));
        }
        if !PREFIX_PATTERN.is_match(&self.prefix) {
            return Err(InstallError::validation(
                "The prefix may only contain characters a-z, 0-9 and underscore.",
            ));
        }
        if self.prefix.len() > MAX_PREFIX_LEN {
            return Err(InstallError::validation(format!(
                "The prefix should be no longer than {} characters.",
                MAX_PREFIX_LEN
            )));
        }
        Ok(())
    }

    pub fn driver(&self) -> DatabaseDriver {
        self.driver
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns `name` with the table prefix applied.
    pub fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("prefix", &self.prefix)
            .finish()
    }
}

fn invalid_port() -> InstallError {
    InstallError::validation("Please provide a valid port number between 1 and 65535.")
}

/// Splits `host[:port]` at the first colon.
pub fn split_host_port(input: &str, driver: DatabaseDriver) -> Result<(String, u16), InstallError> {
    match input.split_once(':') {
        Some((host, port)) => {
            let port = port.trim().parse::<u16>().map_err(|_| invalid_port())?;
            Ok((host.to_string(), port))
        }
        None => Ok((input.to_string(), driver.default_port())),
    }
}
