//! The submitted setup form and how it is loaded from disk.

use std::fmt;
use std::fs::File;
use std::io::BufReader;

use camino::Utf8Path;
use serde::Deserialize;

use crate::error::InstallError;

/// Fields submitted with the setup form.
///
/// Missing fields deserialize as empty strings and are rejected later by the
/// value objects built from them. YAML is accepted, and therefore JSON too.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallForm {
    /// Database host, optionally with a `:port` suffix
    pub mysql_host: String,
    pub mysql_database: String,
    pub mysql_username: String,
    pub mysql_password: String,
    pub table_prefix: String,
    pub admin_username: String,
    pub admin_password: String,
    pub admin_password_confirmation: String,
    pub admin_email: String,
    pub forum_title: String,
}

impl fmt::Debug for InstallForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallForm")
            .field("mysql_host", &self.mysql_host)
            .field("mysql_database", &self.mysql_database)
            .field("mysql_username", &self.mysql_username)
            .field("mysql_password", &"<redacted>")
            .field("table_prefix", &self.table_prefix)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"<redacted>")
            .field("admin_password_confirmation", &"<redacted>")
            .field("admin_email", &self.admin_email)
            .field("forum_title", &self.forum_title)
            .finish()
    }
}

/// Loads a setup form from a YAML (or JSON) file.
pub fn load_form(path: &Utf8Path) -> Result<InstallForm, InstallError> {
    let file =
        File::open(path).map_err(|e| InstallError::io(format!("failed to open {}", path), e))?;
    let reader = BufReader::new(file);
    serde_yaml::from_reader(reader)
        .map_err(|e| InstallError::Config(format!("failed to parse form {}: {}", path, e)))
}

/// Parses a setup form from a string.
pub fn parse_form(input: &str) -> Result<InstallForm, InstallError> {
    serde_yaml::from_str(input)
        .map_err(|e| InstallError::Config(format!("failed to parse form: {}", e)))
}
