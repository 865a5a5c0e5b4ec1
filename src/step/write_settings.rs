use std::borrow::Cow;

use anyhow::{Context, Result};
use tracing::info;

use super::{ExecutionContext, Step};
use crate::database::connection::quote_literal;
use crate::settings::Settings;

/// Upserts the settings map into the settings table.
#[derive(Debug, Clone)]
pub struct WriteSettings {
    settings: Settings,
}

impl WriteSettings {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Builds the upsert statement for `table`.
    pub fn statement(&self, table: &str) -> Option<String> {
        if self.settings.is_empty() {
            return None;
        }
        let rows = self
            .settings
            .iter()
            .map(|(key, value)| format!("({}, {})", quote_literal(key), quote_literal(value)))
            .collect::<Vec<_>>()
            .join(",\n  ");
        Some(format!(
            "INSERT INTO `{}` (`key`, `value`) VALUES\n  {}\nON DUPLICATE KEY UPDATE `value` = VALUES(`value`);",
            table, rows
        ))
    }
}

impl Step for WriteSettings {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("write-settings")
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<()> {
        let connection = ctx.connection()?;
        let Some(sql) = self.statement(&connection.table("settings")) else {
            info!("no settings to write");
            return Ok(());
        };
        connection
            .execute(&sql)
            .context("failed to write settings")?;
        info!("wrote {} setting(s)", self.settings.len());
        Ok(())
    }
}
