use std::borrow::Cow;

use anyhow::Result;
use tracing::info;

use super::{ExecutionContext, Step};
use crate::database::{DatabaseConfig, DatabaseConnection};

/// Opens the database connection and stores it in the context.
#[derive(Debug, Clone)]
pub struct ConnectToDatabase {
    config: DatabaseConfig,
}

impl ConnectToDatabase {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

impl Step for ConnectToDatabase {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("connect")
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<()> {
        info!(
            "connecting to {} database {} at {}:{}",
            self.config.driver(),
            self.config.database(),
            self.config.host(),
            self.config.port()
        );
        let connection = DatabaseConnection::open(self.config.clone(), ctx.executor().clone())?;
        ctx.set_connection(connection);
        Ok(())
    }
}
