use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::database::DatabaseConnection;
use crate::executor::CommandExecutor;

/// Resources shared between the steps of one pipeline run.
///
/// The context owns the database connection opened by the connect step and
/// releases it in [`ExecutionContext::teardown`], which the pipeline calls on
/// every exit path.
pub struct ExecutionContext {
    executor: Arc<dyn CommandExecutor>,
    dry_run: bool,
    connection: Option<DatabaseConnection>,
}

impl ExecutionContext {
    pub fn new(executor: Arc<dyn CommandExecutor>, dry_run: bool) -> Self {
        Self {
            executor,
            dry_run,
            connection: None,
        }
    }

    pub fn executor(&self) -> &Arc<dyn CommandExecutor> {
        &self.executor
    }

    /// When true, steps log what they would do instead of writing files.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Hands the connection to the context; a previous one is closed first.
    pub fn set_connection(&mut self, connection: DatabaseConnection) {
        if let Some(mut previous) = self.connection.replace(connection) {
            previous.close();
        }
    }

    /// The connection opened by an earlier step.
    pub fn connection(&self) -> Result<&DatabaseConnection> {
        self.connection
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("database connection has not been established"))
    }

    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Releases everything the context holds.
    pub fn teardown(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
        debug!("execution context torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DatabaseConfig, DatabaseDriver};
    use crate::executor::{CommandSpec, ExecutionResult};

    struct NullExecutor;

    impl CommandExecutor for NullExecutor {
        fn execute(&self, _spec: &CommandSpec) -> Result<ExecutionResult> {
            Ok(ExecutionResult::default())
        }
    }

    fn connection(executor: Arc<dyn CommandExecutor>) -> DatabaseConnection {
        let config =
            DatabaseConfig::new(DatabaseDriver::Mysql, "db", 3306, "forum", "root", "", "")
                .unwrap();
        DatabaseConnection::open(config, executor).unwrap()
    }

    #[test]
    fn test_connection_missing_before_connect() {
        let ctx = ExecutionContext::new(Arc::new(NullExecutor), false);
        let err = ctx.connection().err().unwrap();
        assert_eq!(err.to_string(), "database connection has not been established");
    }

    #[test]
    fn test_teardown_releases_connection() {
        let executor: Arc<dyn CommandExecutor> = Arc::new(NullExecutor);
        let mut ctx = ExecutionContext::new(executor.clone(), false);
        ctx.set_connection(connection(executor));
        assert!(ctx.has_connection());

        ctx.teardown();
        assert!(!ctx.has_connection());
        ctx.teardown();
    }
}
