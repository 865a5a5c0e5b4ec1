use std::borrow::Cow;

use anyhow::{Context, Result};
use tracing::info;

use super::{ExecutionContext, Step};
use crate::admin::{ADMIN_USER_ID, AdminUser};
use crate::database::connection::quote_literal;
use crate::password::hash_password;

/// Group that grants administrator permissions.
pub const ADMIN_GROUP_ID: u64 = 1;

/// Creates the first administrator account and adds it to the admin group.
#[derive(Debug, Clone)]
pub struct CreateAdminUser {
    admin: AdminUser,
}

impl CreateAdminUser {
    pub fn new(admin: AdminUser) -> Self {
        Self { admin }
    }

    /// Builds the insert statements for the given password hash.
    pub fn statements(&self, users_table: &str, group_user_table: &str, hash: &str) -> String {
        format!(
            "INSERT INTO `{users}` (`id`, `username`, `email`, `password`, `joined_at`, `is_email_confirmed`) \
             VALUES ({id}, {username}, {email}, {hash}, UTC_TIMESTAMP(), 1);\n\
             INSERT INTO `{group_user}` (`user_id`, `group_id`) VALUES ({id}, {group});",
            users = users_table,
            group_user = group_user_table,
            id = ADMIN_USER_ID,
            username = quote_literal(self.admin.username()),
            email = quote_literal(self.admin.email()),
            hash = quote_literal(hash),
            group = ADMIN_GROUP_ID,
        )
    }
}

impl Step for CreateAdminUser {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed("create-admin")
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<()> {
        let connection = ctx.connection()?;
        let hash = hash_password(self.admin.password())?;
        let sql = self.statements(
            &connection.table("users"),
            &connection.table("group_user"),
            &hash,
        );
        connection
            .execute(&sql)
            .with_context(|| format!("failed to create admin user {}", self.admin.username()))?;
        info!("created administrator account {} (id {})", self.admin.username(), ADMIN_USER_ID);
        Ok(())
    }
}
