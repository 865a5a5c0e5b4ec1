//! Installation steps.
//!
//! A [`Step`] is one ordered unit of installation work. Steps never share
//! state directly: anything a later step needs from an earlier one (the open
//! database connection) travels through the [`ExecutionContext`].
//!
//! The standard sequence is:
//!
//! 1. [`ConnectToDatabase`]: open and verify the database connection
//! 2. [`StoreConfig`]: write the resolved configuration file
//! 3. [`RunMigrations`]: create the schema
//! 4. [`WriteSettings`]: persist the settings map
//! 5. [`CreateAdminUser`]: create the first administrator
//! 6. [`PublishAssets`]: copy bundled assets into the public directory
//!
//! Adding a step means implementing [`Step`] and either appending it through
//! [`crate::installation::InstallationBuilder::step`] or adding it to
//! [`crate::installation::Installation::standard_steps`].

mod connect;
mod context;
mod create_admin;
mod migrations;
mod publish_assets;
mod store_config;
mod write_settings;

use std::borrow::Cow;

use anyhow::Result;

pub use connect::ConnectToDatabase;
pub use context::ExecutionContext;
pub use create_admin::{ADMIN_GROUP_ID, CreateAdminUser};
pub use migrations::{PREFIX_PLACEHOLDER, RunMigrations};
pub use publish_assets::PublishAssets;
pub use store_config::{CONFIG_FILE_NAME, StoreConfig};
pub use write_settings::WriteSettings;

/// A named unit of installation work.
///
/// `execute` returns the step's native error; the pipeline wraps it without
/// inspecting it.
pub trait Step: Send {
    /// Short identifier used in logs and in `StepFailed` errors.
    fn name(&self) -> Cow<'_, str>;

    /// Performs the step.
    fn execute(&self, ctx: &mut ExecutionContext) -> Result<()>;
}

impl<S: Step + ?Sized> Step for Box<S> {
    fn name(&self) -> Cow<'_, str> {
        (**self).name()
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<()> {
        (**self).execute(ctx)
    }
}
