//! Assembling an installation.
//!
//! - [`Installation`]: where and how to install (paths, executor, dry run)
//! - [`InstallationConfig`]: the validated inputs of one attempt
//! - [`InstallationBuilder`]: collects inputs and finalizes them into an
//!   [`InstallationPipeline`]
//!
//! Everything here runs before any external effect. A failure is always
//! [`InstallError::ValidationFailed`] and leaves nothing behind.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::admin::AdminUser;
use crate::config::InstallForm;
use crate::database::{DatabaseConfig, DatabaseDriver};
use crate::error::InstallError;
use crate::executor::CommandExecutor;
use crate::pipeline::InstallationPipeline;
use crate::settings::{BaseUrl, Settings};
use crate::step::{
    ConnectToDatabase, CreateAdminUser, ExecutionContext, PublishAssets, RunMigrations, Step,
    StoreConfig, WriteSettings,
};

/// Filesystem locations used by the standard steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    /// Directory that receives the configuration file
    pub install_dir: Utf8PathBuf,
    /// Directory holding the `*.sql` schema migrations
    pub migrations_dir: Utf8PathBuf,
    /// Bundled assets shipped with the application
    pub assets_dir: Utf8PathBuf,
    /// Public directory the assets are published to
    pub public_assets_dir: Utf8PathBuf,
}

impl InstallPaths {
    /// Conventional layout below `base`.
    pub fn under(base: &Utf8Path) -> Self {
        Self {
            install_dir: base.to_path_buf(),
            migrations_dir: base.join("migrations"),
            assets_dir: base.join("assets"),
            public_assets_dir: base.join("public").join("assets"),
        }
    }
}

/// The validated inputs of one installation attempt.
#[derive(Debug, Clone)]
pub struct InstallationConfig {
    pub base_url: BaseUrl,
    pub database: DatabaseConfig,
    pub admin: AdminUser,
    /// Custom settings, applied on top of the defaults
    pub settings: Settings,
    pub debug: bool,
}

impl InstallationConfig {
    /// Builds the configuration from a submitted form.
    ///
    /// `request_uri` is the URI the form was posted to; it becomes the base
    /// URL once its trailing slash is trimmed.
    pub fn from_form(form: &InstallForm, request_uri: &str) -> Result<Self, InstallError> {
        let base_url = BaseUrl::parse(request_uri)?;
        let database = DatabaseConfig::from_host_input(
            DatabaseDriver::Mysql,
            &form.mysql_host,
            form.mysql_database.as_str(),
            form.mysql_username.as_str(),
            form.mysql_password.as_str(),
            form.table_prefix.as_str(),
        )?;
        let admin = AdminUser::confirmed(
            form.admin_username.as_str(),
            &form.admin_password,
            &form.admin_password_confirmation,
            form.admin_email.as_str(),
        )?;
        let settings = Settings::derived(&form.forum_title, &base_url);

        Ok(Self {
            base_url,
            database,
            admin,
            settings,
            debug: false,
        })
    }

    /// Settings that will be persisted: defaults overlaid with the custom ones.
    pub fn effective_settings(&self) -> Settings {
        Settings::defaults().merged(&self.settings)
    }
}

/// Where and how installations are performed.
#[derive(Clone)]
pub struct Installation {
    paths: InstallPaths,
    executor: Arc<dyn CommandExecutor>,
    dry_run: bool,
}

impl Installation {
    pub fn new(paths: InstallPaths, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            paths,
            executor,
            dry_run: false,
        }
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn paths(&self) -> &InstallPaths {
        &self.paths
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Starts assembling an installation attempt.
    pub fn builder(&self) -> InstallationBuilder {
        InstallationBuilder::new(self.clone())
    }

    /// The standard steps for `config`, in execution order.
    pub fn standard_steps(&self, config: &InstallationConfig) -> Vec<Box<dyn Step>> {
        vec![
            Box::new(ConnectToDatabase::new(config.database.clone())),
            Box::new(StoreConfig::new(
                self.paths.install_dir.clone(),
                config.debug,
                config.database.clone(),
                config.base_url.clone(),
            )),
            Box::new(RunMigrations::new(self.paths.migrations_dir.clone())),
            Box::new(WriteSettings::new(config.effective_settings())),
            Box::new(CreateAdminUser::new(config.admin.clone())),
            Box::new(PublishAssets::new(
                self.paths.assets_dir.clone(),
                self.paths.public_assets_dir.clone(),
            )),
        ]
    }

    /// Creates the pipeline for an already validated configuration.
    pub fn pipeline(&self, config: &InstallationConfig) -> InstallationPipeline {
        InstallationPipeline::new(
            self.standard_steps(config),
            ExecutionContext::new(self.executor.clone(), self.dry_run),
        )
    }
}

impl std::fmt::Debug for Installation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installation")
            .field("paths", &self.paths)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

/// Collects the inputs of one attempt and turns them into a pipeline.
///
/// Inputs that fail their own validation when supplied raw (see
/// [`InstallationBuilder::admin_credentials`]) are remembered and reported by
/// [`InstallationBuilder::build`], which is all-or-nothing.
pub struct InstallationBuilder {
    installation: Installation,
    base_url: Option<String>,
    database: Option<DatabaseConfig>,
    admin: Option<AdminUser>,
    settings: Settings,
    debug: bool,
    extra_steps: Vec<Box<dyn Step>>,
    deferred_error: Option<InstallError>,
}

impl InstallationBuilder {
    fn new(installation: Installation) -> Self {
        Self {
            installation,
            base_url: None,
            database: None,
            admin: None,
            settings: Settings::new(),
            debug: false,
            extra_steps: Vec::new(),
            deferred_error: None,
        }
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn database_config(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }

    #[must_use]
    pub fn admin_user(mut self, admin: AdminUser) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Supplies raw admin credentials; a mismatched confirmation or an
    /// invalid field is reported by `build()`.
    #[must_use]
    pub fn admin_credentials(
        mut self,
        username: &str,
        password: &str,
        confirmation: &str,
        email: &str,
    ) -> Self {
        match AdminUser::confirmed(username, password, confirmation, email) {
            Ok(admin) => self.admin = Some(admin),
            Err(e) => self.defer(e),
        }
        self
    }

    /// Merges custom settings into those already supplied.
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = self.settings.merged(&settings);
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Supplies every input at once from a validated configuration.
    #[must_use]
    pub fn config(self, config: InstallationConfig) -> Self {
        self.base_url(config.base_url.as_str())
            .database_config(config.database)
            .admin_user(config.admin)
            .settings(config.settings)
            .debug(config.debug)
    }

    /// Appends a step that runs after the standard steps.
    #[must_use]
    pub fn step(mut self, step: impl Step + 'static) -> Self {
        self.extra_steps.push(Box::new(step));
        self
    }

    /// Validates everything supplied and produces the pipeline.
    pub fn build(self) -> Result<InstallationPipeline, InstallError> {
        if let Some(e) = self.deferred_error {
            return Err(e);
        }

        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| InstallError::validation("The base URL is required."))
            .and_then(BaseUrl::parse)?;
        let database = self
            .database
            .ok_or_else(|| InstallError::validation("The database configuration is required."))?;
        let admin = self
            .admin
            .ok_or_else(|| InstallError::validation("The admin user is required."))?;

        let config = InstallationConfig {
            base_url,
            database,
            admin,
            settings: self.settings,
            debug: self.debug,
        };

        let mut steps = self.installation.standard_steps(&config);
        steps.extend(self.extra_steps);
        debug!("built installation pipeline with {} step(s)", steps.len());

        Ok(InstallationPipeline::new(
            steps,
            ExecutionContext::new(self.installation.executor.clone(), self.installation.dry_run),
        ))
    }

    fn defer(&mut self, error: InstallError) {
        if self.deferred_error.is_none() {
            self.deferred_error = Some(error);
        }
    }
}
