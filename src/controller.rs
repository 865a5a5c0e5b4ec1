//! Request handling for the setup form.
//!
//! The HTTP transport is not part of this crate. [`InstallController`]
//! consumes an already parsed [`InstallRequest`] and produces an
//! [`InstallResponse`] that a transport can render as-is.

use anyhow::Result;
use tracing::{info, warn};

use crate::admin::ADMIN_USER_ID;
use crate::config::InstallForm;
use crate::error::InstallError;
use crate::installation::{Installation, InstallationConfig};

pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_UNPROCESSABLE_ENTITY: u16 = 422;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// Establishes authenticated sessions.
pub trait SessionAuthenticator {
    /// Session type of the hosting transport.
    type Session;

    /// Makes `session` represent the user with id `user_id`.
    fn log_in(&self, session: &mut Self::Session, user_id: u64) -> Result<()>;
}

/// A parsed setup submission.
pub struct InstallRequest<'a, S> {
    /// URI the form was submitted to; the base URL is derived from it
    pub uri: &'a str,
    pub form: &'a InstallForm,
    pub session: &'a mut S,
}

/// Response for the transport to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResponse {
    pub status: u16,
    /// Plain message body; empty on success
    pub body: String,
}

impl InstallResponse {
    fn empty() -> Self {
        Self {
            status: STATUS_NO_CONTENT,
            body: String::new(),
        }
    }

    fn error(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Runs one installation attempt per submitted form.
pub struct InstallController<A> {
    installation: Installation,
    authenticator: A,
}

impl<A: SessionAuthenticator> InstallController<A> {
    pub fn new(installation: Installation, authenticator: A) -> Self {
        Self {
            installation,
            authenticator,
        }
    }

    /// Validates the form, runs the installation, and signs the new
    /// administrator in.
    ///
    /// Invalid input yields 422 with the validation message. A failed step
    /// yields 500 with the step's own error message.
    pub fn handle(&self, request: InstallRequest<'_, A::Session>) -> InstallResponse {
        let config = match InstallationConfig::from_form(request.form, request.uri) {
            Ok(config) => config,
            Err(e) => return Self::failure(e),
        };

        let pipeline = self.installation.builder().config(config).build();
        let mut pipeline = match pipeline {
            Ok(pipeline) => pipeline,
            Err(e) => return Self::failure(e),
        };

        let outcome = match pipeline.run() {
            Ok(outcome) => outcome,
            Err(e) => return Self::failure(e),
        };

        if let Err(e) = self.authenticator.log_in(request.session, outcome.admin_user_id) {
            warn!("installation succeeded but signing in failed: {:#}", e);
            return InstallResponse::error(STATUS_INTERNAL_SERVER_ERROR, format!("{:#}", e));
        }

        info!("signed in administrator {}", ADMIN_USER_ID);
        InstallResponse::empty()
    }

    fn failure(error: InstallError) -> InstallResponse {
        let status = if error.is_validation() {
            STATUS_UNPROCESSABLE_ENTITY
        } else {
            STATUS_INTERNAL_SERVER_ERROR
        };
        warn!(status, "installation request rejected: {}", error);
        InstallResponse::error(status, error.operator_message())
    }
}
