//! Tests for the setup form controller.

mod helpers;

use std::sync::{Arc, Mutex};

use forum_installer::controller::{
    InstallController, InstallRequest, STATUS_INTERNAL_SERVER_ERROR, STATUS_NO_CONTENT,
    STATUS_UNPROCESSABLE_ENTITY, SessionAuthenticator,
};
use forum_installer::installation::{InstallPaths, Installation};
use helpers::{RecordingExecutor, install_dir, valid_form};

#[derive(Debug, Default)]
struct Session {
    user_id: Option<u64>,
}

#[derive(Default)]
struct RecordingAuthenticator {
    logins: Arc<Mutex<Vec<u64>>>,
    fail: bool,
}

impl SessionAuthenticator for RecordingAuthenticator {
    type Session = Session;

    fn log_in(&self, session: &mut Session, user_id: u64) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("session store unavailable");
        }
        self.logins.lock().unwrap().push(user_id);
        session.user_id = Some(user_id);
        Ok(())
    }
}

#[test]
fn test_successful_install_logs_in_admin_once() {
    let (_temp, dir) = install_dir();
    let installation =
        Installation::new(InstallPaths::under(&dir), Arc::new(RecordingExecutor::new()));
    let authenticator = RecordingAuthenticator::default();
    let logins = Arc::clone(&authenticator.logins);
    let controller = InstallController::new(installation, authenticator);

    let form = valid_form();
    let mut session = Session::default();
    let response = controller.handle(InstallRequest {
        uri: "http://example.com/",
        form: &form,
        session: &mut session,
    });

    assert_eq!(response.status, STATUS_NO_CONTENT);
    assert!(response.body.is_empty());
    assert!(response.is_success());
    assert_eq!(*logins.lock().unwrap(), [1]);
    assert_eq!(session.user_id, Some(1));
}

#[test]
fn test_validation_failure_returns_message_without_side_effects() {
    let (_temp, dir) = install_dir();
    let executor = Arc::new(RecordingExecutor::new());
    let installation = Installation::new(InstallPaths::under(&dir), executor.clone());
    let authenticator = RecordingAuthenticator::default();
    let logins = Arc::clone(&authenticator.logins);
    let controller = InstallController::new(installation, authenticator);

    let mut form = valid_form();
    form.admin_password_confirmation = "something else".to_string();
    let mut session = Session::default();
    let response = controller.handle(InstallRequest {
        uri: "http://example.com/",
        form: &form,
        session: &mut session,
    });

    assert_eq!(response.status, STATUS_UNPROCESSABLE_ENTITY);
    assert_eq!(response.body, "The admin password did not match its confirmation.");
    assert_eq!(executor.call_count(), 0);
    assert!(logins.lock().unwrap().is_empty());
    assert_eq!(session.user_id, None);
}

#[test]
fn test_step_failure_returns_cause_message() {
    let (_temp, dir) = install_dir();
    let executor = Arc::new(RecordingExecutor::failing_on(0));
    let installation = Installation::new(InstallPaths::under(&dir), executor);
    let authenticator = RecordingAuthenticator::default();
    let logins = Arc::clone(&authenticator.logins);
    let controller = InstallController::new(installation, authenticator);

    let form = valid_form();
    let mut session = Session::default();
    let response = controller.handle(InstallRequest {
        uri: "http://example.com/",
        form: &form,
        session: &mut session,
    });

    assert_eq!(response.status, STATUS_INTERNAL_SERVER_ERROR);
    assert!(
        response.body.contains("simulated failure on call 0"),
        "unexpected body: {}",
        response.body
    );
    assert!(!response.body.contains("installation step"));
    assert!(logins.lock().unwrap().is_empty());
    assert!(!dir.join("config.yaml").exists());
}

#[test]
fn test_login_failure_is_reported() {
    let (_temp, dir) = install_dir();
    let installation =
        Installation::new(InstallPaths::under(&dir), Arc::new(RecordingExecutor::new()));
    let authenticator = RecordingAuthenticator {
        fail: true,
        ..Default::default()
    };
    let controller = InstallController::new(installation, authenticator);

    let form = valid_form();
    let mut session = Session::default();
    let response = controller.handle(InstallRequest {
        uri: "http://example.com/",
        form: &form,
        session: &mut session,
    });

    assert_eq!(response.status, STATUS_INTERNAL_SERVER_ERROR);
    assert_eq!(response.body, "session store unavailable");
}
