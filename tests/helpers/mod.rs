use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use camino::Utf8PathBuf;
use forum_installer::config::InstallForm;
use forum_installer::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use forum_installer::step::{ExecutionContext, Step};

/// Records every command and answers version queries like a MySQL 8 server.
#[derive(Default)]
pub struct RecordingExecutor {
    pub calls: Mutex<Vec<CommandSpec>>,
    /// If set, the Nth call (0-indexed) will return an error.
    pub fail_on_call: Option<usize>,
}

#[allow(dead_code)]
impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call_index: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on_call: Some(call_index),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// SQL sent on stdin, one entry per call.
    pub fn statements(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|spec| spec.stdin.clone())
            .collect()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(spec.clone());
        drop(calls);

        if self.fail_on_call == Some(index) {
            anyhow::bail!("simulated failure on call {}", index);
        }
        Ok(ExecutionResult {
            status: None,
            stdout: spec.capture_stdout.then(|| "8.0.36\n".to_string()),
        })
    }
}

/// Ordered log of step executions shared between spy steps.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

/// Step that records its invocations and optionally fails.
#[allow(dead_code)]
pub struct SpyStep {
    pub name: String,
    pub invocations: Arc<AtomicUsize>,
    pub log: ExecutionLog,
    pub fail_with: Option<String>,
}

#[allow(dead_code)]
impl SpyStep {
    pub fn new(name: &str, log: &ExecutionLog) -> Self {
        Self {
            name: name.to_string(),
            invocations: Arc::new(AtomicUsize::new(0)),
            log: Arc::clone(log),
            fail_with: None,
        }
    }

    pub fn failing(name: &str, log: &ExecutionLog, message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(name, log)
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.invocations)
    }
}

impl Step for SpyStep {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn execute(&self, _ctx: &mut ExecutionContext) -> Result<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(self.name.clone());
        match &self.fail_with {
            Some(message) => anyhow::bail!("{}", message),
            None => Ok(()),
        }
    }
}

/// A form that passes every validation rule.
#[allow(dead_code)]
pub fn valid_form() -> InstallForm {
    InstallForm {
        mysql_host: "db.local".to_string(),
        mysql_database: "forum".to_string(),
        mysql_username: "forum".to_string(),
        mysql_password: "dbsecret".to_string(),
        table_prefix: "fl_".to_string(),
        admin_username: "admin".to_string(),
        admin_password: "password123".to_string(),
        admin_password_confirmation: "password123".to_string(),
        admin_email: "admin@example.com".to_string(),
        forum_title: "Acme".to_string(),
    }
}

/// Temporary install directory with a migrations folder.
#[allow(dead_code)]
pub fn install_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
        .expect("path should be valid UTF-8");
    std::fs::create_dir(dir.join("migrations")).expect("failed to create migrations dir");
    std::fs::write(
        dir.join("migrations/001_create_users.sql"),
        "CREATE TABLE `{prefix}users` (`id` INT PRIMARY KEY);",
    )
    .expect("failed to write migration");
    (temp, dir)
}
