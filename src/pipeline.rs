//! Pipeline orchestrator for executing installation steps.
//!
//! An [`InstallationPipeline`] owns the validated configuration (inside its
//! steps) and the [`ExecutionContext`] the steps share. `run()` executes the
//! steps strictly in order and stops at the first failure; steps that already
//! completed are not rolled back. The context is torn down on every exit path.
//!
//! A pipeline is single-use: once `run()` has been called, further calls are
//! rejected with [`InstallError::AlreadyRun`].

use strum::Display;
use tracing::{error, info};

use crate::admin::ADMIN_USER_ID;
use crate::error::InstallError;
use crate::step::{ExecutionContext, Step};

/// Lifecycle of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PipelineState {
    /// Built and not yet run.
    Ready,
    /// `run()` is in progress (or a step panicked).
    Running,
    /// Every step completed.
    Completed,
    /// A step failed; the pipeline cannot be resumed.
    Failed,
}

/// Result of a successful installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Identity of the administrator account that was created.
    pub admin_user_id: u64,
    /// Number of steps that ran.
    pub steps_completed: usize,
}

/// Ordered, single-use sequence of installation steps.
pub struct InstallationPipeline {
    steps: Vec<Box<dyn Step>>,
    context: ExecutionContext,
    state: PipelineState,
}

impl InstallationPipeline {
    /// Creates a pipeline that will run `steps` in the given order.
    pub fn new(steps: Vec<Box<dyn Step>>, context: ExecutionContext) -> Self {
        Self {
            steps,
            context,
            state: PipelineState::Ready,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The context shared by the steps.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Names of the steps, in execution order.
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().into_owned()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step in order.
    ///
    /// On the first failing step, execution stops and the step's error is
    /// returned wrapped in [`InstallError::StepFailed`]. Later steps never run.
    #[tracing::instrument(skip(self), fields(steps = self.steps.len()))]
    pub fn run(&mut self) -> Result<InstallOutcome, InstallError> {
        if self.state != PipelineState::Ready {
            return Err(InstallError::AlreadyRun { state: self.state });
        }
        self.state = PipelineState::Running;

        info!("starting installation with {} step(s)", self.steps.len());
        let result = self.run_steps();
        self.context.teardown();

        match result {
            Ok(steps_completed) => {
                self.state = PipelineState::Completed;
                info!("installation completed successfully");
                Ok(InstallOutcome {
                    admin_user_id: ADMIN_USER_ID,
                    steps_completed,
                })
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                error!("installation failed: {:#}", e);
                Err(e)
            }
        }
    }

    fn run_steps(&mut self) -> Result<usize, InstallError> {
        let total = self.steps.len();
        for (index, step) in self.steps.iter().enumerate() {
            let name = step.name();
            info!("running step {}/{}: {}", index + 1, total, name);
            step.execute(&mut self.context)
                .map_err(|source| InstallError::StepFailed {
                    step: name.into_owned(),
                    source,
                })?;
        }
        Ok(total)
    }
}

impl std::fmt::Debug for InstallationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationPipeline")
            .field("steps", &self.step_names())
            .field("state", &self.state)
            .finish()
    }
}
