//! Subprocess abstraction for the external provider CLIs.
//!
//! Everything that leaves the process goes through [`ProcessRunner`], so
//! tests can substitute [`MockProcessRunner`] and observe (or forbid) every
//! invocation.

pub mod error;
pub mod mock;
pub mod runner;
pub mod tools;

pub use error::ProcessError;
pub use mock::{MockCommandConfig, MockProcessRunner};
pub use runner::{
    ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner,
    DEFAULT_TOOL_TIMEOUT,
};
pub use tools::CliTool;

use std::sync::Arc;

#[derive(Clone)]
pub struct SubprocessManager {
    runner: Arc<dyn ProcessRunner>,
}

impl SubprocessManager {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    pub fn production() -> Self {
        Self::new(Arc::new(TokioProcessRunner))
    }

    pub fn mock() -> (Self, MockProcessRunner) {
        let mock = MockProcessRunner::new();
        let runner = Arc::new(mock.clone()) as Arc<dyn ProcessRunner>;
        (Self::new(runner), mock)
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    /// The cloud provider CLI.
    pub fn gcloud(&self) -> CliTool {
        CliTool::new("gcloud", Arc::clone(&self.runner))
    }

    /// The directory provider CLI.
    pub fn az(&self) -> CliTool {
        CliTool::new("az", Arc::clone(&self.runner))
    }
}
