use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

/// Scriptable runner for tests. Expectations are matched by program name
/// and an optional argument predicate; unmatched invocations fail loudly so
/// a workflow can never silently reach a real CLI in tests.
#[derive(Clone, Default)]
pub struct MockProcessRunner {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    call_history: Arc<Mutex<Vec<ProcessCommand>>>,
}

struct MockExpectation {
    program: String,
    #[allow(clippy::type_complexity)]
    args_matcher: Option<Box<dyn Fn(&[String]) -> bool + Send + Sync>>,
    response: Result<ProcessOutput, ProcessErrorKind>,
}

/// Cloneable stand-in for the non-clone `ProcessError`.
enum ProcessErrorKind {
    CommandNotFound,
    Timeout,
}

pub struct MockCommandConfig {
    runner: MockProcessRunner,
    expectation: MockExpectation,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(&self, program: &str) -> MockCommandConfig {
        MockCommandConfig {
            runner: self.clone(),
            expectation: MockExpectation {
                program: program.to_string(),
                args_matcher: None,
                response: Ok(ProcessOutput {
                    status: ExitStatus::Success,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: Duration::from_millis(5),
                }),
            },
        }
    }

    /// Number of invocations observed, across all programs.
    pub fn invocation_count(&self) -> usize {
        self.call_history.lock().unwrap().len()
    }

    pub fn calls_for(&self, program: &str) -> Vec<ProcessCommand> {
        self.call_history
            .lock()
            .unwrap()
            .iter()
            .filter(|cmd| cmd.program == program)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        self.call_history.lock().unwrap().push(command.clone());

        let expectations = self.expectations.lock().unwrap();
        for expectation in expectations.iter() {
            if expectation.program != command.program {
                continue;
            }
            if let Some(ref matcher) = expectation.args_matcher {
                if !(matcher)(&command.args) {
                    continue;
                }
            }
            return match &expectation.response {
                Ok(output) => Ok(output.clone()),
                Err(ProcessErrorKind::CommandNotFound) => {
                    Err(ProcessError::CommandNotFound(command.program.clone()))
                }
                Err(ProcessErrorKind::Timeout) => Err(ProcessError::Timeout {
                    command: command.display_line(),
                    timeout: command.timeout,
                }),
            };
        }

        Err(ProcessError::MockExpectationNotMet(format!(
            "no expectation for: {}",
            command.display_line()
        )))
    }
}

impl MockCommandConfig {
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.expectation.args_matcher = Some(Box::new(matcher));
        self
    }

    /// Match when the argument list contains `needle` anywhere.
    pub fn with_arg_containing(self, needle: &'static str) -> Self {
        self.with_args(move |args| args.iter().any(|a| a.contains(needle)))
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        if let Ok(response) = &mut self.expectation.response {
            response.stdout = stdout.to_string();
        }
        self
    }

    pub fn returns_exit_code(mut self, code: i32, stderr: &str) -> Self {
        if let Ok(response) = &mut self.expectation.response {
            response.status = if code == 0 {
                ExitStatus::Success
            } else {
                ExitStatus::Error(code)
            };
            response.stderr = stderr.to_string();
        }
        self
    }

    pub fn not_found(mut self) -> Self {
        self.expectation.response = Err(ProcessErrorKind::CommandNotFound);
        self
    }

    pub fn times_out(mut self) -> Self {
        self.expectation.response = Err(ProcessErrorKind::Timeout);
        self
    }

    pub fn finish(self) {
        self.runner
            .expectations
            .lock()
            .unwrap()
            .push(self.expectation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matches_by_program_and_args() {
        let mock = MockProcessRunner::new();
        mock.expect("gcloud")
            .with_args(|args| args.first().map(String::as_str) == Some("projects"))
            .returns_stdout("[]")
            .finish();

        let output = mock
            .run(ProcessCommand::new("gcloud").args(["projects", "list"]))
            .await
            .unwrap();
        assert_eq!(output.stdout, "[]");
        assert_eq!(mock.invocation_count(), 1);
    }

    #[tokio::test]
    async fn unmatched_invocation_fails() {
        let mock = MockProcessRunner::new();
        let result = mock.run(ProcessCommand::new("az").arg("login")).await;
        assert!(matches!(
            result,
            Err(ProcessError::MockExpectationNotMet(_))
        ));
    }

    #[tokio::test]
    async fn scripted_failures_surface_as_typed_errors() {
        let mock = MockProcessRunner::new();
        mock.expect("gcloud").not_found().finish();
        let result = mock.run(ProcessCommand::new("gcloud")).await;
        assert!(matches!(result, Err(ProcessError::CommandNotFound(_))));
    }
}
