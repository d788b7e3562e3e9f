use std::sync::Arc;

use super::error::ProcessError;
use super::runner::{ProcessCommand, ProcessOutput, ProcessRunner};
use crate::config::Provider;
use crate::error::{Result, SetupError};

/// Handle to one external provider CLI (`gcloud`, `az`).
///
/// Workflows receive this instead of touching the process layer directly,
/// so the "currently authenticated tool context" is an explicit resource
/// rather than ambient global state.
#[derive(Clone)]
pub struct CliTool {
    program: &'static str,
    runner: Arc<dyn ProcessRunner>,
}

impl CliTool {
    pub fn new(program: &'static str, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { program, runner }
    }

    pub fn name(&self) -> &'static str {
        self.program
    }

    /// Verify the tool exists on PATH by probing `--version`.
    pub async fn ensure_available(&self) -> Result<()> {
        let result = self
            .runner
            .run(ProcessCommand::new(self.program).arg("--version"))
            .await;

        match result {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(SetupError::tool_unavailable(
                self.program,
                format!("'{} --version' failed: {}", self.program, output.stderr.trim()),
            )),
            Err(ProcessError::CommandNotFound(_)) => Err(SetupError::tool_unavailable(
                self.program,
                "binary not found on PATH",
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Probe the tool's active authenticated session and return its
    /// identifying value: the account email for `gcloud`, the current
    /// subscription id for `az`.
    pub async fn authenticate(&self) -> Result<String> {
        match self.program {
            "gcloud" => self.gcloud_active_account().await,
            "az" => self.az_subscription().await,
            other => Err(SetupError::tool_unavailable(
                other,
                "no authentication probe for this tool",
            )),
        }
    }

    async fn gcloud_active_account(&self) -> Result<String> {
        let accounts = self
            .invoke_json(["auth", "list", "--filter=status:ACTIVE", "--format=json"])
            .await?;
        accounts
            .as_array()
            .and_then(|list| list.first())
            .and_then(|entry| entry.get("account"))
            .and_then(|a| a.as_str())
            .map(String::from)
            .ok_or_else(|| {
                SetupError::authentication(
                    Provider::CloudOauth,
                    "no active account; run 'gcloud auth login' first",
                )
            })
    }

    async fn az_subscription(&self) -> Result<String> {
        let output = self
            .invoke_unchecked(["account", "show", "-o", "json"])
            .await?;
        if !output.success() {
            return Err(SetupError::authentication(
                Provider::DirectoryTenant,
                "no active session; run 'az login' first",
            ));
        }
        let account: serde_json::Value = serde_json::from_str(output.stdout.trim())
            .map_err(|e| SetupError::external_api(format!("unexpected account output: {e}")))?;
        Ok(account
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    /// Run the tool, requiring a zero exit code.
    pub async fn invoke<I, S>(&self, args: I) -> Result<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let command = ProcessCommand::new(self.program).args(args);
        let display = command.display_line();
        let output = self.runner.run(command).await?;

        if !output.success() {
            return Err(ProcessError::ExitCode {
                command: display,
                code: output.status.code().unwrap_or(-1),
                stderr: output.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(output)
    }

    /// Run the tool and hand back the output even on a non-zero exit.
    /// Idempotency lookups use this: "not found" is a normal answer there,
    /// not a failure.
    pub async fn invoke_unchecked<I, S>(&self, args: I) -> Result<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let command = ProcessCommand::new(self.program).args(args);
        Ok(self.runner.run(command).await?)
    }

    /// Run the tool and parse its stdout as JSON.
    pub async fn invoke_json<I, S>(&self, args: I) -> Result<serde_json::Value>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let output = self.invoke(args).await?;
        let trimmed = output.stdout.trim();
        if trimmed.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(trimmed).map_err(|e| {
            SetupError::from(ProcessError::MalformedOutput {
                command: self.program.to_string(),
                message: format!("expected JSON output: {e}"),
            })
        })
    }
}
