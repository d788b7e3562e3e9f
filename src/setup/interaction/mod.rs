//! Operator interaction for provisioning runs.
//!
//! Prompting and progress display sit behind one trait so non-interactive
//! runs and tests can supply canned answers instead of blocking on stdin.

pub mod display;
pub mod prompts;

pub use display::ConsoleDisplay;
pub use prompts::ConsolePrompter;

use anyhow::Result;
use async_trait::async_trait;

/// Side-effecting operator interaction, injected into the orchestrator and
/// the manual fallback advisor.
#[async_trait]
pub trait UserInteraction: Send + Sync {
    /// Yes/no confirmation, defaulting to yes on empty input.
    async fn prompt_yes_no(&self, message: &str) -> Result<bool>;

    /// Free-text input with an optional default.
    async fn prompt_text(&self, message: &str, default: Option<&str>) -> Result<String>;

    /// Text input whose value must never be echoed back in later output.
    async fn prompt_secret(&self, message: &str) -> Result<String>;

    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
    fn progress(&self, message: &str);
    fn success(&self, message: &str);

    /// Render a numbered instruction list with trailing reference URLs.
    fn instructions(&self, title: &str, steps: &[String], reference_urls: &[String]) {
        self.info(title);
        for (i, step) in steps.iter().enumerate() {
            self.info(&format!("  {}. {}", i + 1, step));
        }
        for url in reference_urls {
            self.info(&format!("  see: {url}"));
        }
    }
}

/// Production implementation: stdin prompts, emoji-prefixed console lines.
pub struct ConsoleInteraction {
    prompter: ConsolePrompter,
    display: ConsoleDisplay,
}

impl Default for ConsoleInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleInteraction {
    pub fn new() -> Self {
        Self {
            prompter: ConsolePrompter::new(),
            display: ConsoleDisplay::new(),
        }
    }
}

#[async_trait]
impl UserInteraction for ConsoleInteraction {
    async fn prompt_yes_no(&self, message: &str) -> Result<bool> {
        self.prompter.prompt_yes_no(message).await
    }

    async fn prompt_text(&self, message: &str, default: Option<&str>) -> Result<String> {
        self.prompter.prompt_text(message, default).await
    }

    async fn prompt_secret(&self, message: &str) -> Result<String> {
        self.prompter.prompt_secret(message).await
    }

    fn info(&self, message: &str) {
        self.display.info(message);
    }

    fn warning(&self, message: &str) {
        self.display.warning(message);
    }

    fn error(&self, message: &str) {
        self.display.error(message);
    }

    fn progress(&self, message: &str) {
        self.display.progress(message);
    }

    fn success(&self, message: &str) {
        self.display.success(message);
    }
}

/// Scriptable interaction for tests: queued answers, recorded messages.
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockInteraction {
        yes_no_answers: Mutex<VecDeque<bool>>,
        text_answers: Mutex<VecDeque<String>>,
        pub messages: Mutex<Vec<String>>,
    }

    impl MockInteraction {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_yes_no(&self, answer: bool) {
            self.yes_no_answers.lock().unwrap().push_back(answer);
        }

        pub fn push_text(&self, answer: &str) {
            self.text_answers
                .lock()
                .unwrap()
                .push_back(answer.to_string());
        }

        pub fn recorded_messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserInteraction for MockInteraction {
        async fn prompt_yes_no(&self, message: &str) -> Result<bool> {
            self.messages
                .lock()
                .unwrap()
                .push(format!("PROMPT: {message}"));
            self.yes_no_answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no queued yes/no answer for: {message}"))
        }

        async fn prompt_text(&self, message: &str, default: Option<&str>) -> Result<String> {
            self.messages
                .lock()
                .unwrap()
                .push(format!("TEXT: {message}"));
            let answer = self
                .text_answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no queued text answer for: {message}"))?;
            if answer.is_empty() {
                if let Some(def) = default {
                    return Ok(def.to_string());
                }
            }
            Ok(answer)
        }

        async fn prompt_secret(&self, message: &str) -> Result<String> {
            self.messages
                .lock()
                .unwrap()
                .push(format!("SECRET: {message}"));
            self.text_answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no queued secret answer for: {message}"))
        }

        fn info(&self, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push(format!("INFO: {message}"));
        }

        fn warning(&self, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push(format!("WARN: {message}"));
        }

        fn error(&self, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push(format!("ERROR: {message}"));
        }

        fn progress(&self, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push(format!("PROGRESS: {message}"));
        }

        fn success(&self, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push(format!("SUCCESS: {message}"));
        }
    }
}
