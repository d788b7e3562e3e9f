//! Stdin prompting.

use anyhow::Result;
use std::io::{self, Write};

pub struct ConsolePrompter;

impl Default for ConsolePrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolePrompter {
    pub fn new() -> Self {
        Self
    }

    fn read_line() -> Result<String> {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    pub async fn prompt_yes_no(&self, message: &str) -> Result<bool> {
        print!("{message} [Y/n]: ");
        io::stdout().flush()?;

        let input = Self::read_line()?.to_lowercase();
        Ok(input.is_empty() || input == "y" || input == "yes")
    }

    pub async fn prompt_text(&self, message: &str, default: Option<&str>) -> Result<String> {
        if let Some(default_value) = default {
            print!("{message} [{default_value}]: ");
        } else {
            print!("{message}: ");
        }
        io::stdout().flush()?;

        let input = Self::read_line()?;
        if input.is_empty() {
            if let Some(def) = default {
                return Ok(def.to_string());
            }
        }
        Ok(input)
    }

    pub async fn prompt_secret(&self, message: &str) -> Result<String> {
        // Terminal echo suppression is deliberately not attempted: the tool
        // runs in operator-attended terminals and the value lands in a
        // local credential file anyway.
        print!("{message} (input is stored, not echoed back): ");
        io::stdout().flush()?;
        Self::read_line()
    }
}
