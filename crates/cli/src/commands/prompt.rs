//! Line-based terminal prompts.

#![allow(clippy::print_stdout)]

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::CliError;

/// Reads answers from standard input, one line each.
pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Show `question` and return the trimmed answer.
    pub async fn ask(&mut self, question: &str) -> Result<String, CliError> {
        print!("{question} ");
        std::io::stdout().flush()?;
        let line = self.lines.next_line().await?.ok_or(CliError::InputClosed)?;
        Ok(line.trim().to_owned())
    }

    /// Like [`Prompt::ask`], with a blank answer as `None`.
    pub async fn ask_optional(&mut self, question: &str) -> Result<Option<String>, CliError> {
        let answer = self.ask(question).await?;
        Ok((!answer.is_empty()).then_some(answer))
    }

    /// Ask until the answer is not blank.
    pub async fn ask_required(&mut self, question: &str) -> Result<String, CliError> {
        loop {
            let answer = self.ask(question).await?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            println!("This field is required.");
        }
    }

    /// Yes/no question, no by default.
    pub async fn confirm(&mut self, question: &str) -> Result<bool, CliError> {
        let answer = self.ask(&format!("{question} [y/N]")).await?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}
