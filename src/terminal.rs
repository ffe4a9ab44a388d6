//! Terminal front end: spinner, live message preview and prompts.

use std::future::Future;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use colored::Colorize;
use crossterm::cursor::{RestorePosition, SavePosition};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use indicatif::ProgressBar;

use crate::suggest::Notifier;
use crate::vcs::InputBox;

/// Ask the user a question and return a trimmed input line.
pub fn prompt_input(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;

    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_string())
}

#[derive(Default)]
struct Preview {
    /// What the terminal currently shows below the saved cursor position.
    shown: String,
    anchored: bool,
}

/// Notifier and commit message box backed by the terminal.
pub struct Terminal {
    spinner: ProgressBar,
    preview: Mutex<Preview>,
}

impl Terminal {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(120));

        Terminal {
            spinner,
            preview: Mutex::new(Preview::default()),
        }
    }

    /// Stop the spinner if nothing was printed yet.
    pub fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }

    fn draw(&self, preview: &mut Preview, value: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();

        if !preview.anchored {
            queue!(out, SavePosition)?;
            preview.anchored = true;
        }

        match value.strip_prefix(preview.shown.as_str()) {
            Some(rest) => out.write_all(rest.as_bytes())?,
            None => {
                queue!(out, RestorePosition, Clear(ClearType::FromCursorDown))?;
                out.write_all(value.as_bytes())?;
            }
        }
        out.flush()?;

        preview.shown.clear();
        preview.shown.push_str(value);
        Ok(())
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBox for Terminal {
    fn set_value(&self, value: &str) {
        self.finish();

        let mut preview = self.preview.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.draw(&mut preview, value) {
            log::warn!("Failed to update the message preview: {e}");
        }
    }
}

#[async_trait]
impl Notifier for Terminal {
    fn error(&self, message: &str) {
        self.finish();
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    async fn confirm_cancel(&self) -> bool {
        let interrupt = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        answer_or_interrupt(read_confirmation(), interrupt).await
    }
}

async fn read_confirmation() -> bool {
    let answer = tokio::task::spawn_blocking(|| {
        prompt_input(&format!("{} Cancel the request? [y/N] ", "Thinking...".bold()))
    })
    .await;

    match answer {
        Ok(Ok(answer)) => matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"),
        Ok(Err(e)) => {
            log::warn!("Failed to read the answer: {e}");
            false
        }
        Err(e) => {
            log::warn!("Prompt task failed: {e}");
            false
        }
    }
}

/// Wait for the typed answer; another Ctrl-C while the prompt is open confirms.
async fn answer_or_interrupt<A, I>(answer: A, interrupt: I) -> bool
where
    A: Future<Output = bool>,
    I: Future<Output = ()>,
{
    tokio::select! {
        confirmed = answer => confirmed,
        () = interrupt => {
            eprintln!();
            log::info!("Interrupted again while asking, cancelling the request");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::{pending, ready};

    use super::*;

    #[tokio::test]
    async fn second_interrupt_confirms_while_the_prompt_waits() {
        assert!(answer_or_interrupt(pending::<bool>(), ready(())).await);
    }

    #[tokio::test]
    async fn typed_answer_decides_without_an_interrupt() {
        assert!(!answer_or_interrupt(ready(false), pending::<()>()).await);
        assert!(answer_or_interrupt(ready(true), pending::<()>()).await);
    }
}
