use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Message shown while a non-streaming model is working.
pub const THINKING: &str = "Thinking...";

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// A terminal spinner shown while waiting for a whole response.
///
/// Clears itself when dropped.
pub struct Spinner {
    progress_bar: ProgressBar,
}

impl Spinner {
    /// Creates and starts a new spinner with the given message.
    pub fn new(message: &str) -> Self {
        let progress_bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_strings(TICKS)
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        progress_bar.set_style(style);
        progress_bar.set_message(message.to_string());
        progress_bar.enable_steady_tick(Duration::from_millis(80));

        Self { progress_bar }
    }

    pub fn thinking() -> Self {
        Self::new(THINKING)
    }

    /// Stops the spinner and clears it from the terminal.
    pub fn stop(&self) {
        self.progress_bar.finish_and_clear();
    }

    pub fn is_finished(&self) -> bool {
        self.progress_bar.is_finished()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.progress_bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_stop_finishes() {
        let spinner = Spinner::thinking();
        assert!(!spinner.is_finished());
        spinner.stop();
        assert!(spinner.is_finished());
    }
}
