//! Terminal presentation helpers shared by the CLI commands.

use inquire::InquireError;

mod spinner;
mod theme;

pub use spinner::{Spinner, THINKING};
pub use theme::{Palette, Style, parse_color, rule};

/// Check if the inquire error is a user cancellation/interruption.
pub const fn is_prompt_cancelled(err: &InquireError) -> bool {
    matches!(
        err,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

/// Width used for rules, falling back to 80 columns when it cannot be read.
pub fn terminal_width() -> usize {
    let (width, _) = termimad::terminal_size();
    if width == 0 { 80 } else { usize::from(width) }
}
