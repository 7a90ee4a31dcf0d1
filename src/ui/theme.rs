//! Consistent styling utilities for terminal output.
//!
//! Provides color and formatting helpers using owo-colors.

use owo_colors::{AnsiColors, OwoColorize};
use std::fmt::Display;

use crate::config::StyleSettings;
use crate::error::ReplError;

/// Styles for different semantic elements.
pub struct Style;

impl Style {
    /// Style for section headers (e.g., "Available commands")
    pub fn header<T: Display>(text: T) -> String {
        format!("{}", text.bold())
    }

    /// Style for labels/keys
    pub fn label<T: Display>(text: T) -> String {
        format!("{}", text.dimmed())
    }

    /// Style for primary values (e.g., model names)
    pub fn value<T: Display>(text: T) -> String {
        format!("{}", text.cyan())
    }

    /// Style for secondary/supplementary info (e.g., descriptions)
    pub fn secondary<T: Display>(text: T) -> String {
        format!("{}", text.dimmed())
    }

    /// Style for error messages
    pub fn error<T: Display>(text: T) -> String {
        format!("{}", text.red().bold())
    }

    /// Style for commands (e.g., "/info", "/help")
    pub fn command<T: Display>(text: T) -> String {
        format!("{}", text.green())
    }

    /// Style for the default marker
    pub fn default_marker() -> String {
        format!("{}", "(default)".dimmed())
    }

    /// Style for version info
    pub fn version<T: Display>(text: T) -> String {
        format!("{}", text.dimmed())
    }
}

/// Parses a color name such as `green` or `bright black`.
pub fn parse_color(name: &str) -> Result<AnsiColors, ReplError> {
    let normalized = name.trim().to_ascii_lowercase().replace(['_', '-'], " ");
    let color = match normalized.as_str() {
        "black" => AnsiColors::Black,
        "red" => AnsiColors::Red,
        "green" => AnsiColors::Green,
        "yellow" => AnsiColors::Yellow,
        "blue" => AnsiColors::Blue,
        "magenta" => AnsiColors::Magenta,
        "cyan" => AnsiColors::Cyan,
        "white" => AnsiColors::White,
        "default" => AnsiColors::Default,
        "bright black" | "grey" | "gray" => AnsiColors::BrightBlack,
        "bright red" => AnsiColors::BrightRed,
        "bright green" => AnsiColors::BrightGreen,
        "bright yellow" => AnsiColors::BrightYellow,
        "bright blue" => AnsiColors::BrightBlue,
        "bright magenta" => AnsiColors::BrightMagenta,
        "bright cyan" => AnsiColors::BrightCyan,
        "bright white" => AnsiColors::BrightWhite,
        _ => {
            return Err(ReplError::Configuration(format!(
                "unknown color '{name}' in [style]"
            )));
        }
    };
    Ok(color)
}

/// The rule colors of the terminal front end.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub client: AnsiColors,
    pub server: AnsiColors,
    pub error: AnsiColors,
    pub misc: AnsiColors,
}

impl Palette {
    pub fn from_settings(settings: &StyleSettings) -> Result<Self, ReplError> {
        Ok(Self {
            client: parse_color(&settings.client)?,
            server: parse_color(&settings.server)?,
            error: parse_color(&settings.error)?,
            misc: parse_color(&settings.misc)?,
        })
    }
}

/// Builds a horizontal rule `width` columns wide, with an optional centered title.
pub fn rule(title: Option<&str>, color: AnsiColors, width: usize) -> String {
    let width = width.max(8);
    let line = match title {
        None => "─".repeat(width),
        Some(title) => {
            let label = format!(" {title} ");
            let label_width = label.chars().count();
            let remaining = width.saturating_sub(label_width);
            let left = remaining / 2;
            let right = remaining - left;
            format!("{}{label}{}", "─".repeat(left), "─".repeat(right))
        }
    };

    match title {
        Some(_) => format!("{}", line.color(color).bold()),
        None => format!("{}", line.color(color)),
    }
}
