//! Personality listing command handler.

use anyhow::Result;

use crate::config::ConfigManager;
use crate::personality::{DEFAULT_PERSONALITY, PRESETS, sorted_custom_keys};
use crate::ui::Style;

/// Lists preset and custom personalities.
pub fn list_personalities() -> Result<()> {
    let config = ConfigManager::new()?.load_or_default()?;
    let default = config
        .repl
        .personality
        .as_deref()
        .unwrap_or(DEFAULT_PERSONALITY);

    let marker = |key: &str| {
        if key == default {
            format!(" {}", Style::default_marker())
        } else {
            String::new()
        }
    };

    println!("{}", Style::header("Preset personalities"));
    for preset in PRESETS {
        println!(
            "  {}  {}{}",
            Style::value(format!("{:10}", preset.key)),
            Style::secondary(preset.description),
            marker(preset.key)
        );
    }

    if !config.personalities.is_empty() {
        println!();
        println!("{}", Style::header("Custom personalities"));
        for key in sorted_custom_keys(&config.personalities) {
            let personality = &config.personalities[key];
            println!(
                "  {}  {}{}",
                Style::value(format!("{key:10}")),
                Style::secondary(&personality.description),
                marker(key)
            );
            if !personality.memory.is_empty() {
                println!(
                    "  {}  {} {}",
                    " ".repeat(10),
                    Style::label("memory:"),
                    Style::secondary(personality.memory.len())
                );
            }
        }
    }

    Ok(())
}
