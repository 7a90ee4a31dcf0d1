//! Model listing command handler.

use anyhow::Result;

use crate::config::ConfigManager;
use crate::llm::ModelKind;
use crate::ui::Style;

/// Prints the known model kinds, marking the configured default.
pub fn print_models() -> Result<()> {
    let config = ConfigManager::new()?.load_or_default()?;
    let default = config
        .repl
        .model
        .as_deref()
        .and_then(|name| ModelKind::from_name(name).ok())
        .unwrap_or(ModelKind::ChatGpt);

    println!("{}", Style::header("Available models"));
    for kind in ModelKind::ALL {
        let marker = if *kind == default {
            format!(" {}", Style::default_marker())
        } else {
            String::new()
        };
        println!(
            "  {}  {}{marker}",
            Style::value(format!("{:10}", kind.key())),
            Style::secondary(kind.info())
        );
    }

    Ok(())
}
