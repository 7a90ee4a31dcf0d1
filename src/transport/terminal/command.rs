use inquire::autocompletion::{Autocomplete, Replacement};

use crate::llm::ModelKind;

// Available slash commands: (command, description)
const SLASH_COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show available commands"),
    ("/info", "Describe the loaded model"),
    ("/model", "Load another model: /model <name>"),
    ("/quit", "Exit the REPL"),
    ("/exit", "Exit the REPL"),
];

const MODEL_PREFIX: &str = "/model ";

/// Slash command autocompleter
#[derive(Clone, Default)]
pub struct SlashCommandCompleter;

impl Autocomplete for SlashCommandCompleter {
    fn get_suggestions(&mut self, input: &str) -> Result<Vec<String>, inquire::CustomUserError> {
        if let Some(partial) = input.strip_prefix(MODEL_PREFIX) {
            let suggestions = ModelKind::ALL
                .iter()
                .filter(|kind| kind.key().starts_with(partial.trim()))
                .map(|kind| format!("{MODEL_PREFIX}{}  {}", kind.key(), kind.model_id()))
                .collect();
            return Ok(suggestions);
        }

        if !input.starts_with('/') {
            return Ok(vec![]);
        }

        let suggestions: Vec<String> = SLASH_COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(input))
            .map(|(cmd, desc)| format!("{cmd}  {desc}"))
            .collect();

        Ok(suggestions)
    }

    fn get_completion(
        &mut self,
        _input: &str,
        highlighted_suggestion: Option<String>,
    ) -> Result<Replacement, inquire::CustomUserError> {
        // Suggestions are "<completion>  <description>"
        let replacement = highlighted_suggestion
            .and_then(|s| s.split("  ").next().map(str::to_string));
        Ok(replacement)
    }
}

/// Terminal commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Info,
    Help,
    /// Load another model; `None` when the name is missing.
    Model(Option<String>),
    Quit,
    Unknown(String),
}

/// Input types
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Text(String),
    Command(Command),
    Empty,
}

pub fn parse_input(input: &str) -> Input {
    let input = input.trim();

    if input.is_empty() {
        return Input::Empty;
    }

    if let Some(cmd) = input.strip_prefix('/') {
        return Input::Command(parse_command(cmd));
    }

    // Bare commands
    match input.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["exit" | "quit"] => Input::Command(Command::Quit),
        ["info"] => Input::Command(Command::Info),
        ["help"] => Input::Command(Command::Help),
        ["model", name] => Input::Command(Command::Model(Some((*name).to_string()))),
        _ => Input::Text(input.to_string()),
    }
}

fn parse_command(cmd: &str) -> Command {
    let parts: Vec<&str> = cmd.split_whitespace().collect();

    match parts.as_slice() {
        ["info"] => Command::Info,
        ["help"] => Command::Help,
        ["quit" | "exit" | "q"] => Command::Quit,
        ["model" | "llm"] => Command::Model(None),
        ["model" | "llm", name] => Command::Model(Some((*name).to_string())),
        _ => Command::Unknown(parts.join(" ")),
    }
}
