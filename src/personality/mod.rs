//! Personality management.
//!
//! A personality is the system prompt a model is loaded with, plus optional
//! memory seeds that are replayed into every conversation. Personalities come
//! from three places, checked in order: a path to a standalone TOML file,
//! the built-in presets, and `[personalities.*]` entries in config.toml.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ReplError;

/// A personality description.
///
/// This is also the on-disk format of a standalone personality file:
///
/// ```toml
/// description = "Answers like a pirate"
/// personality = "You are a pirate. Answer every question in pirate speak."
/// memory = ["The user's name is Ann."]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    /// Human-readable description.
    pub description: String,
    /// System prompt text.
    pub personality: String,
    /// Facts seeded into the conversation memory.
    #[serde(default)]
    pub memory: Vec<String>,
}

/// A built-in personality.
#[derive(Debug, Clone)]
pub struct PresetPersonality {
    pub key: &'static str,
    pub description: &'static str,
    pub prompt: &'static str,
}

impl PresetPersonality {
    fn to_personality(&self) -> Personality {
        Personality {
            description: self.description.to_string(),
            personality: self.prompt.to_string(),
            memory: Vec::new(),
        }
    }
}

/// Key of the personality used when none is configured.
pub const DEFAULT_PERSONALITY: &str = "default";

/// All built-in personalities.
pub const PRESETS: &[PresetPersonality] = &[
    PresetPersonality {
        key: "default",
        description: "Helpful and honest assistant",
        prompt: "You are a helpful assistant. \
                 If you do not know the answer to a question, you truthfully say you do not know.",
    },
    PresetPersonality {
        key: "concise",
        description: "Short, direct answers",
        prompt: "You are a helpful assistant. Answer as briefly as possible, \
                 without preamble or repetition of the question.",
    },
    PresetPersonality {
        key: "coder",
        description: "Programming assistant that answers with code",
        prompt: "You are an expert programmer. Prefer answering with code in fenced \
                 markdown blocks tagged with their language, followed by a short explanation.",
    },
];

/// Looks up a preset personality by key.
pub fn get_preset(key: &str) -> Option<&'static PresetPersonality> {
    PRESETS.iter().find(|p| p.key == key)
}

/// Returns custom personality keys sorted alphabetically.
#[allow(clippy::implicit_hasher)]
pub fn sorted_custom_keys(personalities: &HashMap<String, Personality>) -> Vec<&String> {
    let mut keys: Vec<_> = personalities.keys().collect();
    keys.sort();
    keys
}

/// Loads a standalone personality file.
pub fn load_personality_file(path: &Path) -> Result<Personality, PersonalityError> {
    let contents = fs::read_to_string(path).map_err(|e| PersonalityError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    toml::from_str(&contents).map_err(|e| PersonalityError::Invalid {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Resolves a personality key or file path.
#[allow(clippy::implicit_hasher)]
pub fn resolve_personality(
    key: &str,
    custom: &HashMap<String, Personality>,
) -> Result<Personality, PersonalityError> {
    let path = Path::new(key);
    if path.extension().is_some_and(|ext| ext == "toml") {
        return load_personality_file(path);
    }

    if let Some(preset) = get_preset(key) {
        return Ok(preset.to_personality());
    }

    if let Some(personality) = custom.get(key) {
        return Ok(personality.clone());
    }

    let custom_keys: Vec<String> = sorted_custom_keys(custom).into_iter().cloned().collect();
    Err(PersonalityError::NotFound {
        key: key.to_string(),
        custom_keys,
    })
}

/// Personality-related errors.
#[derive(Debug, Clone)]
pub enum PersonalityError {
    /// Personality not found. Contains the key and list of custom keys.
    NotFound {
        key: String,
        custom_keys: Vec<String>,
    },
    /// The personality file could not be read.
    Unreadable { path: String, reason: String },
    /// The personality file is not valid TOML or misses a field.
    Invalid { path: String, reason: String },
}

impl std::fmt::Display for PersonalityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { key, custom_keys } => {
                let mut all_keys: Vec<&str> = PRESETS.iter().map(|p| p.key).collect();
                all_keys.extend(custom_keys.iter().map(String::as_str));
                write!(
                    f,
                    "Personality '{key}' not found\n\nAvailable personalities: {}",
                    all_keys.join(", ")
                )
            }
            Self::Unreadable { path, reason } => {
                write!(f, "Failed to read personality file {path}: {reason}")
            }
            Self::Invalid { path, reason } => {
                write!(f, "Invalid personality file {path}: {reason}")
            }
        }
    }
}

impl std::error::Error for PersonalityError {}

impl From<PersonalityError> for ReplError {
    fn from(err: PersonalityError) -> Self {
        Self::Configuration(err.to_string())
    }
}
