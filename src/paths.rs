//! XDG-style configuration path resolution.
//!
//! XDG conventions are preferred over OS-specific locations so the config
//! file lives in the same place on Linux and macOS.

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "llm-repl";

/// Returns the configuration directory for llm-repl.
///
/// Resolution order:
/// 1. `$XDG_CONFIG_HOME/llm-repl` if `XDG_CONFIG_HOME` is set and non-empty
/// 2. `~/.config/llm-repl` otherwise
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Ok(PathBuf::from(xdg).join(APP_DIR));
    }

    let home = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home.join(".config").join(APP_DIR))
}

/// Returns the path of `config.toml`.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_dir_default() {
        let original = std::env::var("XDG_CONFIG_HOME").ok();
        // SAFETY: serialized test; the variable is restored below
        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };

        let dir = config_dir().unwrap();
        assert!(dir.ends_with(".config/llm-repl"));

        if let Some(val) = original {
            // SAFETY: restoring the original value
            unsafe { std::env::set_var("XDG_CONFIG_HOME", val) };
        }
    }

    #[test]
    #[serial]
    fn test_config_dir_xdg_override() {
        let original = std::env::var("XDG_CONFIG_HOME").ok();
        // SAFETY: serialized test; the variable is restored below
        unsafe { std::env::set_var("XDG_CONFIG_HOME", "/custom/config") };

        assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/config/llm-repl"));
        assert_eq!(
            config_file().unwrap(),
            PathBuf::from("/custom/config/llm-repl/config.toml")
        );

        // SAFETY: restoring the original value
        unsafe {
            match original {
                Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
                None => std::env::remove_var("XDG_CONFIG_HOME"),
            }
        }
    }
}
