//! `tilesync config`: view and edit `~/.tilesync/config.ini`.

use clap::Subcommand;
use tilesync::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print a value
    Get {
        /// Key in section.key form (e.g. download.parallel)
        key: String,
    },

    /// Change a value
    Set {
        /// Key in section.key form (e.g. download.parallel)
        key: String,

        value: String,
    },

    /// Print every setting
    List,

    /// Print the config file location
    Path,

    /// Write a default config file if none exists
    Init,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let key = parse_key(&key)?;
            let config = ConfigFile::load().unwrap_or_default();
            println!("{}", display_value(key.get(&config)));
        }
        ConfigCommands::Set { key, value } => {
            let key = parse_key(&key)?;
            let mut config = ConfigFile::load().unwrap_or_default();
            key.set(&mut config, &value)
                .map_err(|e| CliError::Config(e.to_string()))?;
            config.save()?;
            println!("Set {} = {}", key.name(), value);
        }
        ConfigCommands::List => {
            let config = ConfigFile::load().unwrap_or_default();
            let mut section = "";
            for key in ConfigKey::all() {
                let (key_section, name) = key.name().split_once('.').unwrap_or(("", key.name()));
                if key_section != section {
                    if !section.is_empty() {
                        println!();
                    }
                    println!("[{}]", key_section);
                    section = key_section;
                }
                println!("  {} = {}", name, display_value(key.get(&config)));
            }
        }
        ConfigCommands::Path => println!("{}", config_file_path().display()),
        ConfigCommands::Init => {
            let existed = config_file_path().exists();
            let path = ConfigFile::ensure_exists()?;
            if existed {
                println!("Config already exists at {}", path.display());
            } else {
                println!("Wrote default config to {}", path.display());
            }
        }
    }
    Ok(())
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown key '{}'. Run 'tilesync config list' to see available keys.",
            key
        ))
    })
}

fn display_value(value: String) -> String {
    if value.is_empty() {
        "(not set)".to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("download.parallel").unwrap(), ConfigKey::DownloadParallel);
        assert!(matches!(parse_key("nope.key"), Err(CliError::Config(_))));
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(String::new()), "(not set)");
        assert_eq!(display_value("8".to_string()), "8");
    }
}
