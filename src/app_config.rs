//! Configuration file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rawfetch_core::Style;
use rawfetch_core::download::{DEFAULT_PORT, SessionConfig};

/// Values read from the configuration file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Directory downloaded bodies are written to.
    pub output_dir: Option<PathBuf>,
    /// TCP port used for every job.
    pub port: Option<u16>,
    /// Read chunk size in bytes.
    pub chunk_size: Option<usize>,
    /// Session style.
    pub style: Option<Style>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Checks values against the same limits the session enforces.
    pub fn validate(&self) -> Result<()> {
        if self.port == Some(0) {
            bail!("Invalid config value for `port`: 0. Expected range: 1..=65535");
        }
        if let Some(chunk_size) = self.chunk_size {
            SessionConfig::new(self.port.unwrap_or(DEFAULT_PORT), chunk_size)
                .with_context(|| format!("Invalid config value for `chunk_size`: {chunk_size}"))?;
        }
        Ok(())
    }
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "default" => Some(Self::Default),
            "verbose" => Some(Self::Verbose),
            "quiet" => Some(Self::Quiet),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }

    /// Returns the tracing level this setting maps to.
    #[must_use]
    pub fn level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Debug => "trace",
            Self::Quiet => "error",
        }
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/rawfetch/config.toml`
/// 2. `$HOME/.config/rawfetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("rawfetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("rawfetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    env::var_os(name).filter(|value| !value.is_empty())
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = without_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(unquote(value).with_context(invalid)?));
            }
            // Ports are 1..=65535; zero is caught by `validate`.
            "port" => {
                let port = value
                    .parse::<u16>()
                    .with_context(|| format!("Expected a port number, got '{value}'"))
                    .with_context(invalid)?;
                cfg.port = Some(port);
            }
            "chunk_size" => {
                let chunk_size = value
                    .parse::<usize>()
                    .with_context(|| format!("Expected a byte count, got '{value}'"))
                    .with_context(invalid)?;
                cfg.chunk_size = Some(chunk_size);
            }
            "style" => {
                let label = unquote(value).with_context(invalid)?;
                let style = Style::from_label(label).with_context(|| {
                    format!("Invalid `style` value '{label}' on line {line_no}: expected one of: callback, chained, awaiting")
                })?;
                cfg.style = Some(style);
            }
            "verbosity" => {
                let label = unquote(value).with_context(invalid)?;
                let verbosity = VerbositySetting::from_label(label).with_context(|| {
                    format!("Invalid `verbosity` value '{label}' on line {line_no}: expected one of: default, verbose, quiet, debug")
                })?;
                cfg.verbosity = Some(verbosity);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Cuts a trailing `#` comment, ignoring `#` inside double quotes.
fn without_comment(line: &str) -> &str {
    let mut quoted = false;
    let cut = line.char_indices().find_map(|(index, ch)| {
        if ch == '"' {
            quoted = !quoted;
        }
        (ch == '#' && !quoted).then_some(index)
    });
    cut.map_or(line, |index| &line[..index])
}

fn unquote(value: &str) -> Result<&str> {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .context("Expected double-quoted string")
}
