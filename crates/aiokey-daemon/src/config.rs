//! Configuration file loading.
//!
//! TOML is the native format. Files ending in `.yaml` or `.yml` are read as
//! YAML with the same layout, so configs written for earlier YAML-based
//! adapters load unchanged; `~` in `bindings` is an empty slot there.

use std::path::{Path, PathBuf};

use aiokey_core::Config;
use thiserror::Error;

/// Failure to produce a [`Config`] from a file.
#[derive(Error, Debug)]
pub enum LoadError {
    /// File could not be read
    #[error("reading {path}: {source}")]
    Io {
        /// Configuration path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Invalid TOML, unknown fields or a rejected binding
    #[error("parsing {path}: {source}")]
    Parse {
        /// Configuration path
        path: PathBuf,
        /// Parser error, including validation failures
        source: toml::de::Error,
    },

    /// Invalid YAML, unknown fields or a rejected binding
    #[error("parsing {path}: {source}")]
    ParseYaml {
        /// Configuration path
        path: PathBuf,
        /// Parser error, including validation failures
        source: serde_yaml::Error,
    },
}

/// On-disk configuration syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            },
            _ => Self::Toml,
        }
    }
}

/// Read and validate the configuration at `path`.
///
/// `.yaml` and `.yml` files are parsed as YAML, anything else as TOML.
/// Validation problems raised while building the [`Config`] surface as a
/// parse error with the offending location.
pub fn load_config(path: &Path) -> Result<Config, LoadError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.to_owned(), source })?;

    match Format::of(path) {
        Format::Toml => toml::from_str(&text)
            .map_err(|source| LoadError::Parse { path: path.to_owned(), source }),
        Format::Yaml => serde_yaml::from_str(&text)
            .map_err(|source| LoadError::ParseYaml { path: path.to_owned(), source }),
    }
}
