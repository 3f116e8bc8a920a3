use crate::classify::{FileType, TypeOverrides};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// On-disk defaults for scan options, merged under explicit CLI flags.
///
/// Loaded from `~/.config/diskscout/config.toml`; a missing file yields the
/// built-in defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiskscoutConfig {
    /// Substring patterns pruned from every traversal.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Default large-file threshold in bytes when `--min-size` is absent.
    #[serde(default = "default_min_size")]
    pub min_size_bytes: u64,

    /// Skip dot-files and dot-directories.
    #[serde(default)]
    pub skip_hidden: bool,

    /// Skip package internals (.app, .framework, ...).
    #[serde(default = "default_true")]
    pub skip_bundles: bool,

    /// Reassign extensions to a different file type.
    #[serde(default)]
    pub remaps: Vec<ExtensionRemap>,
}

/// Remap a set of extensions to one of the built-in file types.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtensionRemap {
    pub extensions: Vec<String>,
    pub file_type: String,
}

fn default_min_size() -> u64 {
    100 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

impl Default for DiskscoutConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            min_size_bytes: default_min_size(),
            skip_hidden: false,
            skip_bundles: true,
            remaps: Vec::new(),
        }
    }
}

impl DiskscoutConfig {
    /// Load config from a custom path or the default XDG location.
    pub fn load(custom_path: Option<&PathBuf>) -> Result<Self, ConfigError> {
        let path = if let Some(p) = custom_path {
            p.clone()
        } else {
            match Self::default_config_path() {
                Ok(p) => p,
                Err(_) => return Ok(Self::default()),
            }
        };

        if !path.exists() {
            // Only an explicitly requested config file is required to exist.
            if custom_path.is_some() {
                return Err(ConfigError::Io(
                    path.clone(),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
                ));
            }
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(path.clone(), e))?;

        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.clone(), e))
    }

    /// Builds the classifier override table from the configured remaps.
    /// An unrecognized file-type name is a config error, not a silent skip.
    pub fn type_overrides(&self) -> Result<TypeOverrides, ConfigError> {
        let mut pairs = Vec::new();
        for remap in &self.remaps {
            let file_type = FileType::from_name(&remap.file_type)
                .ok_or_else(|| ConfigError::UnknownFileType(remap.file_type.clone()))?;
            for extension in &remap.extensions {
                pairs.push((extension.clone(), file_type));
            }
        }
        Ok(TypeOverrides::from_pairs(pairs))
    }

    /// Default config path: ~/.config/diskscout/config.toml
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("diskscout").join("config.toml"))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    NoConfigDir,
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    UnknownFileType(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoConfigDir => write!(f, "Could not determine config directory"),
            ConfigError::Io(path, e) => {
                write!(f, "Failed to read config at {}: {}", path.display(), e)
            }
            ConfigError::Parse(path, e) => {
                write!(f, "Failed to parse config at {}: {}", path.display(), e)
            }
            ConfigError::UnknownFileType(name) => {
                write!(
                    f,
                    "Unknown file type in remap: {}. Must be video, image, audio, document, archive, application, or other",
                    name
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}
