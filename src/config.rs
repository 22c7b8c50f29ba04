use crate::analyzer::characteristics::CharacteristicsConfig;
use crate::analyzer::normalizer::NormalizerConfig;
use crate::analyzer::Analyzer;
use crate::compare::ComparisonWeights;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file looked for in the working directory
pub const LOCAL_CONFIG: &str = "earprint.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub characteristics: CharacteristicsConfig,
    #[serde(default)]
    pub comparison: ComparisonWeights,
    #[serde(default)]
    pub library: LibraryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_library_dir")]
    pub dir: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            dir: default_library_dir(),
        }
    }
}

fn default_library_dir() -> PathBuf { PathBuf::from("earprint-library") }

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Analyzer set up with this config's normalizer and characteristics
    pub fn analyzer(&self) -> Analyzer {
        Analyzer::new()
            .with_normalizer(self.normalizer)
            .with_characteristics(self.characteristics)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    Config::from_toml(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Config files tried when none is given, in order
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("earprint").join("config.toml"));
    }
    paths
}

/// The explicit config if given, else the first one found on the search
/// path, else defaults
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    for path in search_paths() {
        if path.is_file() {
            log::info!("Using config {}", path.display());
            return load_config(&path);
        }
    }

    log::debug!("No config file found, using defaults");
    Ok(Config::default())
}
