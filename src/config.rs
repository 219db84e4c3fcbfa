//! Runtime configuration: dataset paths, fixture population and mutation limits.
//!
//! Loaded from YAML (`drydock.yaml` or `$DRYDOCK_CONFIG`); a missing file yields defaults.
//! `DRYDOCK_DB` and `DRYDOCK_SEED` override the file, positional CLI arguments override both.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::schema::{ComponentKind, ValueDomain, DEFAULT_VALUE_DOMAIN};

pub const DEFAULT_CONFIG_PATH: &str = "drydock.yaml";
pub const DEFAULT_DATABASE_PATH: &str = "ship_database.db";
pub const DEFAULT_RANDOMIZED_PATH: &str = "randomized_ship_database.db";

pub const CONFIG_PATH_ENV: &str = "DRYDOCK_CONFIG";
pub const DATABASE_ENV: &str = "DRYDOCK_DB";
pub const SEED_ENV: &str = "DRYDOCK_SEED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Population {
    pub weapons: usize,
    pub hulls: usize,
    pub engines: usize,
    pub ships: usize,
}

impl Default for Population {
    fn default() -> Self {
        Self {
            weapons: 20,
            hulls: 5,
            engines: 6,
            ships: 200,
        }
    }
}

impl Population {
    pub fn of(&self, kind: ComponentKind) -> usize {
        match kind {
            ComponentKind::Weapon => self.weapons,
            ComponentKind::Hull => self.hulls,
            ComponentKind::Engine => self.engines,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub population: Population,
    /// Range every seeded attribute value is drawn from.
    pub values: ValueDomain,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            population: Population::default(),
            values: DEFAULT_VALUE_DOMAIN,
        }
    }
}

/// How many components of each kind a parameter change may touch, and the range new values
/// come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationLimits {
    pub max_weapons: usize,
    pub max_hulls: usize,
    pub max_engines: usize,
    pub values: ValueDomain,
}

impl Default for MutationLimits {
    fn default() -> Self {
        Self {
            max_weapons: 3,
            max_hulls: 2,
            max_engines: 2,
            values: DEFAULT_VALUE_DOMAIN,
        }
    }
}

impl MutationLimits {
    pub fn upper_bound(&self, kind: ComponentKind) -> usize {
        match kind {
            ComponentKind::Weapon => self.max_weapons,
            ComponentKind::Hull => self.max_hulls,
            ComponentKind::Engine => self.max_engines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrydockConfig {
    pub database: PathBuf,
    pub randomized_database: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub fixture: FixtureConfig,
    pub mutation: MutationLimits,
}

impl Default for DrydockConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE_PATH),
            randomized_database: PathBuf::from(DEFAULT_RANDOMIZED_PATH),
            seed: None,
            fixture: FixtureConfig::default(),
            mutation: MutationLimits::default(),
        }
    }
}

impl DrydockConfig {
    /// Point at a different original dataset. The clone keeps its file name but moves next to it;
    /// if that name is the original's own, the clone becomes `randomized_<name>`.
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut clone_name = self
            .randomized_database
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| DEFAULT_RANDOMIZED_PATH.into());
        if let Some(name) = path.file_name().filter(|name| *name == clone_name) {
            clone_name = format!("randomized_{}", name.to_string_lossy()).into();
        }
        self.randomized_database = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(clone_name),
            _ => PathBuf::from(clone_name),
        };
        self.database = path;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(serde_yaml::Error),
    InvalidEnv { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "failed to read config file: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config file: {err}"),
            Self::InvalidEnv { name, value } => write!(f, "invalid {name} '{value}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a YAML config file. Missing keys take their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<DrydockConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(ConfigError::Read)?;
    serde_yaml::from_str(&raw).map_err(ConfigError::Parse)
}

/// Config from `$DRYDOCK_CONFIG` or `drydock.yaml` if present (defaults otherwise),
/// then environment overrides.
pub fn load_effective_config() -> Result<DrydockConfig, ConfigError> {
    let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        DrydockConfig::default()
    };
    apply_env_overrides(
        config,
        env::var(DATABASE_ENV).ok(),
        env::var(SEED_ENV).ok(),
    )
}

fn apply_env_overrides(
    mut config: DrydockConfig,
    database: Option<String>,
    seed: Option<String>,
) -> Result<DrydockConfig, ConfigError> {
    if let Some(database) = database.filter(|value| !value.trim().is_empty()) {
        config = config.with_database(database);
    }
    if let Some(raw) = seed.filter(|value| !value.trim().is_empty()) {
        let seed = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
            name: SEED_ENV,
            value: raw.clone(),
        })?;
        config.seed = Some(seed);
    }
    Ok(config)
}
