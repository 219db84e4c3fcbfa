//! Test session: clone the original dataset, randomize the clone once, compare, clean up.
//!
//! The clone file is owned by a guard that deletes it when the session goes away, whatever the
//! outcome. Field order matters: the clone's connection is dropped before the guard.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::DrydockConfig;
use crate::data::store::{ShipStore, StoreError};
use crate::mutation::{MutationLog, Randomizer, Rng};
use crate::verify::{enumerate_cases, CheckCase, Comparator, ComparisonReport};

#[derive(Debug)]
pub enum SessionError {
    /// The original dataset does not exist; nothing can be checked.
    MissingOriginal(PathBuf),
    /// The clone path resolves to the original file.
    CloneIsOriginal(PathBuf),
    Clone {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    Store(StoreError),
    Entropy(getrandom::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOriginal(path) => write!(
                f,
                "{} not found. Run `drydock generate` to generate it.",
                path.display()
            ),
            Self::CloneIsOriginal(path) => write!(
                f,
                "randomized database path {} is the original dataset; choose a different one",
                path.display()
            ),
            Self::Clone { from, to, source } => write!(
                f,
                "failed to copy {} to {}: {source}",
                from.display(),
                to.display()
            ),
            Self::Store(err) => write!(f, "{err}"),
            Self::Entropy(err) => write!(f, "failed to draw a random seed: {err}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Deletes the clone file on drop.
#[derive(Debug)]
struct CloneGuard {
    path: PathBuf,
}

impl Drop for CloneGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => log::info!("cleaned up {}", self.path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => log::warn!("failed to remove {}: {err}", self.path.display()),
        }
    }
}

/// Whether `clone` names the same file as `original`, which must exist. A clone path that does
/// not exist yet is resolved through its parent directory.
fn same_file(original: &Path, clone: &Path) -> bool {
    let Ok(original) = fs::canonicalize(original) else {
        return false;
    };
    if let Ok(clone) = fs::canonicalize(clone) {
        return clone == original;
    }
    let Some(name) = clone.file_name() else {
        return false;
    };
    let parent = match clone.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::canonicalize(parent)
        .map(|parent| parent.join(name) == original)
        .unwrap_or(false)
}

pub struct TestSession {
    id: Uuid,
    seed: u64,
    started_at: DateTime<Utc>,
    original_path: PathBuf,
    cases: Vec<CheckCase>,
    log: MutationLog,
    original: ShipStore,
    randomized: ShipStore,
    clone: CloneGuard,
}

impl TestSession {
    /// Clone `config.database` to `config.randomized_database` and randomize the clone.
    /// Uses `config.seed`, or an OS-entropy seed when unset.
    pub fn start(config: &DrydockConfig) -> Result<Self, SessionError> {
        let seed = match config.seed {
            Some(seed) => seed,
            None => Rng::entropy_seed().map_err(SessionError::Entropy)?,
        };
        Self::start_at(config, &config.randomized_database, seed)
    }

    /// Like [TestSession::start] with an explicit clone path and seed.
    pub fn start_at(
        config: &DrydockConfig,
        clone_path: impl AsRef<Path>,
        seed: u64,
    ) -> Result<Self, SessionError> {
        let original_path = config.database.clone();
        if !original_path.is_file() {
            return Err(SessionError::MissingOriginal(original_path));
        }

        let clone_path = clone_path.as_ref().to_path_buf();
        if same_file(&original_path, &clone_path) {
            return Err(SessionError::CloneIsOriginal(clone_path));
        }
        fs::copy(&original_path, &clone_path).map_err(|source| SessionError::Clone {
            from: original_path.clone(),
            to: clone_path.clone(),
            source,
        })?;
        let clone = CloneGuard { path: clone_path };

        let original = ShipStore::open_read_only(&original_path)?;
        let randomized = ShipStore::open(&clone.path)?;
        log::info!(
            "connected to original database: {} and randomized database: {}",
            original_path.display(),
            clone.path.display()
        );

        let cases = enumerate_cases(&original)?;
        let log = Randomizer::new(Rng::new(seed), config.mutation).randomize(&randomized)?;

        Ok(Self {
            id: Uuid::new_v4(),
            seed,
            started_at: Utc::now(),
            original_path,
            cases,
            log,
            original,
            randomized,
            clone,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    pub fn randomized_path(&self) -> &Path {
        &self.clone.path
    }

    /// Cases enumerated from the original before mutation.
    pub fn cases(&self) -> &[CheckCase] {
        &self.cases
    }

    /// What the randomizer did. The comparator never reads this.
    pub fn mutation_log(&self) -> &MutationLog {
        &self.log
    }

    pub fn original(&self) -> &ShipStore {
        &self.original
    }

    pub fn randomized(&self) -> &ShipStore {
        &self.randomized
    }

    pub fn comparator(&self) -> Comparator<'_> {
        Comparator::new(&self.original, &self.randomized)
    }

    pub fn run(&self) -> ComparisonReport {
        self.comparator().check_all(&self.cases)
    }
}
