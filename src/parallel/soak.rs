//! Many independent sessions over consecutive seeds, each reconciled against its own mutation log.

use std::path::PathBuf;

use rayon::prelude::*;
use rayon::ThreadPoolBuildError;
use serde::Serialize;
use uuid::Uuid;

use crate::config::DrydockConfig;
use crate::mutation::Strategy;
use crate::parallel::pool::WorkerPool;
use crate::session::TestSession;
use crate::verify::reconcile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoakResult {
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    pub edits: usize,
    pub cases: usize,
    pub failed: usize,
    pub exact: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SoakSummary {
    pub sessions: usize,
    pub exact: usize,
    pub inexact: usize,
    pub errors: usize,
    pub results: Vec<SoakResult>,
}

impl SoakSummary {
    pub fn all_exact(&self) -> bool {
        self.exact == self.sessions
    }
}

/// Run `iterations` sessions on seeds `base_seed..base_seed + iterations`. Results keep seed order.
pub fn run_soak(
    config: &DrydockConfig,
    iterations: usize,
    base_seed: u64,
    pool: &WorkerPool,
) -> Result<SoakSummary, ThreadPoolBuildError> {
    let results: Vec<SoakResult> = pool.install(|| {
        (0..iterations)
            .into_par_iter()
            .map(|i| run_one(config, base_seed.wrapping_add(i as u64)))
            .collect()
    })?;

    let exact = results.iter().filter(|r| r.exact).count();
    let errors = results.iter().filter(|r| r.error.is_some()).count();
    Ok(SoakSummary {
        sessions: results.len(),
        exact,
        inexact: results.len() - exact - errors,
        errors,
        results,
    })
}

fn soak_clone_path(config: &DrydockConfig) -> PathBuf {
    let name = format!("drydock-soak-{}.db", Uuid::new_v4());
    match config.randomized_database.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

fn run_one(config: &DrydockConfig, seed: u64) -> SoakResult {
    let failed_result = |error: String| SoakResult {
        seed,
        strategy: None,
        edits: 0,
        cases: 0,
        failed: 0,
        exact: false,
        error: Some(error),
    };

    let session = match TestSession::start_at(config, soak_clone_path(config), seed) {
        Ok(session) => session,
        Err(err) => return failed_result(err.to_string()),
    };
    let report = session.run();
    let mutations = session.mutation_log();
    match reconcile(mutations, session.original(), &report) {
        Ok(outcome) => {
            if !outcome.is_exact() {
                log::warn!(
                    "seed {seed}: {} unexpected, {} missed discrepancies",
                    outcome.unexpected.len(),
                    outcome.missed.len()
                );
            }
            SoakResult {
                seed,
                strategy: Some(mutations.strategy),
                edits: mutations.len(),
                cases: report.outcomes.len(),
                failed: report.failed(),
                exact: outcome.is_exact(),
                error: None,
            }
        }
        Err(err) => failed_result(err.to_string()),
    }
}
