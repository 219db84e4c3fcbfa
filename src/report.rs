//! Session summaries (JSON) and per-case outcome export (CSV).

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::mutation::{MutationLog, Strategy};
use crate::session::TestSession;
use crate::verify::{CheckFailure, CheckOutcome, ComparisonReport};

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub seed: u64,
    pub database: String,
    pub strategy: Strategy,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cases: usize,
    pub passed: usize,
    pub failed: usize,
    pub mutation: MutationLog,
    pub outcomes: ComparisonReport,
}

impl SessionSummary {
    pub fn new(session: &TestSession, report: ComparisonReport) -> Self {
        Self {
            session_id: session.id(),
            seed: session.seed(),
            database: session.original_path().display().to_string(),
            strategy: session.mutation_log().strategy,
            started_at: session.started_at(),
            finished_at: Utc::now(),
            cases: report.outcomes.len(),
            passed: report.passed(),
            failed: report.failed(),
            mutation: session.mutation_log().clone(),
            outcomes: report,
        }
    }
}

#[derive(Debug)]
pub enum ExportError {
    Csv(csv::Error),
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(err) => write!(f, "failed to write csv: {err}"),
            Self::Io(err) => write!(f, "failed to flush csv: {err}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Flat row per case. Columns that do not apply to a failure kind stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeRow {
    pub ship: String,
    pub kind: String,
    pub status: &'static str,
    pub failure: String,
    pub component: String,
    pub field: String,
    pub expected: String,
    pub actual: String,
    pub message: String,
}

impl From<&CheckOutcome> for OutcomeRow {
    fn from(outcome: &CheckOutcome) -> Self {
        let mut row = OutcomeRow {
            ship: outcome.case.ship.clone(),
            kind: outcome.case.kind.to_string(),
            status: if outcome.passed() { "passed" } else { "failed" },
            ..OutcomeRow::default()
        };
        let Some(failure) = &outcome.failure else {
            return row;
        };
        row.failure = failure.label().to_string();
        row.message = failure.to_string().replace('\n', " | ");
        match failure {
            CheckFailure::ReferenceMismatch {
                expected, actual, ..
            } => {
                row.expected = expected.clone();
                row.actual = actual.clone();
            }
            CheckFailure::RecordMissing { component, .. } => {
                row.component = component.clone();
            }
            CheckFailure::FieldMissing {
                component, field, ..
            } => {
                row.component = component.clone();
                row.field = field.to_string();
            }
            CheckFailure::FieldMismatch {
                component,
                field,
                expected,
                actual,
                ..
            } => {
                row.component = component.clone();
                row.field = field.to_string();
                row.expected = expected.to_string();
                row.actual = actual.to_string();
            }
            CheckFailure::UnresolvedReference {
                original,
                randomized,
                ..
            } => {
                row.expected = original.clone().unwrap_or_default();
                row.actual = randomized.clone().unwrap_or_default();
            }
            CheckFailure::Storage { .. } => {}
        }
        row
    }
}

pub fn write_outcomes_csv<W: std::io::Write>(
    report: &ComparisonReport,
    writer: W,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for outcome in &report.outcomes {
        csv_writer.serialize(OutcomeRow::from(outcome))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_outcomes_csv(
    report: &ComparisonReport,
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_outcomes_csv(report, file)
}
