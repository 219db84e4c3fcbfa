use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::data::schema::{ComponentKind, ValueDomain};
use crate::data::store::{ShipStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

/// Check a dataset for dangling references, out-of-domain or NULL values and degenerate kinds.
pub fn validate_dataset(
    store: &ShipStore,
    domain: ValueDomain,
) -> Result<ValidationReport, StoreError> {
    let mut report = ValidationReport::default();
    let mut known: Vec<HashSet<String>> = Vec::with_capacity(ComponentKind::ALL.len());

    for kind in ComponentKind::ALL {
        let ids = store.component_ids(kind)?;
        match ids.len() {
            0 => report.push(
                ValidationSeverity::Error,
                kind.table(),
                "no components; ships cannot reference this kind",
            ),
            1 => report.push(
                ValidationSeverity::Warning,
                kind.table(),
                format!(
                    "only '{}' present; component swaps cannot alter {kind} references",
                    ids[0]
                ),
            ),
            _ => {}
        }

        for id in &ids {
            let context = format!("{}[{id}]", kind.table());
            match store.component(kind, id) {
                Ok(Some(params)) => {
                    for (field, value) in params.values() {
                        if !domain.contains(value) {
                            report.push(
                                ValidationSeverity::Error,
                                format!("{context}.{field}"),
                                format!("value {value} outside {}..={}", domain.min, domain.max),
                            );
                        }
                    }
                }
                Ok(None) => {}
                Err(err @ (StoreError::NullField { .. } | StoreError::MissingColumn { .. })) => {
                    report.push(ValidationSeverity::Error, context, err.to_string());
                }
                Err(err) => return Err(err),
            }
        }
        known.push(ids.into_iter().collect());
    }

    let mut referenced: Vec<HashSet<String>> = vec![HashSet::new(); ComponentKind::ALL.len()];
    for ship in store.ships()? {
        for (slot, kind) in ComponentKind::ALL.into_iter().enumerate() {
            let reference = ship.reference(kind);
            if reference.is_empty() {
                report.push(
                    ValidationSeverity::Error,
                    format!("ships[{}].{kind}", ship.id),
                    "missing reference",
                );
            } else if !known[slot].contains(reference) {
                report.push(
                    ValidationSeverity::Error,
                    format!("ships[{}].{kind}", ship.id),
                    format!("'{reference}' does not resolve to a {kind}"),
                );
            } else {
                referenced[slot].insert(reference.to_string());
            }
        }
    }

    for (slot, kind) in ComponentKind::ALL.into_iter().enumerate() {
        let mut unused: Vec<&String> = known[slot].difference(&referenced[slot]).collect();
        if unused.is_empty() {
            continue;
        }
        unused.sort();
        report.push(
            ValidationSeverity::Info,
            kind.table(),
            format!(
                "{} unreferenced: {}",
                unused.len(),
                unused.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
            ),
        );
    }

    Ok(report)
}
