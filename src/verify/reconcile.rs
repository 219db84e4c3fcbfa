//! Cross-check a mutation log against what the comparator reported.
//!
//! The comparator never sees the log. This module derives the locations a log implies and
//! diffs them with the reported ones, so over- or under-mutation shows up as a mismatch.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::data::store::{ShipStore, StoreError};
use crate::mutation::{Edit, MutationLog};
use crate::verify::comparator::{ComparisonReport, Location};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub expected: usize,
    pub reported: usize,
    /// Reported but not implied by any edit.
    pub unexpected: Vec<Location>,
    /// Implied by an edit but not reported.
    pub missed: Vec<Location>,
}

impl Reconciliation {
    pub fn is_exact(&self) -> bool {
        self.unexpected.is_empty() && self.missed.is_empty()
    }
}

/// Locations a strategy-blind comparator must report for `log`, given the original dataset.
///
/// A field edit on a component is seen once per ship that references it, unless that ship's
/// reference for the same kind was itself swapped (the comparator stops at the reference).
pub fn expected_locations(
    log: &MutationLog,
    original: &ShipStore,
) -> Result<BTreeSet<Location>, StoreError> {
    let mut locations = BTreeSet::new();
    let swapped: BTreeSet<Location> = log
        .edits
        .iter()
        .filter_map(|edit| match edit {
            Edit::ReferenceSwap { ship, kind, .. } => Some(Location::Reference {
                ship: ship.clone(),
                kind: *kind,
            }),
            Edit::FieldChange { .. } => None,
        })
        .collect();

    let has_field_edits = log
        .edits
        .iter()
        .any(|edit| matches!(edit, Edit::FieldChange { .. }));
    let ships = if has_field_edits {
        original.ships()?
    } else {
        Vec::new()
    };

    for edit in &log.edits {
        let Edit::FieldChange {
            kind,
            component,
            field,
            ..
        } = edit
        else {
            continue;
        };
        for ship in ships.iter().filter(|ship| ship.reference(*kind) == component.as_str()) {
            let reference = Location::Reference {
                ship: ship.id.clone(),
                kind: *kind,
            };
            if swapped.contains(&reference) {
                continue;
            }
            locations.insert(Location::Field {
                ship: ship.id.clone(),
                component: component.clone(),
                field: *field,
            });
        }
    }

    locations.extend(swapped);
    Ok(locations)
}

pub fn reconcile(
    log: &MutationLog,
    original: &ShipStore,
    report: &ComparisonReport,
) -> Result<Reconciliation, StoreError> {
    let expected = expected_locations(log, original)?;
    let reported: BTreeSet<Location> = report
        .failures()
        .map(|(_, failure)| failure.location())
        .collect();

    Ok(Reconciliation {
        expected: expected.len(),
        reported: reported.len(),
        unexpected: reported.difference(&expected).cloned().collect(),
        missed: expected.difference(&reported).cloned().collect(),
    })
}
