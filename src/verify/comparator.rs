//! Strategy-blind comparison of an original dataset against its randomized clone.

use std::fmt;

use serde::Serialize;

use crate::data::schema::{ComponentKind, Field};
use crate::data::store::{ShipStore, StoreError};

/// One (ship, component kind) pair to check.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CheckCase {
    pub ship: String,
    pub kind: ComponentKind,
}

impl CheckCase {
    pub fn new(ship: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            ship: ship.into(),
            kind,
        }
    }
}

impl fmt::Display for CheckCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ship, self.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSide {
    Original,
    Randomized,
}

impl fmt::Display for DatasetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => f.write_str("original"),
            Self::Randomized => f.write_str("randomized"),
        }
    }
}

/// Where a discrepancy is attributed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "at", rename_all = "snake_case")]
pub enum Location {
    Reference {
        ship: String,
        kind: ComponentKind,
    },
    Field {
        ship: String,
        component: String,
        field: Field,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum CheckFailure {
    /// The ship has no reference for this kind in at least one dataset.
    UnresolvedReference {
        ship: String,
        kind: ComponentKind,
        original: Option<String>,
        randomized: Option<String>,
    },
    ReferenceMismatch {
        ship: String,
        kind: ComponentKind,
        expected: String,
        actual: String,
    },
    RecordMissing {
        ship: String,
        kind: ComponentKind,
        component: String,
        side: DatasetSide,
    },
    FieldMissing {
        ship: String,
        component: String,
        field: Field,
    },
    FieldMismatch {
        ship: String,
        component: String,
        field: Field,
        expected: i64,
        actual: i64,
    },
    Storage {
        ship: String,
        kind: ComponentKind,
        side: DatasetSide,
        message: String,
    },
}

impl CheckFailure {
    pub fn location(&self) -> Location {
        match self {
            Self::UnresolvedReference { ship, kind, .. }
            | Self::ReferenceMismatch { ship, kind, .. }
            | Self::RecordMissing { ship, kind, .. }
            | Self::Storage { ship, kind, .. } => Location::Reference {
                ship: ship.clone(),
                kind: *kind,
            },
            Self::FieldMissing {
                ship,
                component,
                field,
            }
            | Self::FieldMismatch {
                ship,
                component,
                field,
                ..
            } => Location::Field {
                ship: ship.clone(),
                component: component.clone(),
                field: *field,
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UnresolvedReference { .. } => "unresolved_reference",
            Self::ReferenceMismatch { .. } => "reference_mismatch",
            Self::RecordMissing { .. } => "record_missing",
            Self::FieldMissing { .. } => "field_missing",
            Self::FieldMismatch { .. } => "field_mismatch",
            Self::Storage { .. } => "storage",
        }
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference {
                ship,
                kind,
                original,
                randomized,
            } => write!(
                f,
                "Could not find component IDs for {ship}, component {kind}. \
                 Original: {}, Randomized: {}",
                original.as_deref().unwrap_or("None"),
                randomized.as_deref().unwrap_or("None"),
            ),
            Self::ReferenceMismatch {
                ship,
                expected,
                actual,
                ..
            } => write!(f, "{ship}, {actual}\nexpected {expected}, was {actual}"),
            Self::RecordMissing {
                kind,
                component,
                side: DatasetSide::Original,
                ..
            } => write!(
                f,
                "Could not fetch original parameters for component {component} ({kind})."
            ),
            Self::RecordMissing {
                kind,
                component,
                side: DatasetSide::Randomized,
                ..
            } => write!(
                f,
                "Could not fetch randomized parameters for component {component} ({kind}), \
                 even though original parameters were found. This might indicate a data \
                 integrity issue in the randomized DB."
            ),
            Self::FieldMissing {
                ship,
                component,
                field,
            } => write!(
                f,
                "{ship}, {component}\nParameter '{field}' missing in randomized data for component."
            ),
            Self::FieldMismatch {
                ship,
                component,
                field,
                expected,
                actual,
            } => write!(f, "{ship}, {component}\n{field}: expected {expected}, was {actual}"),
            Self::Storage {
                ship,
                kind,
                side,
                message,
            } => write!(f, "{ship}, {kind}\n{side} dataset error: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub case: CheckCase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<CheckFailure>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonReport {
    pub outcomes: Vec<CheckOutcome>,
}

impl ComparisonReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&CheckCase, &CheckFailure)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.failure.as_ref().map(|failure| (&o.case, failure)))
    }
}

/// Every (ship, kind) pair of the dataset, ships in insertion order, kinds weapon/hull/engine.
pub fn enumerate_cases(store: &ShipStore) -> Result<Vec<CheckCase>, StoreError> {
    let ships = store.ship_ids()?;
    let mut cases = Vec::with_capacity(ships.len() * ComponentKind::ALL.len());
    for ship in ships {
        for kind in ComponentKind::ALL {
            cases.push(CheckCase::new(ship.clone(), kind));
        }
    }
    Ok(cases)
}

pub struct Comparator<'a> {
    original: &'a ShipStore,
    randomized: &'a ShipStore,
}

impl<'a> Comparator<'a> {
    pub fn new(original: &'a ShipStore, randomized: &'a ShipStore) -> Self {
        Self {
            original,
            randomized,
        }
    }

    /// Check one case. `Err` carries the first discrepancy found.
    pub fn check(&self, case: &CheckCase) -> Result<(), CheckFailure> {
        let ship = case.ship.as_str();
        let kind = case.kind;
        let storage = |side: DatasetSide, err: StoreError| CheckFailure::Storage {
            ship: ship.to_string(),
            kind,
            side,
            message: err.to_string(),
        };

        let original_ref = self
            .original
            .ship_reference(ship, kind)
            .map_err(|err| storage(DatasetSide::Original, err))?;
        let randomized_ref = self
            .randomized
            .ship_reference(ship, kind)
            .map_err(|err| storage(DatasetSide::Randomized, err))?;

        let (expected, actual) = match (original_ref, randomized_ref) {
            (Some(expected), Some(actual)) => (expected, actual),
            (original, randomized) => {
                return Err(CheckFailure::UnresolvedReference {
                    ship: ship.to_string(),
                    kind,
                    original,
                    randomized,
                })
            }
        };
        if expected != actual {
            return Err(CheckFailure::ReferenceMismatch {
                ship: ship.to_string(),
                kind,
                expected,
                actual,
            });
        }
        let component = expected;

        let missing = |side: DatasetSide| CheckFailure::RecordMissing {
            ship: ship.to_string(),
            kind,
            component: component.clone(),
            side,
        };
        let original_params = match self.original.component(kind, &component) {
            Ok(Some(params)) => params,
            Ok(None) => return Err(missing(DatasetSide::Original)),
            Err(err) => return Err(storage(DatasetSide::Original, err)),
        };
        let randomized_params = match self.randomized.component(kind, &component) {
            Ok(Some(params)) => params,
            Ok(None) => return Err(missing(DatasetSide::Randomized)),
            Err(
                StoreError::MissingColumn { column, .. } | StoreError::NullField { column, .. },
            ) => {
                let field = kind
                    .fields()
                    .iter()
                    .find(|desc| desc.column() == column)
                    .map(|desc| desc.field);
                return Err(match field {
                    Some(field) => CheckFailure::FieldMissing {
                        ship: ship.to_string(),
                        component: component.clone(),
                        field,
                    },
                    None => missing(DatasetSide::Randomized),
                });
            }
            Err(err) => return Err(storage(DatasetSide::Randomized, err)),
        };

        for (field, expected_value) in original_params.values() {
            let Some(actual_value) = randomized_params.get(field) else {
                return Err(CheckFailure::FieldMissing {
                    ship: ship.to_string(),
                    component: component.clone(),
                    field,
                });
            };
            if expected_value != actual_value {
                return Err(CheckFailure::FieldMismatch {
                    ship: ship.to_string(),
                    component: component.clone(),
                    field,
                    expected: expected_value,
                    actual: actual_value,
                });
            }
        }
        Ok(())
    }

    pub fn check_all(&self, cases: &[CheckCase]) -> ComparisonReport {
        let outcomes = cases
            .iter()
            .map(|case| CheckOutcome {
                case: case.clone(),
                failure: self.check(case).err(),
            })
            .collect();
        ComparisonReport { outcomes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{ComponentParams, ComponentRecord, ShipRecord, WeaponParams};

    fn weapon(id: &str, diameter: i64) -> ComponentRecord {
        ComponentRecord {
            id: id.to_string(),
            params: ComponentParams::Weapon(WeaponParams {
                reload_speed: 5,
                rotational_speed: 6,
                diameter,
                power_volley: 8,
                count: 2,
            }),
        }
    }

    fn pair() -> (ShipStore, ShipStore) {
        let build = || {
            let store = ShipStore::open_in_memory().unwrap();
            store.insert_component(&weapon("Weapon-3", 10)).unwrap();
            store.insert_component(&weapon("Weapon-7", 4)).unwrap();
            store
                .insert_component(&ComponentRecord {
                    id: "Hull-1".to_string(),
                    params: ComponentParams::from_values(ComponentKind::Hull, &[1, 2, 3]).unwrap(),
                })
                .unwrap();
            store
                .insert_component(&ComponentRecord {
                    id: "Engine-1".to_string(),
                    params: ComponentParams::from_values(ComponentKind::Engine, &[4, 5]).unwrap(),
                })
                .unwrap();
            for (ship, weapon) in [("Ship-1", "Weapon-3"), ("Ship-2", "Weapon-7")] {
                store
                    .insert_ship(&ShipRecord {
                        id: ship.to_string(),
                        weapon: weapon.to_string(),
                        hull: "Hull-1".to_string(),
                        engine: "Engine-1".to_string(),
                    })
                    .unwrap();
            }
            store
        };
        (build(), build())
    }

    #[test]
    fn identical_datasets_pass_every_case() {
        let (original, randomized) = pair();
        let cases = enumerate_cases(&original).unwrap();
        assert_eq!(cases.len(), 6);
        let report = Comparator::new(&original, &randomized).check_all(&cases);
        assert_eq!(report.passed(), 6);
        assert_eq!(report.failed(), 0);
    }

    #[test]
    fn swapped_reference_is_reported_with_both_ids() {
        let (original, randomized) = pair();
        randomized
            .set_ship_reference("Ship-1", ComponentKind::Weapon, "Weapon-7")
            .unwrap();
        let failure = Comparator::new(&original, &randomized)
            .check(&CheckCase::new("Ship-1", ComponentKind::Weapon))
            .unwrap_err();
        assert_eq!(failure.to_string(), "Ship-1, Weapon-7\nexpected Weapon-3, was Weapon-7");
        assert_eq!(
            failure.location(),
            Location::Reference {
                ship: "Ship-1".to_string(),
                kind: ComponentKind::Weapon
            }
        );
    }

    #[test]
    fn changed_field_is_reported_with_both_values() {
        let (original, randomized) = pair();
        randomized
            .set_component_field(ComponentKind::Weapon, "Weapon-3", Field::Diameter, 17)
            .unwrap();
        let comparator = Comparator::new(&original, &randomized);
        let failure = comparator
            .check(&CheckCase::new("Ship-1", ComponentKind::Weapon))
            .unwrap_err();
        assert_eq!(failure.to_string(), "Ship-1, Weapon-3\ndiameter: expected 10, was 17");
        assert!(comparator
            .check(&CheckCase::new("Ship-2", ComponentKind::Weapon))
            .is_ok());
    }

    #[test]
    fn missing_record_names_the_side() {
        let (original, randomized) = pair();
        randomized
            .connection()
            .execute("DELETE FROM hulls WHERE hull = 'Hull-1'", [])
            .unwrap();
        let failure = Comparator::new(&original, &randomized)
            .check(&CheckCase::new("Ship-2", ComponentKind::Hull))
            .unwrap_err();
        assert!(matches!(
            failure,
            CheckFailure::RecordMissing {
                side: DatasetSide::Randomized,
                ..
            }
        ));

        let failure = Comparator::new(&randomized, &original)
            .check(&CheckCase::new("Ship-2", ComponentKind::Hull))
            .unwrap_err();
        assert!(matches!(
            failure,
            CheckFailure::RecordMissing {
                side: DatasetSide::Original,
                ..
            }
        ));
    }

    #[test]
    fn missing_record_wins_over_dropped_column() {
        let (original, randomized) = pair();
        randomized
            .connection()
            .execute_batch(
                "DELETE FROM engines WHERE engine = 'Engine-1';
                 ALTER TABLE engines DROP COLUMN type;",
            )
            .unwrap();
        let failure = Comparator::new(&original, &randomized)
            .check(&CheckCase::new("Ship-1", ComponentKind::Engine))
            .unwrap_err();
        assert_eq!(
            failure,
            CheckFailure::RecordMissing {
                ship: "Ship-1".to_string(),
                kind: ComponentKind::Engine,
                component: "Engine-1".to_string(),
                side: DatasetSide::Randomized,
            }
        );
    }

    #[test]
    fn dropped_column_is_field_drift() {
        let (original, randomized) = pair();
        randomized
            .connection()
            .execute_batch("ALTER TABLE engines DROP COLUMN type")
            .unwrap();
        let failure = Comparator::new(&original, &randomized)
            .check(&CheckCase::new("Ship-1", ComponentKind::Engine))
            .unwrap_err();
        assert_eq!(
            failure,
            CheckFailure::FieldMissing {
                ship: "Ship-1".to_string(),
                component: "Engine-1".to_string(),
                field: Field::EngineType,
            }
        );
    }

    #[test]
    fn unknown_ship_is_unresolved() {
        let (original, randomized) = pair();
        let failure = Comparator::new(&original, &randomized)
            .check(&CheckCase::new("Ship-9", ComponentKind::Hull))
            .unwrap_err();
        assert_eq!(failure.label(), "unresolved_reference");
    }

    #[test]
    fn repeated_comparison_is_identical() {
        let (original, randomized) = pair();
        randomized
            .set_ship_reference("Ship-2", ComponentKind::Weapon, "Weapon-3")
            .unwrap();
        let cases = enumerate_cases(&original).unwrap();
        let comparator = Comparator::new(&original, &randomized);
        assert_eq!(comparator.check_all(&cases), comparator.check_all(&cases));
    }
}
