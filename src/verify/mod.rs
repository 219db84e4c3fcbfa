pub mod comparator;
pub mod reconcile;

pub use comparator::{
    enumerate_cases, CheckCase, CheckFailure, CheckOutcome, Comparator, ComparisonReport,
    DatasetSide, Location,
};
pub use reconcile::{expected_locations, reconcile, Reconciliation};
