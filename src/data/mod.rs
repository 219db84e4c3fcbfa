pub mod generate;
pub mod schema;
pub mod store;
pub mod validate;

pub use generate::{generate_database, populate, GenerationReport};
pub use schema::{
    ComponentKind, ComponentParams, ComponentRecord, EngineParams, Field, FieldDescriptor,
    HullParams, ShipRecord, ValueDomain, WeaponParams, DEFAULT_VALUE_DOMAIN,
};
pub use store::{DatasetSnapshot, ShipStore, StoreError};
pub use validate::{validate_dataset, ValidationDiagnostic, ValidationReport, ValidationSeverity};
