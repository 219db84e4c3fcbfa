//! SQLite-backed ship dataset. One file (or in-memory connection) per dataset.

use std::fmt;
use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction};
use serde::Serialize;

use crate::data::schema::{
    quoted_field_columns, ComponentKind, ComponentParams, ComponentRecord, Field, ShipRecord,
};

const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS weapons (
    weapon TEXT PRIMARY KEY,
    "reload speed" INTEGER,
    "rotational speed" INTEGER,
    diameter INTEGER,
    "power volley" INTEGER,
    count INTEGER
);

CREATE TABLE IF NOT EXISTS hulls (
    hull TEXT PRIMARY KEY,
    armor INTEGER,
    type INTEGER,
    capacity INTEGER
);

CREATE TABLE IF NOT EXISTS engines (
    engine TEXT PRIMARY KEY,
    power INTEGER,
    type INTEGER
);

CREATE TABLE IF NOT EXISTS ships (
    ship TEXT PRIMARY KEY,
    weapon TEXT,
    hull TEXT,
    engine TEXT,
    FOREIGN KEY (weapon) REFERENCES weapons(weapon),
    FOREIGN KEY (hull) REFERENCES hulls(hull),
    FOREIGN KEY (engine) REFERENCES engines(engine)
);
"#;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    /// A descriptor column is not present in the table.
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
    /// A component row exists but one of its fields is NULL.
    NullField {
        table: &'static str,
        column: &'static str,
        id: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::MissingColumn { table, column } => {
                write!(f, "column '{column}' missing from table '{table}'")
            }
            Self::NullField { table, column, id } => {
                write!(f, "'{column}' is NULL for '{id}' in table '{table}'")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Full contents of a dataset, ordered by insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetSnapshot {
    pub weapons: Vec<ComponentRecord>,
    pub hulls: Vec<ComponentRecord>,
    pub engines: Vec<ComponentRecord>,
    pub ships: Vec<ShipRecord>,
}

impl DatasetSnapshot {
    pub fn components(&self, kind: ComponentKind) -> &[ComponentRecord] {
        match kind {
            ComponentKind::Weapon => &self.weapons,
            ComponentKind::Hull => &self.hulls,
            ComponentKind::Engine => &self.engines,
        }
    }

    pub fn component(&self, kind: ComponentKind, id: &str) -> Option<&ComponentRecord> {
        self.components(kind).iter().find(|record| record.id == id)
    }
}

pub struct ShipStore {
    conn: Connection,
}

impl ShipStore {
    /// Open an existing dataset for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Open an existing dataset; any write through this handle fails.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Create a fresh dataset file with empty tables. An existing file at `path` is removed first.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)?;
            log::info!("removed existing database: {}", path.display());
        }
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.create_tables()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.create_tables()?;
        Ok(store)
    }

    pub fn create_tables(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(CREATE_TABLES_SQL)?;
        Ok(())
    }

    /// Start a transaction on this handle; statements issued through the store join it until
    /// it is committed or dropped (rolled back).
    pub fn begin(&self) -> Result<Transaction<'_>, StoreError> {
        Ok(self.conn.unchecked_transaction()?)
    }

    pub fn insert_component(&self, record: &ComponentRecord) -> Result<(), StoreError> {
        let kind = record.kind();
        let values = record.params.values();
        let placeholders = (1..=values.len() + 1)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} (\"{}\", {}) VALUES ({placeholders})",
            kind.table(),
            kind.key_column(),
            quoted_field_columns(kind),
        );
        let mut bound: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(values.len() + 1);
        bound.push(&record.id);
        for (_, value) in &values {
            bound.push(value);
        }
        self.conn.execute(&sql, bound.as_slice())?;
        Ok(())
    }

    pub fn insert_ship(&self, ship: &ShipRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO ships (ship, weapon, hull, engine) VALUES (?1, ?2, ?3, ?4)",
            params![ship.id, ship.weapon, ship.hull, ship.engine],
        )?;
        Ok(())
    }

    /// Ship ids in insertion order.
    pub fn ship_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT ship FROM ships ORDER BY rowid")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Component ids of `kind` in insertion order.
    pub fn component_ids(&self, kind: ComponentKind) -> Result<Vec<String>, StoreError> {
        let sql = format!(
            "SELECT \"{}\" FROM {} ORDER BY rowid",
            kind.key_column(),
            kind.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// The ship's reference for `kind`. None if the ship is unknown or the reference is NULL.
    pub fn ship_reference(
        &self,
        ship: &str,
        kind: ComponentKind,
    ) -> Result<Option<String>, StoreError> {
        let sql = format!("SELECT \"{}\" FROM ships WHERE ship = ?1", kind.key_column());
        let reference = self
            .conn
            .query_row(&sql, params![ship], |row| row.get::<_, Option<String>>(0))
            .optional()?;
        Ok(reference.flatten())
    }

    /// Returns false when no ship with that id exists.
    pub fn set_ship_reference(
        &self,
        ship: &str,
        kind: ComponentKind,
        component: &str,
    ) -> Result<bool, StoreError> {
        let sql = format!("UPDATE ships SET \"{}\" = ?1 WHERE ship = ?2", kind.key_column());
        let changed = self.conn.execute(&sql, params![component, ship])?;
        Ok(changed > 0)
    }

    /// Column names of the kind's table, as declared.
    pub fn table_columns(&self, kind: ComponentKind) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", kind.table()))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Fetch a component's parameters. `Ok(None)` when no row has that id, whatever the state
    /// of the table's columns; schema drift on an existing row (missing column, NULL value) is
    /// reported as the matching [StoreError] variant.
    pub fn component(
        &self,
        kind: ComponentKind,
        id: &str,
    ) -> Result<Option<ComponentParams>, StoreError> {
        let exists = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE \"{}\" = ?1", kind.table(), kind.key_column()),
                params![id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let columns = self.table_columns(kind)?;
        for desc in kind.fields() {
            if !columns.iter().any(|c| c == desc.column()) {
                return Err(StoreError::MissingColumn {
                    table: kind.table(),
                    column: desc.column(),
                });
            }
        }

        let sql = format!(
            "SELECT {} FROM {} WHERE \"{}\" = ?1",
            quoted_field_columns(kind),
            kind.table(),
            kind.key_column()
        );
        let width = kind.fields().len();
        let row = self
            .conn
            .query_row(&sql, params![id], |row| {
                (0..width)
                    .map(|i| row.get::<_, Option<i64>>(i))
                    .collect::<Result<Vec<_>, _>>()
            })
            .optional()?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut values = Vec::with_capacity(width);
        for (desc, value) in kind.fields().iter().zip(row) {
            match value {
                Some(value) => values.push(value),
                None => {
                    return Err(StoreError::NullField {
                        table: kind.table(),
                        column: desc.column(),
                        id: id.to_string(),
                    })
                }
            }
        }
        Ok(ComponentParams::from_values(kind, &values))
    }

    /// Returns false when no component with that id exists.
    pub fn set_component_field(
        &self,
        kind: ComponentKind,
        id: &str,
        field: Field,
        value: i64,
    ) -> Result<bool, StoreError> {
        debug_assert_eq!(field.kind(), kind);
        let sql = format!(
            "UPDATE {} SET \"{}\" = ?1 WHERE \"{}\" = ?2",
            kind.table(),
            field.column(),
            kind.key_column()
        );
        let changed = self.conn.execute(&sql, params![value, id])?;
        Ok(changed > 0)
    }

    pub fn ships(&self) -> Result<Vec<ShipRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT ship, weapon, hull, engine FROM ships ORDER BY rowid")?;
        let ships = stmt
            .query_map([], |row| {
                Ok(ShipRecord {
                    id: row.get(0)?,
                    weapon: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    hull: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    engine: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ships)
    }

    pub fn components(&self, kind: ComponentKind) -> Result<Vec<ComponentRecord>, StoreError> {
        let mut records = Vec::new();
        for id in self.component_ids(kind)? {
            if let Some(params) = self.component(kind, &id)? {
                records.push(ComponentRecord { id, params });
            }
        }
        Ok(records)
    }

    pub fn snapshot(&self) -> Result<DatasetSnapshot, StoreError> {
        Ok(DatasetSnapshot {
            weapons: self.components(ComponentKind::Weapon)?,
            hulls: self.components(ComponentKind::Hull)?,
            engines: self.components(ComponentKind::Engine)?,
            ships: self.ships()?,
        })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{EngineParams, HullParams, WeaponParams};

    fn weapon(id: &str, diameter: i64) -> ComponentRecord {
        ComponentRecord {
            id: id.to_string(),
            params: ComponentParams::Weapon(WeaponParams {
                reload_speed: 1,
                rotational_speed: 2,
                diameter,
                power_volley: 4,
                count: 5,
            }),
        }
    }

    fn seeded_store() -> ShipStore {
        let store = ShipStore::open_in_memory().unwrap();
        store.insert_component(&weapon("Weapon-1", 3)).unwrap();
        store.insert_component(&weapon("Weapon-2", 7)).unwrap();
        store
            .insert_component(&ComponentRecord {
                id: "Hull-1".to_string(),
                params: ComponentParams::Hull(HullParams {
                    armor: 9,
                    hull_type: 2,
                    capacity: 11,
                }),
            })
            .unwrap();
        store
            .insert_component(&ComponentRecord {
                id: "Engine-1".to_string(),
                params: ComponentParams::Engine(EngineParams {
                    power: 6,
                    engine_type: 1,
                }),
            })
            .unwrap();
        store
            .insert_ship(&ShipRecord {
                id: "Ship-1".to_string(),
                weapon: "Weapon-2".to_string(),
                hull: "Hull-1".to_string(),
                engine: "Engine-1".to_string(),
            })
            .unwrap();
        store
    }

    #[test]
    fn component_round_trips_through_descriptor_columns() {
        let store = seeded_store();
        let params = store.component(ComponentKind::Weapon, "Weapon-2").unwrap();
        assert_eq!(params, Some(weapon("Weapon-2", 7).params));
        assert_eq!(store.component(ComponentKind::Weapon, "Weapon-9").unwrap(), None);
    }

    #[test]
    fn references_can_be_read_and_rewritten() {
        let store = seeded_store();
        assert_eq!(
            store.ship_reference("Ship-1", ComponentKind::Weapon).unwrap().as_deref(),
            Some("Weapon-2")
        );
        assert!(store
            .set_ship_reference("Ship-1", ComponentKind::Weapon, "Weapon-1")
            .unwrap());
        assert_eq!(
            store.ship_reference("Ship-1", ComponentKind::Weapon).unwrap().as_deref(),
            Some("Weapon-1")
        );
        assert!(!store
            .set_ship_reference("Ship-404", ComponentKind::Weapon, "Weapon-1")
            .unwrap());
        assert_eq!(store.ship_reference("Ship-404", ComponentKind::Hull).unwrap(), None);
    }

    #[test]
    fn field_update_touches_one_column() {
        let store = seeded_store();
        store
            .set_component_field(ComponentKind::Hull, "Hull-1", Field::HullType, 17)
            .unwrap();
        let params = store.component(ComponentKind::Hull, "Hull-1").unwrap().unwrap();
        assert_eq!(
            params.values(),
            vec![(Field::Armor, 9), (Field::HullType, 17), (Field::Capacity, 11)]
        );
    }

    #[test]
    fn null_field_is_reported_as_drift() {
        let store = seeded_store();
        store
            .connection()
            .execute("UPDATE engines SET power = NULL WHERE engine = 'Engine-1'", [])
            .unwrap();
        match store.component(ComponentKind::Engine, "Engine-1") {
            Err(StoreError::NullField { column, .. }) => assert_eq!(column, "power"),
            other => panic!("expected NullField, got {other:?}"),
        }
    }

    #[test]
    fn dropped_column_is_reported_as_drift() {
        let store = seeded_store();
        store
            .connection()
            .execute_batch("ALTER TABLE hulls DROP COLUMN capacity")
            .unwrap();
        match store.component(ComponentKind::Hull, "Hull-1") {
            Err(StoreError::MissingColumn { table, column }) => {
                assert_eq!(table, "hulls");
                assert_eq!(column, "capacity");
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn absent_row_is_none_even_with_a_dropped_column() {
        let store = seeded_store();
        store
            .connection()
            .execute_batch("ALTER TABLE hulls DROP COLUMN capacity")
            .unwrap();
        assert_eq!(store.component(ComponentKind::Hull, "Hull-9").unwrap(), None);
    }

    #[test]
    fn ids_come_back_in_insertion_order() {
        let store = seeded_store();
        assert_eq!(
            store.component_ids(ComponentKind::Weapon).unwrap(),
            vec!["Weapon-1".to_string(), "Weapon-2".to_string()]
        );
        assert_eq!(store.ship_ids().unwrap(), vec!["Ship-1".to_string()]);
    }

    #[test]
    fn rolled_back_transaction_discards_edits() {
        let store = seeded_store();
        {
            let _tx = store.begin().unwrap();
            store
                .set_ship_reference("Ship-1", ComponentKind::Weapon, "Weapon-1")
                .unwrap();
        }
        assert_eq!(
            store.ship_reference("Ship-1", ComponentKind::Weapon).unwrap().as_deref(),
            Some("Weapon-2")
        );
    }

    #[test]
    fn snapshot_collects_every_table() {
        let snapshot = seeded_store().snapshot().unwrap();
        assert_eq!(snapshot.weapons.len(), 2);
        assert_eq!(snapshot.hulls.len(), 1);
        assert_eq!(snapshot.engines.len(), 1);
        assert_eq!(snapshot.ships[0].weapon, "Weapon-2");
        assert!(snapshot.component(ComponentKind::Weapon, "Weapon-1").is_some());
    }
}
