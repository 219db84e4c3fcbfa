//! Typed layout of the ship dataset: component kinds, their field descriptor tables and
//! fixed-shape parameter records. SQL identifiers used by the store come only from here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inclusive integer range a field value is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDomain {
    pub min: i64,
    pub max: i64,
}

impl ValueDomain {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Number of values in the domain (0 when min > max). Saturates at `u64::MAX` for the full
    /// `i64` range.
    pub fn len(&self) -> u64 {
        if self.max < self.min {
            0
        } else {
            self.max.abs_diff(self.min).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ValueDomain {
    fn default() -> Self {
        DEFAULT_VALUE_DOMAIN
    }
}

/// Seed values and mutation values both come from 1..=20 unless configured otherwise.
pub const DEFAULT_VALUE_DOMAIN: ValueDomain = ValueDomain::new(1, 20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Weapon,
    Hull,
    Engine,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 3] = [Self::Weapon, Self::Hull, Self::Engine];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weapon => "weapon",
            Self::Hull => "hull",
            Self::Engine => "engine",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "weapon" | "weapons" => Some(Self::Weapon),
            "hull" | "hulls" => Some(Self::Hull),
            "engine" | "engines" => Some(Self::Engine),
            _ => None,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::Weapon => "weapons",
            Self::Hull => "hulls",
            Self::Engine => "engines",
        }
    }

    /// Primary key column of the component table. Also the referencing column on `ships`.
    pub fn key_column(&self) -> &'static str {
        self.as_str()
    }

    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Weapon => "Weapon",
            Self::Hull => "Hull",
            Self::Engine => "Engine",
        }
    }

    pub fn fields(&self) -> &'static [FieldDescriptor] {
        match self {
            Self::Weapon => &WEAPON_FIELDS,
            Self::Hull => &HULL_FIELDS,
            Self::Engine => &ENGINE_FIELDS,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ReloadSpeed,
    RotationalSpeed,
    Diameter,
    PowerVolley,
    Count,
    Armor,
    HullType,
    Capacity,
    Power,
    EngineType,
}

impl Field {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::ReloadSpeed
            | Self::RotationalSpeed
            | Self::Diameter
            | Self::PowerVolley
            | Self::Count => ComponentKind::Weapon,
            Self::Armor | Self::HullType | Self::Capacity => ComponentKind::Hull,
            Self::Power | Self::EngineType => ComponentKind::Engine,
        }
    }

    /// Column name as stored (may contain spaces; always quoted in SQL).
    pub fn column(&self) -> &'static str {
        match self {
            Self::ReloadSpeed => "reload speed",
            Self::RotationalSpeed => "rotational speed",
            Self::Diameter => "diameter",
            Self::PowerVolley => "power volley",
            Self::Count => "count",
            Self::Armor => "armor",
            Self::HullType | Self::EngineType => "type",
            Self::Capacity => "capacity",
            Self::Power => "power",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub field: Field,
    pub domain: ValueDomain,
}

impl FieldDescriptor {
    const fn new(field: Field) -> Self {
        Self {
            field,
            domain: DEFAULT_VALUE_DOMAIN,
        }
    }

    pub fn column(&self) -> &'static str {
        self.field.column()
    }
}

pub const WEAPON_FIELDS: [FieldDescriptor; 5] = [
    FieldDescriptor::new(Field::ReloadSpeed),
    FieldDescriptor::new(Field::RotationalSpeed),
    FieldDescriptor::new(Field::Diameter),
    FieldDescriptor::new(Field::PowerVolley),
    FieldDescriptor::new(Field::Count),
];

pub const HULL_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::new(Field::Armor),
    FieldDescriptor::new(Field::HullType),
    FieldDescriptor::new(Field::Capacity),
];

pub const ENGINE_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor::new(Field::Power),
    FieldDescriptor::new(Field::EngineType),
];

/// `"a", "b", "c"` for a kind's field columns, in descriptor order.
pub(crate) fn quoted_field_columns(kind: ComponentKind) -> String {
    kind.fields()
        .iter()
        .map(|desc| format!("\"{}\"", desc.column()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponParams {
    pub reload_speed: i64,
    pub rotational_speed: i64,
    pub diameter: i64,
    pub power_volley: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HullParams {
    pub armor: i64,
    #[serde(rename = "type")]
    pub hull_type: i64,
    pub capacity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParams {
    pub power: i64,
    #[serde(rename = "type")]
    pub engine_type: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentParams {
    Weapon(WeaponParams),
    Hull(HullParams),
    Engine(EngineParams),
}

impl ComponentParams {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Weapon(_) => ComponentKind::Weapon,
            Self::Hull(_) => ComponentKind::Hull,
            Self::Engine(_) => ComponentKind::Engine,
        }
    }

    /// Build from values listed in the kind's descriptor order. None if the count is wrong.
    pub fn from_values(kind: ComponentKind, values: &[i64]) -> Option<Self> {
        match (kind, values) {
            (
                ComponentKind::Weapon,
                &[reload_speed, rotational_speed, diameter, power_volley, count],
            ) => Some(Self::Weapon(WeaponParams {
                reload_speed,
                rotational_speed,
                diameter,
                power_volley,
                count,
            })),
            (ComponentKind::Hull, &[armor, hull_type, capacity]) => Some(Self::Hull(HullParams {
                armor,
                hull_type,
                capacity,
            })),
            (ComponentKind::Engine, &[power, engine_type]) => {
                Some(Self::Engine(EngineParams { power, engine_type }))
            }
            _ => None,
        }
    }

    /// Value of `field`, or None when the field belongs to another kind.
    pub fn get(&self, field: Field) -> Option<i64> {
        match (self, field) {
            (Self::Weapon(w), Field::ReloadSpeed) => Some(w.reload_speed),
            (Self::Weapon(w), Field::RotationalSpeed) => Some(w.rotational_speed),
            (Self::Weapon(w), Field::Diameter) => Some(w.diameter),
            (Self::Weapon(w), Field::PowerVolley) => Some(w.power_volley),
            (Self::Weapon(w), Field::Count) => Some(w.count),
            (Self::Hull(h), Field::Armor) => Some(h.armor),
            (Self::Hull(h), Field::HullType) => Some(h.hull_type),
            (Self::Hull(h), Field::Capacity) => Some(h.capacity),
            (Self::Engine(e), Field::Power) => Some(e.power),
            (Self::Engine(e), Field::EngineType) => Some(e.engine_type),
            _ => None,
        }
    }

    /// (field, value) pairs in descriptor order.
    pub fn values(&self) -> Vec<(Field, i64)> {
        self.kind()
            .fields()
            .iter()
            .filter_map(|desc| self.get(desc.field).map(|value| (desc.field, value)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub id: String,
    pub params: ComponentParams,
}

impl ComponentRecord {
    pub fn kind(&self) -> ComponentKind {
        self.params.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipRecord {
    pub id: String,
    pub weapon: String,
    pub hull: String,
    pub engine: String,
}

impl ShipRecord {
    pub fn reference(&self, kind: ComponentKind) -> &str {
        match kind {
            ComponentKind::Weapon => &self.weapon,
            ComponentKind::Hull => &self.hull,
            ComponentKind::Engine => &self.engine,
        }
    }
}

/// `Weapon-3`, `Ship-12`, ... (1-based index).
pub fn component_id(kind: ComponentKind, index: usize) -> String {
    format!("{}-{index}", kind.id_prefix())
}

pub fn ship_id(index: usize) -> String {
    format!("Ship-{index}")
}
