//! Mutation strategies and the log of edits a randomization pass made.

use std::fmt;

use serde::Serialize;

use crate::data::schema::{ComponentKind, Field};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Strategy A: rewrite one component reference per ship.
    ComponentSwap,
    /// Strategy B: rewrite one field on a few components of each kind.
    ParameterChange,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ComponentSwap => "Component Swap (A)",
            Self::ParameterChange => "Parameter Change (B)",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Edit {
    ReferenceSwap {
        ship: String,
        kind: ComponentKind,
        from: String,
        to: String,
    },
    FieldChange {
        kind: ComponentKind,
        component: String,
        field: Field,
        from: i64,
        to: i64,
    },
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceSwap { ship, kind, from, to } => {
                write!(f, "{ship}.{kind}: {from} -> {to}")
            }
            Self::FieldChange {
                component,
                field,
                from,
                to,
                ..
            } => write!(f, "{component}.{field}: {from} -> {to}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationLog {
    pub strategy: Strategy,
    pub edits: Vec<Edit>,
}

impl MutationLog {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            edits: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }
}
