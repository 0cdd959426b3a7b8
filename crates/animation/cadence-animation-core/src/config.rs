//! System configuration: processing mode and pool sizing.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How the dispatcher turns scheduler events into property writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// Re-evaluate every active animation on each advanced tick.
    #[default]
    Full,
    /// Write only at start, finish and pause boundaries.
    BoundaryOnly,
}

/// Initial pool capacities. Pools grow past these on demand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityHints {
    pub splines: usize,
    pub data_bindings: usize,
    pub instances: usize,
    pub animations: usize,
}

impl CapacityHints {
    /// Same hint for every entity kind.
    pub const fn uniform(n: usize) -> Self {
        Self {
            splines: n,
            data_bindings: n,
            instances: n,
            animations: n,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub processing: ProcessingMode,
    pub capacity: CapacityHints,
}

impl Config {
    pub fn boundary_only() -> Self {
        Self {
            processing: ProcessingMode::BoundaryOnly,
            ..Self::default()
        }
    }

    /// Parse a config document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
