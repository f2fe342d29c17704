use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

define_index_newtype!(VehicleIdx, Vehicle);

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: String,

    /// Kilograms
    pub capacity_weight: f64,

    /// Cubic meters
    pub capacity_volume: f64,

    /// License plate or any display label
    #[serde(default)]
    pub label: Option<String>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, capacity_weight: f64, capacity_volume: f64) -> Self {
        Vehicle {
            id: id.into(),
            capacity_weight,
            capacity_volume,
            label: None,
        }
    }
}
