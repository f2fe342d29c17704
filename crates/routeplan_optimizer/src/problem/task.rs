use jiff::civil::{Date, Time};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Goods are collected at the origin and carried to the destination
    Pickup,
    /// Goods are handed over at the destination
    Delivery,
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    pub origin_id: String,
    pub destination_id: String,

    /// Kilograms
    pub weight: f64,

    /// Cubic meters
    pub volume: f64,

    #[serde(default)]
    pub required_date: Option<Date>,

    #[serde(default)]
    pub window_start: Option<Time>,

    #[serde(default)]
    pub window_end: Option<Time>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        kind: TaskKind,
        origin_id: impl Into<String>,
        destination_id: impl Into<String>,
    ) -> Self {
        Task {
            id: id.into(),
            kind,
            origin_id: origin_id.into(),
            destination_id: destination_id.into(),
            weight: 0.0,
            volume: 0.0,
            required_date: None,
            window_start: None,
            window_end: None,
        }
    }

    pub fn with_load(mut self, weight: f64, volume: f64) -> Self {
        self.weight = weight;
        self.volume = volume;
        self
    }

    pub fn with_window(mut self, start: Time, end: Time) -> Self {
        self.window_start = Some(start);
        self.window_end = Some(end);
        self
    }
}
