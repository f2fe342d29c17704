use jiff::civil::Time;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub lat: f64,
    pub lon: f64,

    /// Time of day the location starts accepting visits
    #[serde(default)]
    pub opening_time: Option<Time>,

    #[serde(default)]
    pub closing_time: Option<Time>,

    /// Average time spent on site per visit
    #[serde(default)]
    pub avg_service_minutes: f64,

    #[serde(default)]
    pub name: Option<String>,
}

impl Location {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Location {
            id: id.into(),
            lat,
            lon,
            opening_time: None,
            closing_time: None,
            avg_service_minutes: 0.0,
            name: None,
        }
    }

    pub fn with_opening_hours(mut self, opening: Time, closing: Time) -> Self {
        self.opening_time = Some(opening);
        self.closing_time = Some(closing);
        self
    }

    pub fn with_service_minutes(mut self, minutes: f64) -> Self {
        self.avg_service_minutes = minutes;
        self
    }

    pub fn point(&self) -> geo_types::Point {
        geo_types::Point::new(self.lon, self.lat)
    }

    pub fn service_seconds(&self) -> i64 {
        (self.avg_service_minutes * 60.0).round().max(0.0) as i64
    }
}
