use std::hash::{Hash, Hasher};

use fxhash::FxHasher64;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{graphhopper_api::GraphHopperProfile, travel_matrices::TravelMatrices};

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum TravelMatrixProvider {
    /// https://docs.graphhopper.com/openapi/map-data-and-routing-profiles/openstreetmap/standard-routing-profiles
    GraphHopperApi { gh_profile: GraphHopperProfile },

    /// Great circle distance, travel time derived from a constant speed
    AsTheCrowFlies { speed_kmh: f64 },

    /// Matrices supplied by the caller, in the order of the requested points
    Custom { matrices: TravelMatrices },
}

impl Default for TravelMatrixProvider {
    fn default() -> Self {
        TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 40.0 }
    }
}

impl TravelMatrixProvider {
    /// Identifies the provider in cache keys. `None` for custom matrices: they are
    /// positional, reordering the points for the cache would scramble them.
    pub fn cache_hash(&self) -> Option<u64> {
        let mut hasher = FxHasher64::default();

        match self {
            TravelMatrixProvider::GraphHopperApi { gh_profile } => {
                hasher.write_u8(0);
                gh_profile.hash(&mut hasher);
            }
            TravelMatrixProvider::AsTheCrowFlies { speed_kmh } => {
                hasher.write_u8(1);
                hasher.write_u64(speed_kmh.to_bits());
            }
            TravelMatrixProvider::Custom { .. } => return None,
        }

        Some(hasher.finish())
    }
}
