use std::{future::Future, sync::Arc};

use fxhash::FxHashMap;
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::{
    as_the_crow_flies::as_the_crow_flies_matrices,
    cache::{CacheKey, MatricesCache, MemoryCache, canonicalize},
    error::MatrixProviderError,
    graphhopper_api::{
        GRAPHHOPPER_API_KEY_ENV_VAR, GraphHopperMatrixClient, GraphhopperMatrixClientParams,
    },
    travel_matrices::TravelMatrices,
    travel_matrix_provider::TravelMatrixProvider,
};

/// Source of travel distances and times between points (`x = lon`, `y = lat`).
///
/// The returned matrices are indexed in the order of `points`.
pub trait MatrixProvider {
    fn matrix(
        &self,
        points: &[geo_types::Point],
    ) -> impl Future<Output = Result<TravelMatrices, MatrixProviderError>> + Send;
}

/// Cached access to one provider. Concurrent requests for the same set of points
/// share a single fetch.
pub struct TravelMatrixClient<C: MatricesCache = MemoryCache> {
    provider: TravelMatrixProvider,
    graphhopper_client: Option<GraphHopperMatrixClient>,
    cache: C,
    in_flight: Mutex<FxHashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl<C: MatricesCache> TravelMatrixClient<C> {
    /// Reads the GraphHopper key from the environment when that backend is selected.
    pub fn new(provider: TravelMatrixProvider, cache: C) -> Result<Self, MatrixProviderError> {
        Self::with_api_key(
            provider,
            cache,
            std::env::var(GRAPHHOPPER_API_KEY_ENV_VAR).ok(),
        )
    }

    pub fn with_api_key(
        provider: TravelMatrixProvider,
        cache: C,
        api_key: Option<String>,
    ) -> Result<Self, MatrixProviderError> {
        let graphhopper_client = match (&provider, api_key) {
            (TravelMatrixProvider::GraphHopperApi { .. }, Some(api_key))
                if !api_key.is_empty() =>
            {
                Some(GraphHopperMatrixClient::new(
                    GraphhopperMatrixClientParams::new(api_key),
                ))
            }
            (TravelMatrixProvider::GraphHopperApi { .. }, _) => {
                return Err(MatrixProviderError::Configuration(format!(
                    "{} is not set",
                    GRAPHHOPPER_API_KEY_ENV_VAR
                )));
            }
            _ => None,
        };

        Ok(Self {
            provider,
            graphhopper_client,
            cache,
            in_flight: Mutex::new(FxHashMap::default()),
        })
    }

    pub fn provider(&self) -> &TravelMatrixProvider {
        &self.provider
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    async fn fetch_matrix(
        &self,
        points: &[geo_types::Point],
    ) -> Result<TravelMatrices, MatrixProviderError> {
        let matrices = match &self.provider {
            TravelMatrixProvider::GraphHopperApi { gh_profile } => {
                let client = self.graphhopper_client.as_ref().ok_or_else(|| {
                    MatrixProviderError::Configuration(format!(
                        "{} is not set",
                        GRAPHHOPPER_API_KEY_ENV_VAR
                    ))
                })?;
                client.fetch_matrix(points, *gh_profile).await?
            }
            TravelMatrixProvider::AsTheCrowFlies { speed_kmh } => {
                as_the_crow_flies_matrices(points, *speed_kmh)
            }
            TravelMatrixProvider::Custom { matrices } => matrices.clone(),
        };

        if !matrices.is_well_formed() || matrices.num_locations() != points.len() {
            return Err(MatrixProviderError::InvalidMatrix {
                expected: points.len(),
                actual: matrices.num_locations(),
            });
        }

        let (matrices, unreachable) = matrices.sanitized();
        if unreachable > 0 {
            warn!(
                "TravelMatrixClient: {} unreachable pairs replaced by sentinel cost",
                unreachable
            );
        }

        Ok(matrices)
    }
}

impl<C: MatricesCache> MatrixProvider for TravelMatrixClient<C> {
    #[instrument(skip_all, level = "debug", fields(points = points.len()))]
    async fn matrix(
        &self,
        points: &[geo_types::Point],
    ) -> Result<TravelMatrices, MatrixProviderError> {
        let Some(provider_hash) = self.provider.cache_hash() else {
            return self.fetch_matrix(points).await;
        };

        let canonical = canonicalize(points);
        let key = CacheKey::new(provider_hash, &canonical);

        if let Some(matrices) = self.cache.get(&key) {
            return Ok(matrices.reindex(&canonical.order));
        }

        let flight = self
            .in_flight
            .lock()
            .entry(key.clone())
            .or_default()
            .clone();
        let guard = flight.lock().await;

        // filled by another request while this one waited
        let result = match self.cache.get(&key) {
            Some(matrices) => Ok(matrices),
            None => {
                debug!(
                    "TravelMatrixClient: fetching matrix for {} distinct points",
                    canonical.points.len()
                );
                self.fetch_matrix(&canonical.points)
                    .await
                    .inspect(|matrices| self.cache.insert(key.clone(), matrices.clone()))
            }
        };

        self.in_flight.lock().remove(&key);
        drop(guard);

        Ok(result?.reindex(&canonical.order))
    }
}
