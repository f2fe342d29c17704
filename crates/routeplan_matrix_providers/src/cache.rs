use std::{
    cmp::Ordering,
    time::{Duration, Instant},
};

use fxhash::FxHashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::travel_matrices::TravelMatrices;

/// Identifies a matrix by provider and by the set of points, whatever their order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    provider_hash: u64,
    points: Vec<[u64; 2]>,
}

/// Canonical form of a list of points: distinct points sorted by `(x, y)`.
pub struct CanonicalPoints {
    pub points: Vec<geo_types::Point>,
    /// `order[i]` is the index in `points` of the i-th requested point
    pub order: Vec<usize>,
}

fn compare_points(a: &geo_types::Point, b: &geo_types::Point) -> Ordering {
    a.x().total_cmp(&b.x()).then_with(|| a.y().total_cmp(&b.y()))
}

pub fn canonicalize(points: &[geo_types::Point]) -> CanonicalPoints {
    let mut sorted = points.to_vec();
    sorted.sort_by(compare_points);
    sorted.dedup_by(|a, b| compare_points(a, b) == Ordering::Equal);

    let order = points
        .iter()
        .map(|point| {
            sorted
                .binary_search_by(|candidate| compare_points(candidate, point))
                .unwrap_or_default()
        })
        .collect();

    CanonicalPoints {
        points: sorted,
        order,
    }
}

impl CacheKey {
    /// `provider_hash` comes from `TravelMatrixProvider::cache_hash`.
    pub fn new(provider_hash: u64, canonical: &CanonicalPoints) -> Self {
        CacheKey {
            provider_hash,
            points: canonical
                .points
                .iter()
                .map(|point| [point.x().to_bits(), point.y().to_bits()])
                .collect(),
        }
    }
}

/// Storage for matrices in canonical point order.
pub trait MatricesCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<TravelMatrices>;

    fn insert(&self, key: CacheKey, matrices: TravelMatrices);
}

pub struct NoCache;

impl MatricesCache for NoCache {
    fn get(&self, _key: &CacheKey) -> Option<TravelMatrices> {
        None
    }

    fn insert(&self, _key: CacheKey, _matrices: TravelMatrices) {}
}

#[derive(Clone, Debug)]
pub struct MemoryCacheParams {
    pub ttl: Duration,
    /// `None` keeps every entry until it expires
    pub max_entries: Option<usize>,
}

impl Default for MemoryCacheParams {
    fn default() -> Self {
        MemoryCacheParams {
            ttl: Duration::from_secs(3600),
            max_entries: Some(256),
        }
    }
}

struct CacheEntry {
    matrices: TravelMatrices,
    inserted_at: Instant,
    last_used: u64,
}

#[derive(Default)]
struct MemoryCacheState {
    entries: FxHashMap<CacheKey, CacheEntry>,
    tick: u64,
}

/// In-process cache with a time to live and a least recently used bound.
pub struct MemoryCache {
    params: MemoryCacheParams,
    state: Mutex<MemoryCacheState>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        MemoryCache::new(MemoryCacheParams::default())
    }
}

impl MemoryCache {
    pub fn new(params: MemoryCacheParams) -> Self {
        MemoryCache {
            params,
            state: Mutex::new(MemoryCacheState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) >= self.params.ttl
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<TravelMatrices> {
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;

        match state.entries.get_mut(key) {
            None => {
                debug!("MatricesCache: miss");
                return None;
            }
            Some(entry) if !self.is_expired(entry, now) => {
                entry.last_used = tick;
                debug!("MatricesCache: hit");
                return Some(entry.matrices.clone());
            }
            Some(_) => {}
        }

        debug!("MatricesCache: entry expired");
        state.entries.remove(key);

        None
    }

    fn insert_at(&self, key: CacheKey, matrices: TravelMatrices, now: Instant) {
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;

        state
            .entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < self.params.ttl);

        if let Some(max_entries) = self.params.max_entries {
            while !state.entries.contains_key(&key) && state.entries.len() >= max_entries.max(1) {
                let lru = state
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used)
                    .map(|(lru_key, _)| lru_key.clone());

                match lru {
                    Some(lru) => {
                        debug!("MatricesCache: evicting least recently used entry");
                        state.entries.remove(&lru);
                    }
                    None => break,
                }
            }
        }

        state.entries.insert(
            key,
            CacheEntry {
                matrices,
                inserted_at: now,
                last_used: tick,
            },
        );
    }
}

impl MatricesCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<TravelMatrices> {
        self.get_at(key, Instant::now())
    }

    fn insert(&self, key: CacheKey, matrices: TravelMatrices) {
        self.insert_at(key, matrices, Instant::now());
    }
}
