use fxhash::FxHashMap;

use crate::{
    problem::node_group::GroupIdx,
    solver::{
        insertion::{Insertion, best_route_insertion},
        solution::{
            route::WorkingSolutionRoute, route_id::RouteIdx, working_solution::WorkingSolution,
        },
    },
};

/// Best insertion per (route, route version, group). Infeasible insertions are cached as
/// `None`.
///
/// Versions are only meaningful within the evolution of a single solution, a cache must not
/// be shared between clones that are modified independently.
#[derive(Default)]
pub struct InsertionCache {
    cache: FxHashMap<(RouteIdx, usize, GroupIdx), Option<Insertion>>,
}

impl InsertionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        route_id: RouteIdx,
        version: usize,
        group: GroupIdx,
    ) -> Option<&Option<Insertion>> {
        self.cache.get(&(route_id, version, group))
    }

    pub fn insert(
        &mut self,
        route_id: RouteIdx,
        version: usize,
        group: GroupIdx,
        insertion: Option<Insertion>,
    ) {
        self.cache.insert((route_id, version, group), insertion);
    }

    /// Cached best insertion of `group` in the route, computed on a miss.
    pub fn best_route_insertion(
        &mut self,
        solution: &WorkingSolution,
        route_id: RouteIdx,
        group: GroupIdx,
    ) -> Option<Insertion> {
        let version = solution.route(route_id).version();
        if let Some(cached) = self.get(route_id, version, group) {
            return cached.clone();
        }

        let insertion = best_route_insertion(solution, route_id, group);
        self.insert(route_id, version, group, insertion.clone());
        insertion
    }

    /// Drops the entries of outdated route versions.
    pub fn clear(&mut self, routes: &[WorkingSolutionRoute]) {
        self.cache.retain(|(route_id, version, _), _| {
            routes
                .get(route_id.get())
                .is_some_and(|route| *version == route.version())
        });
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
