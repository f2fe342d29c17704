use rand::{Rng, seq::IndexedRandom};

use crate::{
    problem::node_group::GroupIdx,
    solver::{search_params::RuinParams, solution::working_solution::WorkingSolution},
};

/// Number of groups a ruin removes out of `assigned` groups, 0 when nothing is assigned.
pub fn num_groups_to_remove<R: Rng>(params: &RuinParams, assigned: usize, rng: &mut R) -> usize {
    if assigned == 0 {
        return 0;
    }

    let by_ratio = (assigned as f64 * params.max_ratio).ceil() as usize;
    let max_groups = params.max_groups.min(by_ratio).min(assigned).max(1);
    let min_groups = params.min_groups.clamp(1, max_groups);

    rng.random_range(min_groups..=max_groups)
}

/// Removes randomly chosen groups from their routes, returns them in index order.
pub fn ruin_random<R: Rng>(
    solution: &mut WorkingSolution,
    params: &RuinParams,
    rng: &mut R,
) -> Vec<GroupIdx> {
    let assigned = solution.assigned_groups().collect::<Vec<_>>();
    let count = num_groups_to_remove(params, assigned.len(), rng);

    let mut removed = assigned
        .choose_multiple(rng, count)
        .copied()
        .collect::<Vec<_>>();
    removed.sort_unstable();

    for &group in &removed {
        solution.remove_group(group);
    }

    removed
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::{SeedableRng, rngs::SmallRng};

    use crate::{
        solver::{
            construction::construct_solution,
            search_params::{SearchClock, SearchParams},
            solution::route_id::RouteIdx,
        },
        test_utils::{create_test_problem, delivery, test_locations},
    };

    use super::*;

    #[test]
    fn test_num_groups_bounds() {
        let params = RuinParams {
            min_groups: 2,
            max_groups: 4,
            max_ratio: 0.5,
        };
        let mut rng = SmallRng::seed_from_u64(7);

        for _ in 0..50 {
            let count = num_groups_to_remove(&params, 10, &mut rng);
            assert!((2..=4).contains(&count));
        }
        assert_eq!(num_groups_to_remove(&params, 1, &mut rng), 1);
        assert_eq!(num_groups_to_remove(&params, 0, &mut rng), 0);
    }

    #[test]
    fn test_ruin_random_unassigns_groups() {
        let problem = Arc::new(create_test_problem(
            test_locations(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0)]),
            vec![
                delivery("a", "L0", "L1", 1.0),
                delivery("b", "L0", "L2", 1.0),
                delivery("c", "L0", "L3", 1.0),
            ],
            1,
            10.0,
        ));
        let mut solution =
            construct_solution(problem, &SearchClock::start(&SearchParams::default())).unwrap();
        let params = RuinParams {
            min_groups: 2,
            max_groups: 2,
            max_ratio: 1.0,
        };

        let removed = ruin_random(&mut solution, &params, &mut SmallRng::seed_from_u64(7));

        assert_eq!(removed.len(), 2);
        assert_eq!(solution.unassigned_groups().collect::<Vec<_>>(), removed);
        assert_eq!(solution.route(RouteIdx::new(0)).len(), 1);
    }
}
