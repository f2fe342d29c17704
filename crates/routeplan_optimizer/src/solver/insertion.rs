use smallvec::smallvec;

use crate::{
    problem::{
        node_group::GroupIdx,
        node_layout::{DEPOT, NodeIdx},
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solver::{
        schedule::{Gaps, RouteSchedule, merge_at_gaps},
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

/// A group merged into a route, already evaluated.
#[derive(Clone, Debug)]
pub struct Insertion {
    pub route_id: RouteIdx,
    pub group: GroupIdx,

    /// See [`Gaps`]
    pub gaps: Gaps,

    /// Added distance in meters
    pub delta: f64,

    /// Schedule of the route once the group is inserted
    pub schedule: RouteSchedule,
}

/// Distance added to `route` by inserting `group_nodes` at `gaps`.
pub fn insertion_delta(
    problem: &VehicleRoutingProblem,
    route: &[NodeIdx],
    group_nodes: &[NodeIdx],
    gaps: &[usize],
) -> f64 {
    let mut delta = 0.0;
    let mut start = 0;

    while start < group_nodes.len() {
        let gap = gaps[start];
        let mut end = start;
        while end + 1 < group_nodes.len() && gaps[end + 1] == gap {
            end += 1;
        }

        let before = if gap == 0 { DEPOT } else { route[gap - 1] };
        let after = route.get(gap).copied().unwrap_or(DEPOT);

        delta += problem.distance(before, group_nodes[start]);
        for pair in group_nodes[start..=end].windows(2) {
            delta += problem.distance(pair[0], pair[1]);
        }
        delta += problem.distance(group_nodes[end], after);
        delta -= problem.distance(before, after);

        start = end + 1;
    }

    delta
}

/// Places the first node at `first_gap`, then every following node at the gap adding the
/// least distance.
fn greedy_gaps(
    problem: &VehicleRoutingProblem,
    route: &[NodeIdx],
    group_nodes: &[NodeIdx],
    first_gap: usize,
) -> Gaps {
    let mut gaps: Gaps = smallvec![first_gap];

    for count in 2..=group_nodes.len() {
        let previous = gaps[gaps.len() - 1];
        let mut best_gap = previous;
        let mut best_delta = f64::INFINITY;

        for gap in previous..=route.len() {
            gaps.push(gap);
            let delta = insertion_delta(problem, route, &group_nodes[..count], &gaps);
            gaps.pop();

            if delta < best_delta {
                best_delta = delta;
                best_gap = gap;
            }
        }

        gaps.push(best_gap);
    }

    gaps
}

/// Candidate gaps with their delta, cheapest first.
///
/// Groups of one or two nodes are enumerated exhaustively. Larger groups are tried as a
/// contiguous block and greedily spread from every starting gap.
pub fn candidate_gaps(
    problem: &VehicleRoutingProblem,
    route: &[NodeIdx],
    group_nodes: &[NodeIdx],
) -> Vec<(f64, Gaps)> {
    let len = route.len();
    let mut candidates: Vec<Gaps> = Vec::new();

    match group_nodes.len() {
        0 => {}
        1 => candidates.extend((0..=len).map(|gap| smallvec![gap])),
        2 => {
            for first in 0..=len {
                for second in first..=len {
                    candidates.push(smallvec![first, second]);
                }
            }
        }
        size => {
            for first in 0..=len {
                candidates.push(smallvec![first; size]);
                candidates.push(greedy_gaps(problem, route, group_nodes, first));
            }
        }
    }

    let mut scored = candidates
        .into_iter()
        .map(|gaps| (insertion_delta(problem, route, group_nodes, &gaps), gaps))
        .collect::<Vec<_>>();

    scored.sort_by(|(a_delta, a_gaps), (b_delta, b_gaps)| {
        a_delta.total_cmp(b_delta).then_with(|| a_gaps.cmp(b_gaps))
    });
    scored.dedup_by(|a, b| a.1 == b.1);

    scored
}

/// Cheapest feasible insertion of `group` in the route, `None` when every candidate
/// violates a constraint.
pub fn best_route_insertion(
    solution: &WorkingSolution,
    route_id: RouteIdx,
    group: GroupIdx,
) -> Option<Insertion> {
    let problem = solution.problem();
    let node_group = problem.group(group);
    if !node_group.is_ordered() || node_group.is_empty() {
        return None;
    }

    let route = solution.route(route_id);
    candidate_gaps(problem, route.nodes(), node_group.nodes())
        .into_iter()
        .find_map(|(delta, gaps)| {
            let nodes = merge_at_gaps(route.nodes(), node_group.nodes(), &gaps);
            route.evaluate(problem, &nodes).map(|schedule| Insertion {
                route_id,
                group,
                gaps,
                delta,
                schedule,
            })
        })
}
