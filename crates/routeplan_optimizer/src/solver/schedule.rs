use fxhash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;

use crate::problem::{
    load::Load,
    node_layout::{DEPOT, NodeIdx},
    time_window::TimeWindow,
    vehicle::VehicleIdx,
    vehicle_routing_problem::{BreakSpec, VehicleRoutingProblem},
};

/// Feasible service start times, in seconds from midnight.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub earliest: i64,
    pub latest: i64,
}

impl Interval {
    pub fn shifted(&self, seconds: i64) -> Interval {
        Interval {
            earliest: self.earliest + seconds,
            latest: self.latest + seconds,
        }
    }
}

/// Where the break is taken along a route.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BreakPlacement {
    /// At the depot, the route starts after the break
    BeforeDeparture,
    /// After the service at a route position, 0 being the start depot
    AfterStop(usize),
    /// At the depot, the route is back before the break
    AfterReturn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledBreak {
    pub placement: BreakPlacement,
    pub start: Interval,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSchedule {
    /// Start depot, every stop, end depot
    pub arrivals: Vec<Interval>,

    /// Load on board after each entry of `arrivals`
    pub loads: Vec<Load>,

    pub scheduled_break: Option<ScheduledBreak>,

    /// Shortest elapsed time between depot departure and return
    pub duration: i64,

    pub distance: f64,
}

impl RouteSchedule {
    pub fn empty(problem: &VehicleRoutingProblem) -> Self {
        let depot = problem.depot_window();
        let at_depot = Interval {
            earliest: depot.start,
            latest: depot.end,
        };

        RouteSchedule {
            arrivals: vec![at_depot, at_depot],
            loads: vec![Load::ZERO, Load::ZERO],
            scheduled_break: None,
            duration: 0,
            distance: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Event {
    window: TimeWindow,
    service: i64,
    /// From the end of the previous event's service
    travel: i64,
}

struct Timing {
    earliest: Vec<i64>,
    latest: Vec<i64>,
    duration: i64,
}

/// Forward and backward time propagation over a sequence of events.
///
/// The departure of the first event is pushed as late as waiting allows before measuring
/// the duration, arrival windows only keep times that belong to a schedule within
/// `max_duration`.
fn propagate(events: &[Event], max_duration: i64) -> Option<Timing> {
    let first = events.first()?;
    let last_index = events.len() - 1;

    if first.window.is_empty() {
        return None;
    }

    let mut starts = Vec::with_capacity(events.len());
    starts.push(first.window.start);

    let mut total_waiting = 0;
    let mut forward_slack = first.window.end - first.window.start;

    for (previous, event) in events.iter().zip(&events[1..]) {
        let ready = starts[starts.len() - 1] + previous.service + event.travel;
        let start = ready.max(event.window.start);
        if start > event.window.end {
            return None;
        }

        total_waiting += start - ready;
        forward_slack = forward_slack.min(total_waiting + event.window.end - start);
        starts.push(start);
    }

    let shift = forward_slack.min(total_waiting);
    let duration = starts[last_index] - (starts[0] + shift);
    if duration > max_duration {
        return None;
    }

    let mut earliest = Vec::with_capacity(events.len());
    earliest.push(starts[0].max(starts[last_index] - max_duration));
    for (previous, event) in events.iter().zip(&events[1..]) {
        let ready = earliest[earliest.len() - 1] + previous.service + event.travel;
        earliest.push(ready.max(event.window.start));
    }

    let backward = |end_bound: i64| {
        let mut latest = vec![0; events.len()];
        latest[last_index] = events[last_index].window.end.min(end_bound);
        for index in (0..last_index).rev() {
            latest[index] = events[index]
                .window
                .end
                .min(latest[index + 1] - events[index + 1].travel - events[index].service);
        }
        latest
    };

    let unbounded = backward(i64::MAX);
    let mut latest = backward(unbounded[0].saturating_add(max_duration));
    for (latest, earliest) in latest.iter_mut().zip(&earliest) {
        *latest = (*latest).max(*earliest);
    }

    Some(Timing {
        earliest,
        latest,
        duration,
    })
}

fn route_events(problem: &VehicleRoutingProblem, nodes: &[NodeIdx]) -> Vec<Event> {
    let depot = problem.node(DEPOT);
    let mut events = Vec::with_capacity(nodes.len() + 3);

    events.push(Event {
        window: depot.window,
        service: depot.service_seconds,
        travel: 0,
    });

    let mut previous = DEPOT;
    for &node_idx in nodes {
        let node = problem.node(node_idx);
        events.push(Event {
            window: node.window,
            service: node.service_seconds,
            travel: problem.travel_time(previous, node_idx),
        });
        previous = node_idx;
    }

    events.push(Event {
        window: depot.window,
        service: 0,
        travel: problem.travel_time(previous, DEPOT),
    });

    events
}

fn placements(num_nodes: usize) -> impl Iterator<Item = BreakPlacement> {
    std::iter::once(BreakPlacement::BeforeDeparture)
        .chain((0..=num_nodes).map(BreakPlacement::AfterStop))
        .chain(std::iter::once(BreakPlacement::AfterReturn))
}

/// Timing of the route with the break at `placement`, break start interval included.
fn timing_with_break(
    events: &[Event],
    spec: BreakSpec,
    placement: BreakPlacement,
    max_duration: i64,
) -> Option<(Timing, Interval)> {
    let mut events = events.to_vec();
    let last_index = events.len() - 1;

    match placement {
        BreakPlacement::BeforeDeparture => {
            let depot = &mut events[0];
            depot.window.start = depot.window.start.max(spec.window.start + spec.duration);
            let timing = propagate(&events, max_duration)?;
            let latest_start = spec.window.end.min(timing.latest[0] - spec.duration);
            let start = Interval {
                earliest: spec.window.start,
                latest: latest_start.max(spec.window.start),
            };
            Some((timing, start))
        }
        BreakPlacement::AfterReturn => {
            let depot = &mut events[last_index];
            depot.window.end = depot.window.end.min(spec.window.end);
            let timing = propagate(&events, max_duration)?;
            let start = Interval {
                earliest: spec.window.start.max(timing.earliest[last_index]),
                latest: spec.window.end,
            };
            Some((timing, start))
        }
        BreakPlacement::AfterStop(position) => {
            events.insert(
                position + 1,
                Event {
                    window: spec.window,
                    service: spec.duration,
                    travel: 0,
                },
            );
            let mut timing = propagate(&events, max_duration)?;
            let start = Interval {
                earliest: timing.earliest.remove(position + 1),
                latest: timing.latest.remove(position + 1),
            };
            Some((timing, start))
        }
    }
}

fn route_loads(
    problem: &VehicleRoutingProblem,
    vehicle: VehicleIdx,
    nodes: &[NodeIdx],
) -> Option<Vec<Load>> {
    let capacity = problem.capacity(vehicle);
    let mut loads = Vec::with_capacity(nodes.len() + 2);

    let mut load: Load = nodes.iter().map(|&node| problem.node(node).start_load).sum();
    loads.push(load);

    for &node in nodes {
        load += problem.node(node).demand;
        loads.push(load);
    }

    load += nodes.iter().map(|&node| problem.node(node).end_load).sum();
    loads.push(load);

    loads.iter().all(|load| load.within(&capacity)).then_some(loads)
}

/// Every origin is visited before its destination when both are in the route.
pub fn respects_precedences(problem: &VehicleRoutingProblem, nodes: &[NodeIdx]) -> bool {
    let positions: FxHashMap<NodeIdx, usize> = nodes
        .iter()
        .enumerate()
        .map(|(position, &node)| (node, position))
        .collect();

    problem.precedences().iter().all(|(origin, destination)| {
        match (positions.get(origin), positions.get(destination)) {
            (Some(origin), Some(destination)) => origin < destination,
            _ => true,
        }
    })
}

/// Checks capacities, time windows, route duration and break for `nodes` served by
/// `vehicle`, returns the schedule of the route when all hold.
///
/// Precedences are not checked here, see [`respects_precedences`].
pub fn evaluate_route(
    problem: &VehicleRoutingProblem,
    vehicle: VehicleIdx,
    nodes: &[NodeIdx],
) -> Option<RouteSchedule> {
    if nodes.is_empty() {
        return Some(RouteSchedule::empty(problem));
    }

    let loads = route_loads(problem, vehicle, nodes)?;
    let events = route_events(problem, nodes);
    let max_duration = problem.max_route_duration();

    // a break only adds constraints
    let timing = propagate(&events, max_duration)?;

    let (timing, scheduled_break) = match problem.break_spec() {
        None => (timing, None),
        Some(spec) => {
            let mut best: Option<(Timing, ScheduledBreak)> = None;
            for placement in placements(nodes.len()) {
                let Some((timing, start)) =
                    timing_with_break(&events, spec, placement, max_duration)
                else {
                    continue;
                };

                let is_better = best.as_ref().is_none_or(|(best_timing, _)| {
                    (timing.duration, timing.earliest[0])
                        < (best_timing.duration, best_timing.earliest[0])
                });
                if is_better {
                    best = Some((timing, ScheduledBreak { placement, start }));
                }
            }

            let (timing, scheduled_break) = best?;
            (timing, Some(scheduled_break))
        }
    };

    let arrivals = timing
        .earliest
        .iter()
        .zip(&timing.latest)
        .map(|(&earliest, &latest)| Interval { earliest, latest })
        .collect();

    Some(RouteSchedule {
        arrivals,
        loads,
        scheduled_break,
        duration: timing.duration,
        distance: problem.route_distance(nodes),
    })
}

/// Positions at which the group nodes are merged into a route: `gaps[i]` is the index of
/// the route node the i-th group node is inserted before (`route.len()` for the end).
pub type Gaps = SmallVec<[usize; 4]>;

/// Route obtained by inserting `group_nodes` at `gaps`, group order kept on equal gaps.
pub fn merge_at_gaps(route: &[NodeIdx], group_nodes: &[NodeIdx], gaps: &[usize]) -> Vec<NodeIdx> {
    let mut merged = Vec::with_capacity(route.len() + group_nodes.len());
    let mut inserted = 0;

    for (position, &node) in route.iter().enumerate() {
        while inserted < group_nodes.len() && gaps[inserted] == position {
            merged.push(group_nodes[inserted]);
            inserted += 1;
        }
        merged.push(node);
    }
    merged.extend_from_slice(&group_nodes[inserted..]);

    merged
}
