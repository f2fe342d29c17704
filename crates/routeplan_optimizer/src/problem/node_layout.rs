use fxhash::{FxHashMap, FxHashSet};
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, instrument, warn};

use crate::{
    define_index_newtype,
    error::DataError,
    problem::{
        load::Load,
        location::Location,
        planning_params::PlanningParams,
        task::{Task, TaskKind},
        time_window::{SECONDS_PER_DAY, TimeWindow, seconds_from_midnight},
        vehicle::Vehicle,
    },
};

define_index_newtype!(NodeIdx, Node);
define_index_newtype!(TaskIdx, Task);

pub const DEPOT: NodeIdx = NodeIdx::new(0);

/// Side of a task served at a node.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskRole {
    /// The node is the origin of the task
    Pickup,
    /// The node is the destination of the task
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTask {
    pub task: TaskIdx,
    pub role: TaskRole,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub location_id: String,
    pub name: Option<String>,
    pub point: geo_types::Point,
    pub window: TimeWindow,
    pub service_seconds: i64,

    /// Load change when the node is visited
    pub demand: Load,

    /// Load taken on board at the depot when the node is part of a route
    pub start_load: Load,

    /// Load change on return to the depot when the node is part of a route
    pub end_load: Load,

    pub tasks: SmallVec<[NodeTask; 2]>,
}

impl Node {
    fn new(location: &Location, window: TimeWindow) -> Self {
        Node {
            location_id: location.id.clone(),
            name: location.name.clone(),
            point: location.point(),
            window,
            service_seconds: location.service_seconds(),
            demand: Load::ZERO,
            start_load: Load::ZERO,
            end_load: Load::ZERO,
            tasks: SmallVec::new(),
        }
    }

    pub fn has_pickup(&self) -> bool {
        self.tasks.iter().any(|task| task.role == TaskRole::Pickup)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskNodes {
    pub origin: NodeIdx,
    pub destination: NodeIdx,
}

/// Normalized view of a planning request: node 0 is the depot, every other node is a
/// distinct location referenced by at least one task.
#[derive(Debug, Clone)]
pub struct NodeLayout {
    nodes: Vec<Node>,
    tasks: Vec<Task>,
    task_nodes: Vec<TaskNodes>,
    capacities: Vec<Load>,
}

fn check_quantity(id: &str, field: &'static str, value: f64) -> Result<(), DataError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(DataError::InvalidQuantity {
            id: id.to_owned(),
            field,
            value,
        })
    }
}

fn task_window(task: &Task) -> Result<Option<TimeWindow>, DataError> {
    if task.window_start.is_none() && task.window_end.is_none() {
        return Ok(None);
    }

    let window = TimeWindow::new(
        task.window_start.map_or(0, seconds_from_midnight),
        task.window_end.map_or(SECONDS_PER_DAY, seconds_from_midnight),
    );

    if window.is_empty() {
        return Err(DataError::EmptyTimeWindow(task.id.clone()));
    }

    Ok(Some(window))
}

impl NodeLayout {
    #[instrument(skip_all, level = "debug")]
    pub fn build(
        depot_id: &str,
        tasks: &[Task],
        vehicles: &[Vehicle],
        locations: &[Location],
        params: &PlanningParams,
    ) -> Result<NodeLayout, DataError> {
        if vehicles.is_empty() {
            return Err(DataError::NoVehicles);
        }

        if let Some(rule) = &params.break_rule {
            if rule.window_end < rule.window_start || rule.duration.is_negative() {
                return Err(DataError::InvalidBreakRule {
                    window_start: rule.window_start,
                    window_end: rule.window_end,
                    duration: rule.duration,
                });
            }
        }

        let capacities = vehicles
            .iter()
            .map(|vehicle| {
                check_quantity(&vehicle.id, "capacity_weight", vehicle.capacity_weight)?;
                check_quantity(&vehicle.id, "capacity_volume", vehicle.capacity_volume)?;
                Ok(Load::from_kg_m3(
                    vehicle.capacity_weight,
                    vehicle.capacity_volume,
                ))
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        let mut locations_by_id: FxHashMap<&str, &Location> = FxHashMap::default();
        for location in locations {
            locations_by_id.entry(location.id.as_str()).or_insert(location);
        }

        let lookup = |location_id: &str, referenced_by: &str| {
            locations_by_id
                .get(location_id)
                .copied()
                .ok_or_else(|| DataError::UnknownLocation {
                    location_id: location_id.to_owned(),
                    referenced_by: referenced_by.to_owned(),
                })
        };

        let depot = lookup(depot_id, "depot")?;
        let mut nodes = vec![Node::new(depot, params.depot_window())];
        let mut node_by_location: FxHashMap<&str, NodeIdx> = FxHashMap::default();
        node_by_location.insert(depot.id.as_str(), DEPOT);

        let mut task_ids: FxHashSet<&str> = FxHashSet::default();
        let mut task_nodes = Vec::with_capacity(tasks.len());

        for task in tasks {
            if !task_ids.insert(task.id.as_str()) {
                return Err(DataError::DuplicateTask(task.id.clone()));
            }

            check_quantity(&task.id, "weight", task.weight)?;
            check_quantity(&task.id, "volume", task.volume)?;

            if let (Some(required_date), Some(planned_date)) =
                (task.required_date, params.planned_date)
                && required_date != planned_date
            {
                return Err(DataError::DateMismatch {
                    task_id: task.id.clone(),
                    required_date,
                    planned_date,
                });
            }

            let mut node_of = |location_id: &str| -> Result<NodeIdx, DataError> {
                if let Some(&node) = node_by_location.get(location_id) {
                    return Ok(node);
                }

                let location = lookup(location_id, &task.id)?;
                if let (Some(opening), Some(closing)) =
                    (location.opening_time, location.closing_time)
                    && closing < opening
                {
                    warn!(
                        "Location {} closes before it opens, using the full day",
                        location.id
                    );
                }
                let window =
                    TimeWindow::from_opening_hours(location.opening_time, location.closing_time);

                let node = NodeIdx::new(nodes.len());
                nodes.push(Node::new(location, window));
                node_by_location.insert(location.id.as_str(), node);
                Ok(node)
            };

            let origin = node_of(&task.origin_id)?;
            let destination = node_of(&task.destination_id)?;

            if origin == DEPOT && destination == DEPOT {
                return Err(DataError::DepotOnlyTask(task.id.clone()));
            }

            task_nodes.push(TaskNodes {
                origin,
                destination,
            });
        }

        if nodes.len() < 2 {
            return Err(DataError::NotEnoughLocations(nodes.len()));
        }

        let mut layout = NodeLayout {
            nodes,
            tasks: tasks.to_vec(),
            task_nodes,
            capacities,
        };

        layout.apply_tasks()?;

        debug!(
            "Built layout with {} nodes for {} tasks",
            layout.nodes.len(),
            layout.tasks.len()
        );

        Ok(layout)
    }

    /// Records demands, task attribution and delivery windows on the nodes.
    fn apply_tasks(&mut self) -> Result<(), DataError> {
        for (index, task) in self.tasks.iter().enumerate() {
            let task_idx = TaskIdx::new(index);
            let TaskNodes {
                origin,
                destination,
            } = self.task_nodes[index];
            let load = Load::from_kg_m3(task.weight, task.volume);

            match task.kind {
                TaskKind::Delivery => {
                    if destination == DEPOT {
                        self.nodes[origin].end_load += load;
                    } else {
                        self.nodes[destination].demand += load;
                    }
                }
                TaskKind::Pickup => {
                    if origin == DEPOT {
                        self.nodes[destination].start_load += load;
                    } else {
                        self.nodes[origin].demand += load;
                    }

                    if destination == DEPOT {
                        self.nodes[origin].end_load -= load;
                    } else {
                        self.nodes[destination].demand -= load;
                    }
                }
            }

            self.nodes[origin].tasks.push(NodeTask {
                task: task_idx,
                role: TaskRole::Pickup,
            });
            self.nodes[destination].tasks.push(NodeTask {
                task: task_idx,
                role: TaskRole::Delivery,
            });

            if let Some(window) = task_window(task)? {
                if destination == DEPOT {
                    debug!("Ignoring delivery window of task {}, it ends at the depot", task.id);
                    continue;
                }

                let node = &mut self.nodes[destination];
                node.window = node
                    .window
                    .intersection(&window)
                    .ok_or_else(|| DataError::EmptyTimeWindow(task.id.clone()))?;
            }
        }

        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, node: NodeIdx) -> &Node {
        &self.nodes[node]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task: TaskIdx) -> &Task {
        &self.tasks[task]
    }

    pub fn task_nodes(&self, task: TaskIdx) -> TaskNodes {
        self.task_nodes[task.get()]
    }

    /// `(origin, destination)` node of every task, in task order.
    pub fn pickup_delivery_pairs(&self) -> impl Iterator<Item = (NodeIdx, NodeIdx)> + '_ {
        self.task_nodes
            .iter()
            .map(|nodes| (nodes.origin, nodes.destination))
    }

    pub fn capacities(&self) -> &[Load] {
        &self.capacities
    }

    pub fn points(&self) -> Vec<geo_types::Point> {
        self.nodes.iter().map(|node| node.point).collect()
    }
}

#[cfg(test)]
mod tests {
    use jiff::{
        SignedDuration,
        civil::{date, time},
    };

    use crate::{
        problem::planning_params::BreakRule,
        test_utils::{delivery, pickup, test_locations, test_vehicles},
    };

    use super::*;

    #[test]
    fn test_nodes_in_first_seen_order() {
        let locations = test_locations(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0)]);
        let tasks = vec![
            delivery("t1", "L0", "L2", 1.0),
            pickup("t2", "L3", "L2", 1.0),
            delivery("t3", "L0", "L1", 1.0),
        ];

        let layout = NodeLayout::build(
            "L0",
            &tasks,
            &test_vehicles(1, 10.0),
            &locations,
            &PlanningParams::default(),
        )
        .unwrap();

        let ids = layout
            .nodes()
            .iter()
            .map(|node| node.location_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["L0", "L2", "L3", "L1"]);
        assert_eq!(layout.node(DEPOT).window, TimeWindow::new(8 * 3600, 18 * 3600));
    }

    #[test]
    fn test_demands() {
        let locations = test_locations(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]);
        let tasks = vec![
            delivery("d", "L0", "L1", 5.0),
            pickup("p", "L1", "L2", 2.5),
            pickup("back", "L2", "L0", 1.0),
            pickup("from_depot", "L0", "L2", 0.5),
        ];

        let layout = NodeLayout::build(
            "L0",
            &tasks,
            &test_vehicles(1, 10.0),
            &locations,
            &PlanningParams::default(),
        )
        .unwrap();

        let l1 = layout.node(NodeIdx::new(1));
        let l2 = layout.node(NodeIdx::new(2));

        assert_eq!(l1.demand, Load::from_kg_m3(7.5, 0.0));
        assert_eq!(l2.demand, Load::from_kg_m3(-2.5 + 1.0 - 0.5, 0.0));
        assert_eq!(l2.start_load, Load::from_kg_m3(0.5, 0.0));
        assert_eq!(l2.end_load, Load::from_kg_m3(-1.0, 0.0));
        assert_eq!(layout.pickup_delivery_pairs().count(), 4);
        assert_eq!(l2.tasks.len(), 3);
        assert!(l2.has_pickup());
    }

    #[test]
    fn test_errors() {
        let locations = test_locations(&[(0.0, 0.0), (0.0, 1.0)]);
        let params = PlanningParams::default();
        let vehicles = test_vehicles(1, 10.0);

        let unknown = NodeLayout::build(
            "L0",
            &[delivery("t1", "L0", "nowhere", 1.0)],
            &vehicles,
            &locations,
            &params,
        );
        assert!(matches!(unknown, Err(DataError::UnknownLocation { .. })));

        let unknown_depot = NodeLayout::build(
            "nowhere",
            &[delivery("t1", "L0", "L1", 1.0)],
            &vehicles,
            &locations,
            &params,
        );
        assert!(matches!(
            unknown_depot,
            Err(DataError::UnknownLocation { .. })
        ));

        let duplicate = NodeLayout::build(
            "L0",
            &[
                delivery("t1", "L0", "L1", 1.0),
                delivery("t1", "L0", "L1", 1.0),
            ],
            &vehicles,
            &locations,
            &params,
        );
        assert_eq!(duplicate.unwrap_err(), DataError::DuplicateTask("t1".into()));

        let negative = NodeLayout::build(
            "L0",
            &[delivery("t1", "L0", "L1", -1.0)],
            &vehicles,
            &locations,
            &params,
        );
        assert!(matches!(negative, Err(DataError::InvalidQuantity { .. })));

        let depot_only = NodeLayout::build(
            "L0",
            &[delivery("t1", "L0", "L0", 1.0)],
            &vehicles,
            &locations,
            &params,
        );
        assert_eq!(depot_only.unwrap_err(), DataError::DepotOnlyTask("t1".into()));

        let no_vehicles = NodeLayout::build(
            "L0",
            &[delivery("t1", "L0", "L1", 1.0)],
            &[],
            &locations,
            &params,
        );
        assert_eq!(no_vehicles.unwrap_err(), DataError::NoVehicles);
    }

    #[test]
    fn test_break_rule_is_validated() {
        let locations = test_locations(&[(0.0, 0.0), (0.0, 1.0)]);
        let tasks = [delivery("t1", "L0", "L1", 1.0)];
        let vehicles = test_vehicles(1, 10.0);
        let build = |break_rule: BreakRule| {
            NodeLayout::build(
                "L0",
                &tasks,
                &vehicles,
                &locations,
                &PlanningParams {
                    break_rule: Some(break_rule),
                    ..PlanningParams::default()
                },
            )
        };

        let reversed = build(BreakRule {
            window_start: time(14, 15, 0, 0),
            window_end: time(13, 45, 0, 0),
            ..BreakRule::default()
        });
        assert_eq!(
            reversed.unwrap_err(),
            DataError::InvalidBreakRule {
                window_start: time(14, 15, 0, 0),
                window_end: time(13, 45, 0, 0),
                duration: SignedDuration::from_mins(30),
            }
        );

        let negative = build(BreakRule {
            duration: SignedDuration::from_mins(-30),
            ..BreakRule::default()
        });
        assert!(matches!(
            negative,
            Err(DataError::InvalidBreakRule { .. })
        ));

        let instant = build(BreakRule {
            window_start: time(12, 0, 0, 0),
            window_end: time(12, 0, 0, 0),
            ..BreakRule::default()
        });
        assert!(instant.is_ok());
    }

    #[test]
    fn test_delivery_window_is_intersected() {
        let mut locations = test_locations(&[(0.0, 0.0), (0.0, 1.0)]);
        locations[1] = locations[1]
            .clone()
            .with_opening_hours(time(9, 0, 0, 0), time(17, 0, 0, 0));

        let tasks = vec![
            delivery("t1", "L0", "L1", 1.0).with_window(time(12, 0, 0, 0), time(20, 0, 0, 0)),
        ];
        let layout = NodeLayout::build(
            "L0",
            &tasks,
            &test_vehicles(1, 10.0),
            &locations,
            &PlanningParams::default(),
        )
        .unwrap();
        assert_eq!(
            layout.node(NodeIdx::new(1)).window,
            TimeWindow::new(12 * 3600, 17 * 3600)
        );

        let tasks = vec![
            delivery("t1", "L0", "L1", 1.0).with_window(time(18, 0, 0, 0), time(20, 0, 0, 0)),
        ];
        let result = NodeLayout::build(
            "L0",
            &tasks,
            &test_vehicles(1, 10.0),
            &locations,
            &PlanningParams::default(),
        );
        assert_eq!(result.unwrap_err(), DataError::EmptyTimeWindow("t1".into()));
    }

    #[test]
    fn test_required_date() {
        let locations = test_locations(&[(0.0, 0.0), (0.0, 1.0)]);
        let mut task = delivery("t1", "L0", "L1", 1.0);
        task.required_date = Some(date(2025, 3, 4));

        let params = PlanningParams {
            planned_date: Some(date(2025, 3, 5)),
            ..PlanningParams::default()
        };

        let result = NodeLayout::build("L0", &[task], &test_vehicles(1, 10.0), &locations, &params);
        assert!(matches!(result, Err(DataError::DateMismatch { .. })));
    }
}
