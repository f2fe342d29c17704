pub mod load;
pub mod location;
pub mod node_group;
pub mod node_layout;
pub mod planning_params;
pub mod task;
pub mod time_window;
pub mod vehicle;
pub mod vehicle_routing_problem;
