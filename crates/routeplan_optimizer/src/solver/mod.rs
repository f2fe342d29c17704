pub mod construction;
pub mod insertion;
pub mod insertion_cache;
pub mod ls;
pub mod ruin;
pub mod schedule;
pub mod search;
pub mod search_params;
pub mod solution;
