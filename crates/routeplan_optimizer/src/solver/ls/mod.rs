pub mod inter_relocate;
pub mod local_search;
pub mod r#move;
pub mod relocate;
