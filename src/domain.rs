// src/domain.rs

pub mod stage_graph;
pub mod transitions;

pub use stage_graph::build_stages;
pub use transitions::{plan_advance, plan_complete, plan_status_change, StageChange, StatusChange, StatusUpdate};
