pub mod access_gate;
pub mod auth;
pub mod item_service;
pub mod tenancy_service;
pub mod workflow_service;
