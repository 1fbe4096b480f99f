pub mod auth;
pub mod item;
pub mod tenancy;
pub mod workflow;
