pub mod items;
pub mod tenancy;
pub mod workflows;
