pub mod store;
pub use store::{ItemStore, OrganizationStore, WorkflowStore};
pub mod memory;
pub use memory::MemoryStore;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod workflow_repo;
pub use workflow_repo::WorkflowRepository;
pub mod item_repo;
pub use item_repo::ItemRepository;
