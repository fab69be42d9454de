pub mod repository;
pub mod service;

pub use repository::{PostgresTenantRepository, TenantRepository};
pub use service::TenantService;
