pub mod repository;
pub mod service;

pub use repository::{CaseRepository, PostgresCaseRepository};
pub use service::CaseService;
