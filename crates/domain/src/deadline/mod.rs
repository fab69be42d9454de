pub mod repository;
pub mod scheduler;

pub use repository::{DeadlineRepository, PostgresDeadlineRepository};
pub use scheduler::DeadlineScheduler;
