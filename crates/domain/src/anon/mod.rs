pub mod repository;
pub mod service;

pub use repository::{AnonMessageRepository, AnonSubmissionRepository, PostgresAnonRepository};
pub use service::{AnonIntake, AnonService};
