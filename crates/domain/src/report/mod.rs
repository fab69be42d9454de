pub mod repository;
pub mod service;

pub use repository::{PostgresReportRepository, ReportRepository};
pub use service::{ReportIntake, ReportService};
