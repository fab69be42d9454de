pub mod service;
pub mod templates;

pub use service::{NotificationJob, NotificationJobHandler, NotificationKind, NotificationService, NOTIFICATION_JOB_TYPE};
