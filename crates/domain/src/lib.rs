//! Domain layer of the whistleblowing intake and case-management service.
//!
//! Organized by the components of spec §4: the data model (`model`), the
//! case state machine and its statutory side effects (`case`), the pure
//! deadline calculator plus the background sweep (`deadline`), submission
//! intake (`report`), the identity-free anonymous channel (`anon`), the
//! ombudsperson's masked projection (`ombudsperson`), the fixed
//! role→capability table (`access`), tenant and user administration
//! (`tenant`, `user`), the notification dispatcher (`notification`), and
//! the read-only compliance aggregator (`compliance`).

pub mod access;
pub mod anon;
pub mod case;
pub mod compliance;
pub mod deadline;
pub mod metrics;
pub mod model;
pub mod notification;
pub mod ombudsperson;
pub mod report;
pub mod tenant;
pub mod user;

pub mod error;

pub use error::{Error, ErrorCode, Result};

pub use access::{capabilities_for, has_capability, require_capability, Capability};
pub use model::{
    AnonMessage, AnonSubmission, Attachment, Case, CaseEvent, CaseEventType, CaseStatus,
    CompliancePreWarning, Deadline, DeadlineStatus, DeadlineType, MessageDirection,
    OrganizationSize, Recommendation, Report, ReportCategory, ReportChannel, ReportPriority,
    ReportStatus, Role, ScanResult, Severity, Tenant, TenantConfig, User,
};

pub use anon::service::AnonService;
pub use case::service::CaseService;
pub use compliance::service::{CaseStatusBreakdown, ComplianceReport, ComplianceReporter};
pub use deadline::scheduler::DeadlineScheduler;
pub use metrics::collector::MetricsCollector;
pub use notification::service::{NotificationJob, NotificationKind, NotificationService};
pub use ombudsperson::service::{OmbudspersonCaseView, OmbudspersonService};
pub use report::service::ReportService;
pub use tenant::service::TenantService;
pub use user::service::UserService;
