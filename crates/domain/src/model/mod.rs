pub mod anon;
pub mod attachment;
pub mod case;
pub mod deadline;
pub mod report;
pub mod tenant;
pub mod user;

pub use anon::{AnonMessage, AnonSubmission, MessageDirection};
pub use attachment::{Attachment, ScanResult};
pub use case::{Case, CaseEvent, CaseEventType, CaseStatus, Recommendation, Severity};
pub use deadline::{CompliancePreWarning, Deadline, DeadlineStatus, DeadlineType};
pub use report::{Report, ReportCategory, ReportChannel, ReportPriority, ReportStatus};
pub use tenant::{OrganizationSize, Tenant, TenantConfig};
pub use user::{Role, User};
