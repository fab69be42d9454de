//! Shared application state: one `Arc`-backed instance per process, built
//! once in `main` and cloned cheaply into every request.

use hinschg_core::audit::{AuditLogger, DatabaseAuditRepository, ErrorMetrics};
use hinschg_core::jobs::{ExecutorConfig, JobExecutor, JobQueue, RedisJobQueue};
use hinschg_core::security::EncryptionService;
use hinschg_core::session::SessionManager;
use hinschg_core::{CaseMetrics, Config, DatabasePool, MetricsRegistry, MetricsService};
use hinschg_domain::anon::repository::{AnonMessageRepository, AnonSubmissionRepository, PostgresAnonRepository};
use hinschg_domain::case::repository::{CaseRepository, PostgresCaseRepository};
use hinschg_domain::deadline::repository::{DeadlineRepository, PostgresDeadlineRepository};
use hinschg_domain::notification::service::NotificationJobHandler;
use hinschg_domain::report::repository::{PostgresReportRepository, ReportRepository};
use hinschg_domain::tenant::repository::{PostgresTenantRepository, TenantRepository};
use hinschg_domain::user::repository::{PostgresUserRepository, UserRepository};
use hinschg_domain::{
    AnonService, CaseService, ComplianceReporter, DeadlineScheduler, MetricsCollector, NotificationService,
    OmbudspersonService, ReportService, TenantService, UserService,
};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: DatabasePool,
    pub redis: ConnectionManager,
    pub audit: Arc<AuditLogger>,
    pub encryption: Arc<EncryptionService>,
    pub sessions: Arc<SessionManager>,
    pub job_queue: Arc<dyn JobQueue>,
    pub metrics_registry: MetricsRegistry,
    pub metrics_service: Arc<MetricsService>,
    pub case_metrics: Arc<CaseMetrics>,
    pub tenants: Arc<TenantService>,
    pub users: Arc<UserService>,
    pub reports: Arc<ReportService>,
    pub cases: Arc<CaseService>,
    pub anon: Arc<AnonService>,
    pub ombudsperson: Arc<OmbudspersonService>,
    pub notifications: Arc<NotificationService>,
    pub compliance: Arc<ComplianceReporter>,
    pub deadline_scheduler: Arc<DeadlineScheduler>,
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    pub async fn build(config: Config, db: DatabasePool, redis: ConnectionManager) -> hinschg_core::Result<Self> {
        let pool = db.pool().clone();

        let encryption = Arc::new(EncryptionService::new(&config.security)?);
        let sessions = Arc::new(SessionManager::new(&config.redis).await?);

        let audit_backend = Arc::new(DatabaseAuditRepository::new(Arc::new(pool.clone()), &config.security.audit_hmac_key));
        let audit = Arc::new(AuditLogger::new(audit_backend, Arc::new(ErrorMetrics::new())));

        let job_queue: Arc<dyn JobQueue> = Arc::new(RedisJobQueue::new(redis.clone(), "hinschg.jobs"));

        let metrics_registry = MetricsRegistry::new(config.metrics.clone());
        let metrics_service = Arc::new(MetricsService::new(metrics_registry.clone()));
        let case_metrics = Arc::new(CaseMetrics::new(&config.metrics.namespace).map_err(|e| {
            hinschg_core::Error::internal(format!("failed to build case metrics: {e}"))
        })?);
        case_metrics
            .register_all(&metrics_registry)
            .map_err(|e| hinschg_core::Error::internal(format!("failed to register case metrics: {e}")))?;

        let tenant_repo: Arc<dyn TenantRepository> = Arc::new(PostgresTenantRepository::new(pool.clone()));
        let user_repo: Arc<dyn UserRepository> = Arc::new(PostgresUserRepository::new(pool.clone()));
        let report_repo: Arc<dyn ReportRepository> = Arc::new(PostgresReportRepository::new(pool.clone()));
        let case_repo: Arc<dyn CaseRepository> = Arc::new(PostgresCaseRepository::new(pool.clone()));
        let deadline_repo: Arc<dyn DeadlineRepository> = Arc::new(PostgresDeadlineRepository::new(pool.clone()));
        let anon_repo = Arc::new(PostgresAnonRepository::new(pool.clone()));
        let anon_submission_repo: Arc<dyn AnonSubmissionRepository> = anon_repo.clone();
        let anon_message_repo: Arc<dyn AnonMessageRepository> = anon_repo;

        let tenants = Arc::new(TenantService::new(tenant_repo.clone(), audit.clone()));
        let users = Arc::new(UserService::new(user_repo, audit.clone()));
        let reports = Arc::new(ReportService::new(report_repo.clone(), encryption.clone(), audit.clone()));
        let cases = Arc::new(CaseService::new(case_repo.clone(), deadline_repo.clone(), reports.clone(), audit.clone()));
        let anon = Arc::new(AnonService::new(
            anon_submission_repo,
            anon_message_repo,
            encryption.clone(),
            sessions.clone(),
            audit.clone(),
        ));
        let ombudsperson = Arc::new(OmbudspersonService::new(
            case_repo.clone(),
            report_repo.clone(),
            cases.clone(),
            encryption.clone(),
        ));
        let notifications = Arc::new(NotificationService::new(job_queue.clone()));
        let compliance = Arc::new(ComplianceReporter::new(case_repo.clone(), report_repo.clone()));

        let deadline_scheduler = Arc::new(DeadlineScheduler::new(
            tenant_repo.clone(),
            case_repo.clone(),
            deadline_repo.clone(),
            report_repo.clone(),
            notifications.clone(),
            audit.clone(),
        ));
        let metrics_collector = Arc::new(MetricsCollector::new(
            tenant_repo,
            deadline_repo,
            compliance.clone(),
            case_metrics.clone(),
        ));

        Ok(Self {
            config,
            db,
            redis,
            audit,
            encryption,
            sessions,
            job_queue,
            metrics_registry,
            metrics_service,
            case_metrics,
            tenants,
            users,
            reports,
            cases,
            anon,
            ombudsperson,
            notifications,
            compliance,
            deadline_scheduler,
            metrics_collector,
        })
    }
}
