//! Templated, queued notification dispatch (C11). Handlers never call out
//! over SMTP directly - they enqueue through `NotificationService`, and a
//! `NotificationJobHandler` worker does the actual send, so a transport
//! outage degrades to retries instead of blocking a request thread.

use async_trait::async_trait;
use hinschg_core::jobs::traits::{JobContext, JobHandlerConfig};
use hinschg_core::jobs::types::QueuedJob;
use hinschg_core::jobs::{JobHandler, JobPriority, JobQueue, JobResult, SerializableJob};
use hinschg_core::{EmailConfig, Error, Result};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport,
    Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::templates;

pub const NOTIFICATION_JOB_TYPE: &str = "hinschg.notification.send";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Eingangsbestaetigung,
    RueckmeldungErinnerung,
    FristUeberschritten,
    AnOmbudspersonWeitergeleitet,
    NeueNachricht,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
    pub recipient_email: String,
    pub kind: NotificationKind,
    pub params: serde_json::Value,
}

impl SerializableJob for NotificationJob {
    fn job_type(&self) -> &'static str {
        NOTIFICATION_JOB_TYPE
    }

    fn serialize(&self) -> std::result::Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn deserialize(data: &serde_json::Value) -> std::result::Result<Box<dyn SerializableJob>, serde_json::Error>
    where
        Self: Sized,
    {
        Ok(Box::new(serde_json::from_value::<NotificationJob>(data.clone())?))
    }

    fn priority(&self) -> JobPriority {
        JobPriority::Normal
    }

    fn max_attempts(&self) -> u32 {
        5
    }
}

pub struct NotificationService {
    queue: Arc<dyn JobQueue>,
}

impl NotificationService {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }

    pub async fn enqueue(&self, recipient_email: impl Into<String>, kind: NotificationKind, params: serde_json::Value) -> Result<()> {
        let job = NotificationJob {
            recipient_email: recipient_email.into(),
            kind,
            params,
        };
        let queued =
            QueuedJob::new(&job).map_err(|e| Error::internal(format!("failed to serialize notification job: {e}")))?;
        self.queue.enqueue(queued).await?;
        Ok(())
    }
}

/// Renders and transmits one queued notification. Registered with
/// `hinschg_core::jobs::JobExecutor` under `NOTIFICATION_JOB_TYPE`.
pub struct NotificationJobHandler {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: lettre::message::Mailbox,
}

impl NotificationJobHandler {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from = format!("{} <{}>", config.smtp_from_name, config.smtp_from_email)
            .parse()
            .map_err(|_| Error::validation("invalid smtp_from_name/smtp_from_email"))?;

        let mailer = if config.provider == "smtp" {
            let host = config
                .smtp_host
                .as_deref()
                .ok_or_else(|| Error::validation("smtp_host is required when email.provider is \"smtp\""))?;
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| Error::internal(format!("failed to build smtp transport: {e}")))?;
            if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
                builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
            }
            if let Some(port) = config.smtp_port {
                builder = builder.port(port);
            }
            Some(builder.build())
        } else {
            // "mock" and any unrecognized provider: render but do not
            // transmit, used in development and automated tests.
            None
        };

        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl JobHandler for NotificationJobHandler {
    fn job_type(&self) -> &'static str {
        NOTIFICATION_JOB_TYPE
    }

    fn validate_job_data(&self, job_data: &serde_json::Value) -> Result<()> {
        serde_json::from_value::<NotificationJob>(job_data.clone())
            .map(|_| ())
            .map_err(|e| Error::validation(format!("invalid notification job payload: {e}")))
    }

    async fn handle(&self, job_data: &serde_json::Value, _context: &JobContext) -> JobResult {
        let job: NotificationJob = match serde_json::from_value(job_data.clone()) {
            Ok(job) => job,
            Err(e) => return JobResult::failed(format!("invalid notification payload: {e}")),
        };

        let (subject, body) = templates::render(job.kind, &job.params);

        let Some(mailer) = &self.mailer else {
            tracing::info!(recipient = %job.recipient_email, %subject, "notification rendered without a live transport (mock provider)");
            return JobResult::success_with_message("rendered without transport (mock provider)");
        };

        let to: lettre::message::Mailbox = match job.recipient_email.parse() {
            Ok(mailbox) => mailbox,
            Err(_) => return JobResult::failed("recipient email does not parse as a mailbox address"),
        };

        let message = match Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
        {
            Ok(message) => message,
            Err(e) => return JobResult::failed(format!("failed to build message: {e}")),
        };

        match mailer.send(message).await {
            Ok(_) => JobResult::success(),
            Err(e) => JobResult::retry(format!("smtp send failed: {e}")),
        }
    }

    fn config(&self) -> JobHandlerConfig {
        JobHandlerConfig {
            max_concurrent_jobs: Some(5),
            default_timeout: Some(30),
            default_max_attempts: Some(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_provider_builds_handler_without_a_transport() {
        let config = EmailConfig {
            provider: "mock".to_string(),
            smtp_from_email: "noreply@example.com".to_string(),
            smtp_from_name: "Meldestelle".to_string(),
            ..Default::default()
        };
        let handler = NotificationJobHandler::new(&config).unwrap();
        assert!(handler.mailer.is_none());
    }

    #[test]
    fn smtp_provider_without_host_is_rejected() {
        let config = EmailConfig {
            provider: "smtp".to_string(),
            smtp_host: None,
            smtp_from_email: "noreply@example.com".to_string(),
            smtp_from_name: "Meldestelle".to_string(),
            ..Default::default()
        };
        assert!(NotificationJobHandler::new(&config).is_err());
    }
}
