use campus_verify::workflows::notifications::{EmailJob, MailError, Mailer};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Transport that writes each email to the log instead of an SMTP relay.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, from: &str, job: &EmailJob) -> Result<(), MailError> {
        if job.recipient.trim().is_empty() {
            return Err(MailError::Permanent("recipient address is empty".to_string()));
        }
        info!(
            from,
            to = %job.recipient,
            template = job.template.name(),
            subject = %job.subject,
            "email sent"
        );
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
