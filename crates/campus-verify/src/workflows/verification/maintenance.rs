use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::error::VerificationError;
use super::repository::VerificationStore;
use super::service::VerificationService;
use crate::workflows::notifications::EmailDispatch;

/// Counters produced by one pass of the periodic jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MaintenanceReport {
    pub documents_expired: usize,
    pub expiry_reminders: usize,
    pub notifications_removed: usize,
}

/// Expiry, reminders, then retention cleanup. Each job only touches independent rows.
pub fn run_maintenance<S, E>(
    service: &VerificationService<S, E>,
    now: DateTime<Utc>,
) -> Result<MaintenanceReport, VerificationError>
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    let today = now.date_naive();
    let report = MaintenanceReport {
        documents_expired: service.check_expired_documents(today)?,
        expiry_reminders: service.remind_expiring_documents(today)?,
        notifications_removed: service.cleanup_notifications(now)?,
    };
    info!(
        expired = report.documents_expired,
        reminders = report.expiry_reminders,
        removed = report.notifications_removed,
        "maintenance pass finished"
    );
    Ok(report)
}
