//! Outbound email jobs and the worker pool that delivers them.
//!
//! Jobs are rendered when the triggering state change happens and handed to the queue
//! without waiting for delivery. Workers retry transient failures with a fixed delay and
//! drop the job (with an error log) once the retry budget is spent.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::EmailConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    DocumentSubmittedAdmin,
    DocumentApproved,
    DocumentRejected,
    DocumentExpired,
    DocumentExpiring,
    ProfileVerified,
    ProfileStatus,
}

impl EmailTemplate {
    pub const fn name(self) -> &'static str {
        match self {
            EmailTemplate::DocumentSubmittedAdmin => "emails/document_submitted_admin",
            EmailTemplate::DocumentApproved => "emails/document_approved",
            EmailTemplate::DocumentRejected => "emails/document_rejected",
            EmailTemplate::DocumentExpired => "emails/document_expired",
            EmailTemplate::DocumentExpiring => "emails/document_expiring",
            EmailTemplate::ProfileVerified => "emails/profile_verified",
            EmailTemplate::ProfileStatus => "emails/profile_status",
        }
    }
}

/// Rendered email waiting for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailJob {
    pub recipient: String,
    pub template: EmailTemplate,
    pub subject: String,
    pub body: String,
    pub payload: BTreeMap<String, String>,
}

/// Fire-and-forget hand-off used by the notifier. Implementations must not block.
pub trait EmailDispatch: Send + Sync {
    fn dispatch(&self, job: EmailJob);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    #[error("transient delivery failure: {0}")]
    Transient(String),
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

/// Transport used by the workers (SMTP, provider API, console...).
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, from: &str, job: &EmailJob) -> Result<(), MailError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl From<&EmailConfig> for RetryPolicy {
    fn from(config: &EmailConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: config.retry_delay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { attempts: u32 },
    Dropped { attempts: u32, error: MailError },
}

/// Delivers one job, retrying transient failures up to `policy.max_retries` times.
pub async fn deliver<M>(mailer: &M, from: &str, job: &EmailJob, policy: &RetryPolicy) -> DeliveryOutcome
where
    M: Mailer + ?Sized,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match mailer.send(from, job).await {
            Ok(()) => {
                info!(
                    template = job.template.name(),
                    recipient = %job.recipient,
                    attempts,
                    "email delivered"
                );
                return DeliveryOutcome::Sent { attempts };
            }
            Err(MailError::Transient(reason)) if attempts <= policy.max_retries => {
                warn!(
                    template = job.template.name(),
                    recipient = %job.recipient,
                    attempts,
                    %reason,
                    "email delivery failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(err) => {
                error!(
                    template = job.template.name(),
                    recipient = %job.recipient,
                    attempts,
                    error = %err,
                    "email dropped"
                );
                return DeliveryOutcome::Dropped {
                    attempts,
                    error: err,
                };
            }
        }
    }
}

/// Sending half of the worker pool.
pub struct EmailQueue {
    sender: mpsc::UnboundedSender<EmailJob>,
}

/// Join handles of the spawned workers; they exit once every `EmailQueue` is dropped.
pub struct EmailWorkers {
    handles: Vec<JoinHandle<()>>,
}

impl EmailWorkers {
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(err) = handle.await {
                error!(error = %err, "email worker panicked");
            }
        }
    }
}

impl EmailQueue {
    /// Spawns `config.workers` workers on the current tokio runtime.
    pub fn spawn<M>(mailer: Arc<M>, config: &EmailConfig) -> (Self, EmailWorkers)
    where
        M: Mailer + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let policy = RetryPolicy::from(config);
        let from: Arc<str> = Arc::from(config.from_address.as_str());

        let handles = (0..config.workers.max(1))
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let mailer = Arc::clone(&mailer);
                let policy = policy.clone();
                let from = Arc::clone(&from);
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(job) = next else {
                            debug!(worker, "email queue closed, worker exiting");
                            break;
                        };
                        deliver(mailer.as_ref(), &from, &job, &policy).await;
                    }
                })
            })
            .collect();

        (Self { sender }, EmailWorkers { handles })
    }
}

impl EmailDispatch for EmailQueue {
    fn dispatch(&self, job: EmailJob) {
        let template = job.template.name();
        if self.sender.send(job).is_err() {
            warn!(template, "email queue closed, job discarded");
        }
    }
}
