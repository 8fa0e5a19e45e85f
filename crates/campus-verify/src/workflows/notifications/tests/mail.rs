use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::EmailConfig;
use crate::workflows::notifications::{
    deliver, DeliveryOutcome, EmailDispatch, EmailJob, EmailQueue, EmailTemplate, MailError,
    Mailer, RetryPolicy,
};

fn job(recipient: &str) -> EmailJob {
    EmailJob {
        recipient: recipient.to_string(),
        template: EmailTemplate::DocumentApproved,
        subject: "Document approved".to_string(),
        body: "Your document \"Identity card\" has been approved.".to_string(),
        payload: BTreeMap::new(),
    }
}

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        delay: Duration::from_millis(1),
    }
}

/// Fails transiently for the first `failures` attempts.
struct FlakyMailer {
    failures: u32,
    attempts: AtomicU32,
}

impl FlakyMailer {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            attempts: AtomicU32::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for FlakyMailer {
    async fn send(&self, _from: &str, _job: &EmailJob) -> Result<(), MailError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            Err(MailError::Transient("smtp timeout".to_string()))
        } else {
            Ok(())
        }
    }
}

struct RejectingMailer;

#[async_trait::async_trait]
impl Mailer for RejectingMailer {
    async fn send(&self, _from: &str, _job: &EmailJob) -> Result<(), MailError> {
        Err(MailError::Permanent("mailbox does not exist".to_string()))
    }
}

#[derive(Default)]
struct CollectingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl Mailer for CollectingMailer {
    async fn send(&self, from: &str, job: &EmailJob) -> Result<(), MailError> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push((from.to_string(), job.recipient.clone()));
        Ok(())
    }
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let mailer = FlakyMailer::new(2);
    let outcome = deliver(&mailer, "noreply@campus.test", &job("a@campus.test"), &fast_policy(3)).await;

    assert_eq!(outcome, DeliveryOutcome::Sent { attempts: 3 });
}

#[tokio::test]
async fn jobs_are_dropped_once_retries_are_exhausted() {
    let mailer = FlakyMailer::new(10);
    let outcome = deliver(&mailer, "noreply@campus.test", &job("a@campus.test"), &fast_policy(3)).await;

    match outcome {
        DeliveryOutcome::Dropped { attempts, error } => {
            assert_eq!(attempts, 4);
            assert!(matches!(error, MailError::Transient(_)));
        }
        other => panic!("expected drop, got {other:?}"),
    }
    assert_eq!(mailer.attempts.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let outcome = deliver(
        &RejectingMailer,
        "noreply@campus.test",
        &job("a@campus.test"),
        &fast_policy(3),
    )
    .await;

    assert!(matches!(
        outcome,
        DeliveryOutcome::Dropped {
            attempts: 1,
            error: MailError::Permanent(_)
        }
    ));
}

#[test]
fn retry_policy_follows_email_config() {
    let config = EmailConfig {
        max_retries: 5,
        retry_delay: Duration::from_secs(30),
        ..EmailConfig::default()
    };

    assert_eq!(
        RetryPolicy::from(&config),
        RetryPolicy {
            max_retries: 5,
            delay: Duration::from_secs(30),
        }
    );
}

#[tokio::test]
async fn queue_workers_drain_jobs_and_exit_when_closed() {
    let mailer = Arc::new(CollectingMailer::default());
    let config = EmailConfig {
        from_address: "noreply@campus.test".to_string(),
        workers: 3,
        max_retries: 1,
        retry_delay: Duration::from_millis(1),
    };
    let (queue, workers) = EmailQueue::spawn(mailer.clone(), &config);

    for index in 0..5 {
        queue.dispatch(job(&format!("user{index}@campus.test")));
    }
    drop(queue);
    workers.join().await;

    let sent = mailer.sent.lock().expect("mailer mutex poisoned").clone();
    assert_eq!(sent.len(), 5);
    assert!(sent.iter().all(|(from, _)| from == "noreply@campus.test"));
}
