//! In-app notifications and email delivery for verification status transitions.

pub mod domain;
pub mod mail;
pub mod notifier;

#[cfg(test)]
mod tests;

pub use domain::{Notification, NotificationFeed, NotificationId, NotificationKind};
pub use mail::{
    deliver, DeliveryOutcome, EmailDispatch, EmailJob, EmailQueue, EmailTemplate, EmailWorkers,
    MailError, Mailer, RetryPolicy,
};
pub use notifier::{resolve_rejection_reason, StatusNotifier, REJECTION_TEMPLATES};
