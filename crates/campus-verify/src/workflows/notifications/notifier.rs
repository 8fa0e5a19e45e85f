use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::domain::{Notification, NotificationKind};
use super::mail::{EmailDispatch, EmailJob, EmailTemplate};
use crate::workflows::verification::domain::{Document, UserAccount, VerificationStatus};
use crate::workflows::verification::repository::{
    NotificationRepository, RepositoryError, UserDirectory,
};

/// Reason codes admins can pick instead of typing a free-form rejection reason.
pub const REJECTION_TEMPLATES: &[(&str, &str)] = &[
    ("illegible", "Document is illegible or of poor quality"),
    ("expired", "Document has expired"),
    ("wrong_type", "Wrong document type"),
    ("incomplete", "Information is missing or incomplete"),
    ("non_compliant", "Document does not meet the requirements"),
    ("wrong_user", "Document does not belong to this user"),
];

/// Expands a reason code to its message; free-form reasons pass through unchanged.
pub fn resolve_rejection_reason(reason: &str) -> String {
    let trimmed = reason.trim();
    REJECTION_TEMPLATES
        .iter()
        .find(|(code, _)| *code == trimmed)
        .map(|(_, message)| (*message).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Turns status transitions into in-app notifications plus queued emails.
///
/// Notification rows are written synchronously and their failures propagate; emails are
/// handed to the dispatcher and never reported back.
pub struct StatusNotifier<S, E> {
    store: Arc<S>,
    email: Arc<E>,
}

impl<S, E> Clone for StatusNotifier<S, E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            email: Arc::clone(&self.email),
        }
    }
}

struct Outgoing<'a> {
    recipient: &'a UserAccount,
    kind: NotificationKind,
    title: String,
    message: String,
    link: Option<String>,
    template: EmailTemplate,
    subject: &'static str,
    payload: BTreeMap<String, String>,
}

impl<S, E> StatusNotifier<S, E>
where
    S: UserDirectory + NotificationRepository,
    E: EmailDispatch,
{
    pub fn new(store: Arc<S>, email: Arc<E>) -> Self {
        Self { store, email }
    }

    fn send(&self, outgoing: Outgoing<'_>) -> Result<(), RepositoryError> {
        let notification = Notification {
            id: self.store.next_notification_id(),
            recipient: outgoing.recipient.id,
            kind: outgoing.kind,
            title: outgoing.title,
            message: outgoing.message.clone(),
            link: outgoing.link,
            is_read: false,
            created_at: Utc::now(),
        };
        debug!(
            notification = %notification.id,
            recipient = %notification.recipient,
            kind = ?notification.kind,
            "notification created"
        );
        self.store.insert_notification(notification)?;

        self.email.dispatch(EmailJob {
            recipient: outgoing.recipient.email.clone(),
            template: outgoing.template,
            subject: outgoing.subject.to_string(),
            body: outgoing.message,
            payload: outgoing.payload,
        });
        Ok(())
    }

    /// Every active admin hears about each newly submitted document.
    pub fn document_submitted(
        &self,
        owner: &UserAccount,
        document: &Document,
    ) -> Result<(), RepositoryError> {
        let admins = self.store.admins()?;
        for admin in &admins {
            self.send(Outgoing {
                recipient: admin,
                kind: NotificationKind::DocumentSubmitted,
                title: "New document submitted".to_string(),
                message: format!(
                    "{} submitted \"{}\" ({}) and it is waiting for review.",
                    display_name(owner),
                    document.title,
                    document.document_type.label()
                ),
                link: Some(format!("/admin/documents/{}", document.id.0)),
                template: EmailTemplate::DocumentSubmittedAdmin,
                subject: "New document to review",
                payload: document_payload(owner, document),
            })?;
        }
        Ok(())
    }

    pub fn document_approved(
        &self,
        owner: &UserAccount,
        document: &Document,
    ) -> Result<(), RepositoryError> {
        self.send(Outgoing {
            recipient: owner,
            kind: NotificationKind::DocumentApproved,
            title: "Document approved".to_string(),
            message: format!(
                "Your document \"{}\" has been approved.",
                document.document_type.label()
            ),
            link: Some("/documents".to_string()),
            template: EmailTemplate::DocumentApproved,
            subject: "Document approved",
            payload: document_payload(owner, document),
        })
    }

    pub fn document_rejected(
        &self,
        owner: &UserAccount,
        document: &Document,
        reason: &str,
    ) -> Result<(), RepositoryError> {
        let reason = resolve_rejection_reason(reason);
        let mut payload = document_payload(owner, document);
        payload.insert("rejection_reason".to_string(), reason.clone());

        self.send(Outgoing {
            recipient: owner,
            kind: NotificationKind::DocumentRejected,
            title: "Document rejected".to_string(),
            message: format!(
                "Your document \"{}\" has been rejected. Reason: {reason}",
                document.document_type.label()
            ),
            link: Some("/documents".to_string()),
            template: EmailTemplate::DocumentRejected,
            subject: "Document rejected",
            payload,
        })
    }

    pub fn document_expired(
        &self,
        owner: &UserAccount,
        document: &Document,
    ) -> Result<(), RepositoryError> {
        self.send(Outgoing {
            recipient: owner,
            kind: NotificationKind::DocumentExpired,
            title: "Document expired".to_string(),
            message: format!(
                "Your document \"{}\" has expired. Please upload a valid replacement.",
                document.document_type.label()
            ),
            link: Some("/documents".to_string()),
            template: EmailTemplate::DocumentExpired,
            subject: "Document expired",
            payload: document_payload(owner, document),
        })
    }

    pub fn document_expiring(
        &self,
        owner: &UserAccount,
        document: &Document,
        days_left: i64,
    ) -> Result<(), RepositoryError> {
        let mut payload = document_payload(owner, document);
        payload.insert("days_left".to_string(), days_left.to_string());

        self.send(Outgoing {
            recipient: owner,
            kind: NotificationKind::DocumentExpiring,
            title: "Document expiring soon".to_string(),
            message: format!(
                "Your document \"{}\" expires in {days_left} day(s). Please renew it to keep your verification.",
                document.document_type.label()
            ),
            link: Some("/documents".to_string()),
            template: EmailTemplate::DocumentExpiring,
            subject: "Document expiring soon",
            payload,
        })
    }

    /// Called only when the stored status actually changed.
    pub fn profile_status_changed(
        &self,
        user: &UserAccount,
        old: VerificationStatus,
        new: VerificationStatus,
        note: &str,
    ) -> Result<(), RepositoryError> {
        let mut payload = BTreeMap::new();
        payload.insert("user_id".to_string(), user.id.to_string());
        payload.insert("old_status".to_string(), old.label().to_string());
        payload.insert("new_status".to_string(), new.label().to_string());
        payload.insert("note".to_string(), note.to_string());

        let (title, mut message, template, subject) = if new == VerificationStatus::Verified {
            (
                "Profile verified",
                "Congratulations! Your profile is fully verified and every feature of the platform is now available.".to_string(),
                EmailTemplate::ProfileVerified,
                "Profile verified",
            )
        } else {
            (
                "Profile status changed",
                format!(
                    "Your profile verification status changed from \"{}\" to \"{}\".",
                    old.label(),
                    new.label()
                ),
                EmailTemplate::ProfileStatus,
                "Profile status changed",
            )
        };
        if !note.is_empty() {
            message.push_str(&format!(" Note: {note}"));
        }

        self.send(Outgoing {
            recipient: user,
            kind: NotificationKind::for_profile_status(new),
            title: title.to_string(),
            message,
            link: Some("/profile/verification".to_string()),
            template,
            subject,
            payload,
        })
    }
}

fn display_name(user: &UserAccount) -> &str {
    if user.display_name.trim().is_empty() {
        &user.email
    } else {
        &user.display_name
    }
}

fn document_payload(owner: &UserAccount, document: &Document) -> BTreeMap<String, String> {
    let mut payload = BTreeMap::new();
    payload.insert("document_id".to_string(), document.id.to_string());
    payload.insert(
        "document_type".to_string(),
        document.document_type.code().to_string(),
    );
    payload.insert("document_title".to_string(), document.title.clone());
    payload.insert("owner".to_string(), display_name(owner).to_string());
    payload
}
