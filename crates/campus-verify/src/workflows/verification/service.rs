use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::checklist::{ChecklistItem, ChecklistStatus, DocumentChecklistService};
use super::domain::{
    Document, DocumentId, DocumentStatus, DocumentType, DocumentUpload, ProfileAction,
    Registration, ReviewDecision, StoredFile, UserAccount, UserAccountView, UserId, UserRole,
    VerificationStatus,
};
use super::error::{ValidationError, VerificationError};
use super::repository::VerificationStore;
use super::requirements;
use crate::config::VerificationConfig;
use crate::workflows::notifications::{
    EmailDispatch, Notification, NotificationFeed, NotificationId, StatusNotifier,
};

const AUTO_VERIFIED_NOTE: &str = "All required documents approved: automatic verification.";
const EXPIRED_NOTE: &str = "A required document expired: verification withdrawn.";

/// Aggregated verification state for one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationSummary {
    pub user: UserAccountView,
    pub required_documents: Vec<DocumentType>,
    pub checklist: Vec<ChecklistItem>,
    pub completion_percentage: u8,
    pub all_required_approved: bool,
    pub missing_documents: Vec<DocumentType>,
    pub pending_documents: usize,
}

/// Service composing the store, the checklist and the status notifier.
pub struct VerificationService<S, E> {
    store: Arc<S>,
    checklist: DocumentChecklistService<S>,
    notifier: StatusNotifier<S, E>,
    config: VerificationConfig,
}

impl<S, E> VerificationService<S, E>
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    pub fn new(store: Arc<S>, email: Arc<E>, config: VerificationConfig) -> Self {
        Self {
            checklist: DocumentChecklistService::new(Arc::clone(&store)),
            notifier: StatusNotifier::new(Arc::clone(&store), email),
            store,
            config,
        }
    }

    pub fn checklist(&self) -> &DocumentChecklistService<S> {
        &self.checklist
    }

    pub fn register_user(
        &self,
        registration: Registration,
    ) -> Result<UserAccount, VerificationError> {
        let role: UserRole = registration.role.parse()?;
        let email = registration.email.trim().to_ascii_lowercase();
        if email.is_empty() {
            return Err(ValidationError::BlankField("email").into());
        }

        let account = UserAccount {
            id: self.store.next_user_id(),
            email,
            display_name: registration.display_name.trim().to_string(),
            role,
            verification_status: VerificationStatus::Pending,
            is_active: true,
            verified_at: None,
            verified_by: None,
            verification_note: String::new(),
            created_at: Utc::now(),
        };
        let stored = self.store.insert_user(account)?;
        info!(user = %stored.id, role = %stored.role, "user registered");
        Ok(stored)
    }

    pub fn user(&self, id: UserId) -> Result<UserAccount, VerificationError> {
        self.store
            .fetch_user(id)?
            .ok_or(VerificationError::NotFound { entity: "user" })
    }

    pub fn require_admin(&self, id: UserId) -> Result<UserAccount, VerificationError> {
        let user = self.user(id)?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(VerificationError::PermissionDenied)
        }
    }

    /// Other users' records are reported as missing rather than forbidden.
    pub fn ensure_visible(&self, viewer: UserId, owner: UserId) -> Result<(), VerificationError> {
        if viewer == owner || self.user(viewer)?.is_admin() {
            Ok(())
        } else {
            Err(VerificationError::NotFound { entity: "user" })
        }
    }

    /// Validates the whole batch against the role vocabulary before writing anything.
    pub fn submit_verification_documents(
        &self,
        user_id: UserId,
        uploads: Vec<DocumentUpload>,
    ) -> Result<Vec<Document>, VerificationError> {
        let owner = self.user(user_id)?;
        if uploads.is_empty() {
            return Err(ValidationError::EmptySubmission.into());
        }

        let now = Utc::now();
        let mut documents = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let document_type: DocumentType = upload.document_type.parse()?;
            if !requirements::is_allowed(owner.role, document_type) {
                return Err(ValidationError::DocumentTypeNotAllowed {
                    role: owner.role,
                    document_type,
                }
                .into());
            }
            let title = non_blank("title", upload.title)?;
            let storage_key = non_blank("storage_key", upload.storage_key)?;
            let file_name = non_blank("file_name", upload.file_name)?;

            documents.push(Document {
                id: self.store.next_document_id(),
                owner: owner.id,
                document_type,
                title,
                description: upload.description.trim().to_string(),
                file: StoredFile::new(storage_key, file_name, upload.size_bytes),
                status: DocumentStatus::Pending,
                uploaded_at: now,
                expiry_date: upload.expiry_date,
                verified_by: None,
                verified_at: None,
                rejection_reason: String::new(),
            });
        }

        let stored = self.store.insert_documents(documents)?;
        info!(user = %owner.id, count = stored.len(), "documents submitted");

        for document in &stored {
            self.notifier.document_submitted(&owner, document)?;
        }
        Ok(stored)
    }

    /// Approves or rejects a pending document and re-evaluates the owner's profile.
    pub fn verify_document(
        &self,
        document_id: DocumentId,
        admin_id: UserId,
        decision: ReviewDecision,
    ) -> Result<Document, VerificationError> {
        let admin = self.require_admin(admin_id)?;
        let mut document = self
            .store
            .fetch_document(document_id)?
            .ok_or(VerificationError::NotFound { entity: "document" })?;
        if document.status != DocumentStatus::Pending {
            return Err(ValidationError::InvalidTransition {
                from: document.status,
            }
            .into());
        }

        document.verified_by = Some(admin.id);
        document.verified_at = Some(Utc::now());
        match &decision {
            ReviewDecision::Approve => {
                document.status = DocumentStatus::Approved;
                document.rejection_reason.clear();
            }
            ReviewDecision::Reject { reason } => {
                if reason.trim().is_empty() {
                    return Err(ValidationError::MissingRejectionReason.into());
                }
                document.status = DocumentStatus::Rejected;
                document.rejection_reason = reason.trim().to_string();
            }
        }
        self.store.update_document(document.clone())?;
        info!(
            document = %document.id,
            owner = %document.owner,
            admin = %admin.id,
            status = document.status.label(),
            "document reviewed"
        );

        let owner = self.user(document.owner)?;
        match decision {
            ReviewDecision::Approve => {
                self.notifier.document_approved(&owner, &document)?;
                self.promote_if_complete(owner, &admin)?;
            }
            ReviewDecision::Reject { reason } => {
                self.notifier.document_rejected(&owner, &document, &reason)?;
                let required = requirements::required_document_types(owner.role)
                    .contains(&document.document_type);
                if !required || self.check_full_verification(&owner)? {
                    self.promote_if_complete(owner, &admin)?;
                } else if !matches!(
                    owner.verification_status,
                    VerificationStatus::Suspended | VerificationStatus::Rejected
                ) {
                    let note = format!("Document \"{}\" rejected: {}", document.title, reason.trim());
                    self.transition(owner, VerificationStatus::Incomplete, note, Some(admin.id))?;
                }
            }
        }

        Ok(document)
    }

    /// Canonical completion check shared with the checklist.
    pub fn check_full_verification(&self, user: &UserAccount) -> Result<bool, VerificationError> {
        Ok(self.checklist.are_all_required_approved(user)?)
    }

    fn promote_if_complete(
        &self,
        owner: UserAccount,
        admin: &UserAccount,
    ) -> Result<UserAccount, VerificationError> {
        if owner.is_verified()
            || owner.verification_status == VerificationStatus::Suspended
            || !self.check_full_verification(&owner)?
        {
            return Ok(owner);
        }

        self.transition(
            owner,
            VerificationStatus::Verified,
            AUTO_VERIFIED_NOTE.to_string(),
            Some(admin.id),
        )
    }

    /// Persists the new status; notifies only when the stored value actually changed.
    fn transition(
        &self,
        mut user: UserAccount,
        new: VerificationStatus,
        note: String,
        actor: Option<UserId>,
    ) -> Result<UserAccount, VerificationError> {
        let old = user.verification_status;
        match new {
            VerificationStatus::Verified | VerificationStatus::Rejected => {
                user.verified_at = Some(Utc::now());
                user.verified_by = actor;
            }
            VerificationStatus::Pending => {
                user.verified_at = None;
                user.verified_by = None;
            }
            _ => {}
        }
        user.verification_status = new;
        user.verification_note = note;
        self.store.update_user(user.clone())?;

        if old != new {
            info!(
                user = %user.id,
                from = old.label(),
                to = new.label(),
                "verification status changed"
            );
            self.notifier
                .profile_status_changed(&user, old, new, &user.verification_note)?;
        }
        Ok(user)
    }

    /// Admin override of a profile's verification status.
    pub fn set_profile_status(
        &self,
        target: UserId,
        admin_id: UserId,
        action: ProfileAction,
        note: Option<String>,
    ) -> Result<UserAccount, VerificationError> {
        let admin = self.require_admin(admin_id)?;
        let user = self.user(target)?;
        let note = note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty())
            .unwrap_or_else(|| action.default_note().to_string());

        self.transition(user, action.target_status(), note, Some(admin.id))
    }

    /// FIFO review queue: oldest submissions first.
    pub fn get_pending_verifications(&self) -> Result<Vec<Document>, VerificationError> {
        let mut pending = self.store.documents_with_status(DocumentStatus::Pending)?;
        pending.sort_by_key(|document| document.recency());
        Ok(pending)
    }

    /// Every upload of the user, newest first.
    pub fn get_user_documents(&self, user_id: UserId) -> Result<Vec<Document>, VerificationError> {
        let mut documents = self.store.documents_for(user_id)?;
        documents.sort_by_key(|document| std::cmp::Reverse(document.recency()));
        Ok(documents)
    }

    pub fn document_for(
        &self,
        viewer: UserId,
        document_id: DocumentId,
    ) -> Result<Document, VerificationError> {
        let document = self
            .store
            .fetch_document(document_id)?
            .ok_or(VerificationError::NotFound { entity: "document" })?;
        if document.owner == viewer || self.user(viewer)?.is_admin() {
            Ok(document)
        } else {
            Err(VerificationError::NotFound { entity: "document" })
        }
    }

    pub fn get_verification_status(
        &self,
        user_id: UserId,
    ) -> Result<VerificationSummary, VerificationError> {
        let user = self.user(user_id)?;
        let checklist = self.checklist.get_checklist(&user)?;
        let pending_documents = self
            .store
            .documents_for(user.id)?
            .iter()
            .filter(|document| document.status == DocumentStatus::Pending)
            .count();

        Ok(VerificationSummary {
            required_documents: DocumentChecklistService::<S>::get_required_document_types(
                user.role,
            ),
            completion_percentage: super::checklist::completion_percentage(&checklist),
            all_required_approved: super::checklist::all_approved(&checklist),
            missing_documents: super::checklist::missing_types(&checklist),
            checklist,
            pending_documents,
            user: user.view(),
        })
    }

    /// Marks approved documents past their expiry date as expired; returns how many changed.
    pub fn check_expired_documents(&self, today: NaiveDate) -> Result<usize, VerificationError> {
        let mut expired_by_owner: Vec<(UserId, Vec<DocumentId>)> = Vec::new();
        let mut count = 0;

        for mut document in self.store.documents_with_status(DocumentStatus::Approved)? {
            if !document.is_expired_on(today) {
                continue;
            }
            document.status = DocumentStatus::Expired;
            self.store.update_document(document.clone())?;
            count += 1;

            let owner = self.user(document.owner)?;
            self.notifier.document_expired(&owner, &document)?;

            match expired_by_owner
                .iter_mut()
                .find(|(owner_id, _)| *owner_id == document.owner)
            {
                Some((_, ids)) => ids.push(document.id),
                None => expired_by_owner.push((document.owner, vec![document.id])),
            }
        }

        for (owner_id, expired_ids) in expired_by_owner {
            let owner = self.user(owner_id)?;
            if !owner.is_verified() {
                continue;
            }
            let checklist = self.checklist.get_checklist(&owner)?;
            let lost_requirement = checklist.iter().any(|item| {
                item.status != ChecklistStatus::Approved
                    && item
                        .document_id
                        .is_some_and(|id| expired_ids.contains(&id))
            });
            if lost_requirement {
                warn!(user = %owner.id, "verification revoked after document expiry");
                self.transition(
                    owner,
                    VerificationStatus::Incomplete,
                    EXPIRED_NOTE.to_string(),
                    None,
                )?;
            }
        }

        if count > 0 {
            info!(count, %today, "documents expired");
        }
        Ok(count)
    }

    /// Reminds owners of approved documents expiring within the configured window.
    pub fn remind_expiring_documents(&self, today: NaiveDate) -> Result<usize, VerificationError> {
        let horizon = Duration::try_days(self.config.expiry_reminder_days.max(0))
            .and_then(|window| today.checked_add_signed(window))
            .unwrap_or(NaiveDate::MAX);
        let mut reminded = 0;

        for document in self.store.documents_with_status(DocumentStatus::Approved)? {
            let Some(expiry) = document.expiry_date else {
                continue;
            };
            if expiry < today || expiry > horizon {
                continue;
            }
            let owner = self.user(document.owner)?;
            self.notifier
                .document_expiring(&owner, &document, (expiry - today).num_days())?;
            reminded += 1;
        }
        Ok(reminded)
    }

    pub fn notifications(&self, user_id: UserId) -> Result<NotificationFeed, VerificationError> {
        let mut notifications = self.store.notifications_for(user_id)?;
        notifications.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then(right.id.cmp(&left.id))
        });
        let unread_count = notifications.iter().filter(|item| !item.is_read).count();
        Ok(NotificationFeed {
            unread_count,
            notifications,
        })
    }

    pub fn mark_notification_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> Result<Notification, VerificationError> {
        let mut notification = self
            .store
            .fetch_notification(id)?
            .filter(|notification| notification.recipient == user_id)
            .ok_or(VerificationError::NotFound {
                entity: "notification",
            })?;
        if notification.mark_read() {
            self.store.update_notification(notification.clone())?;
        }
        Ok(notification)
    }

    /// Deletes read notifications older than the retention window.
    pub fn cleanup_notifications(&self, now: DateTime<Utc>) -> Result<usize, VerificationError> {
        let threshold = Duration::try_days(self.config.notification_retention_days.max(0))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let removed = self.store.delete_read_before(threshold)?;
        if removed > 0 {
            info!(removed, "old notifications removed");
        }
        Ok(removed)
    }
}

fn non_blank(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::BlankField(field))
    } else {
        Ok(trimmed.to_string())
    }
}
