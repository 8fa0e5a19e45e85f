use chrono::{DateTime, Utc};

use super::domain::{Document, DocumentId, DocumentStatus, UserAccount, UserId};
use crate::workflows::notifications::{Notification, NotificationId};

/// Error enumeration for storage failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Role directory that issues and mutates accounts.
pub trait UserDirectory: Send + Sync {
    fn next_user_id(&self) -> UserId;
    fn insert_user(&self, account: UserAccount) -> Result<UserAccount, RepositoryError>;
    fn update_user(&self, account: UserAccount) -> Result<(), RepositoryError>;
    fn fetch_user(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError>;
    /// Active administrators, the audience for review requests.
    fn admins(&self) -> Result<Vec<UserAccount>, RepositoryError>;
}

/// Document rows. Rows are never deleted; newer uploads supersede older ones.
pub trait DocumentRepository: Send + Sync {
    fn next_document_id(&self) -> DocumentId;
    fn insert_documents(&self, documents: Vec<Document>) -> Result<Vec<Document>, RepositoryError>;
    fn update_document(&self, document: Document) -> Result<(), RepositoryError>;
    fn fetch_document(&self, id: DocumentId) -> Result<Option<Document>, RepositoryError>;
    fn documents_for(&self, owner: UserId) -> Result<Vec<Document>, RepositoryError>;
    fn documents_with_status(
        &self,
        status: DocumentStatus,
    ) -> Result<Vec<Document>, RepositoryError>;
}

/// In-app notification rows.
pub trait NotificationRepository: Send + Sync {
    fn next_notification_id(&self) -> NotificationId;
    fn insert_notification(&self, notification: Notification) -> Result<(), RepositoryError>;
    fn update_notification(&self, notification: Notification) -> Result<(), RepositoryError>;
    fn fetch_notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError>;
    fn notifications_for(&self, recipient: UserId) -> Result<Vec<Notification>, RepositoryError>;
    /// Removes read notifications created before `threshold`, returning how many went away.
    fn delete_read_before(&self, threshold: DateTime<Utc>) -> Result<usize, RepositoryError>;
}

/// Everything the verification workflow persists.
pub trait VerificationStore: UserDirectory + DocumentRepository + NotificationRepository {}

impl<T> VerificationStore for T where T: UserDirectory + DocumentRepository + NotificationRepository {}
