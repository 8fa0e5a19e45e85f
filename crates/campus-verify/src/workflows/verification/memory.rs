use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{Document, DocumentId, DocumentStatus, UserAccount, UserId};
use super::repository::{
    DocumentRepository, NotificationRepository, RepositoryError, UserDirectory,
};
use crate::workflows::notifications::{Notification, NotificationId};

/// Process-local store backing the demo server, the CLI and the tests.
#[derive(Default, Clone)]
pub struct InMemoryVerificationStore {
    users: Arc<Mutex<BTreeMap<UserId, UserAccount>>>,
    documents: Arc<Mutex<BTreeMap<DocumentId, Document>>>,
    notifications: Arc<Mutex<BTreeMap<NotificationId, Notification>>>,
    sequence: Arc<AtomicU64>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

impl InMemoryVerificationStore {
    fn next(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl UserDirectory for InMemoryVerificationStore {
    fn next_user_id(&self) -> UserId {
        UserId(self.next())
    }

    fn insert_user(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        let mut guard = lock(&self.users)?;
        if guard.contains_key(&account.id)
            || guard.values().any(|existing| existing.email == account.email)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(account.id, account.clone());
        Ok(account)
    }

    fn update_user(&self, account: UserAccount) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.users)?;
        match guard.get_mut(&account.id) {
            Some(slot) => {
                *slot = account;
                Ok(())
            }
            None => Err(RepositoryError::NotFound { entity: "user" }),
        }
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(lock(&self.users)?.get(&id).cloned())
    }

    fn admins(&self) -> Result<Vec<UserAccount>, RepositoryError> {
        Ok(lock(&self.users)?
            .values()
            .filter(|account| account.is_admin())
            .cloned()
            .collect())
    }
}

impl DocumentRepository for InMemoryVerificationStore {
    fn next_document_id(&self) -> DocumentId {
        DocumentId(self.next())
    }

    fn insert_documents(&self, documents: Vec<Document>) -> Result<Vec<Document>, RepositoryError> {
        let mut guard = lock(&self.documents)?;
        if documents.iter().any(|document| guard.contains_key(&document.id)) {
            return Err(RepositoryError::Conflict);
        }
        for document in &documents {
            guard.insert(document.id, document.clone());
        }
        Ok(documents)
    }

    fn update_document(&self, document: Document) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.documents)?;
        match guard.get_mut(&document.id) {
            Some(slot) => {
                *slot = document;
                Ok(())
            }
            None => Err(RepositoryError::NotFound { entity: "document" }),
        }
    }

    fn fetch_document(&self, id: DocumentId) -> Result<Option<Document>, RepositoryError> {
        Ok(lock(&self.documents)?.get(&id).cloned())
    }

    fn documents_for(&self, owner: UserId) -> Result<Vec<Document>, RepositoryError> {
        Ok(lock(&self.documents)?
            .values()
            .filter(|document| document.owner == owner)
            .cloned()
            .collect())
    }

    fn documents_with_status(
        &self,
        status: DocumentStatus,
    ) -> Result<Vec<Document>, RepositoryError> {
        Ok(lock(&self.documents)?
            .values()
            .filter(|document| document.status == status)
            .cloned()
            .collect())
    }
}

impl NotificationRepository for InMemoryVerificationStore {
    fn next_notification_id(&self) -> NotificationId {
        NotificationId(self.next())
    }

    fn insert_notification(&self, notification: Notification) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.notifications)?;
        if guard.contains_key(&notification.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(notification.id, notification);
        Ok(())
    }

    fn update_notification(&self, notification: Notification) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.notifications)?;
        match guard.get_mut(&notification.id) {
            Some(slot) => {
                *slot = notification;
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                entity: "notification",
            }),
        }
    }

    fn fetch_notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        Ok(lock(&self.notifications)?.get(&id).cloned())
    }

    fn notifications_for(&self, recipient: UserId) -> Result<Vec<Notification>, RepositoryError> {
        Ok(lock(&self.notifications)?
            .values()
            .filter(|notification| notification.recipient == recipient)
            .cloned()
            .collect())
    }

    fn delete_read_before(&self, threshold: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let mut guard = lock(&self.notifications)?;
        let before = guard.len();
        guard.retain(|_, notification| !(notification.is_read && notification.created_at < threshold));
        Ok(before - guard.len())
    }
}
