use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Document, DocumentId, DocumentStatus, DocumentType, UserAccount, UserRole};
use super::repository::{DocumentRepository, RepositoryError};
use super::requirements;

/// Status of one required document, derived from the latest upload of that type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStatus {
    Missing,
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl From<DocumentStatus> for ChecklistStatus {
    fn from(value: DocumentStatus) -> Self {
        match value {
            DocumentStatus::Pending => ChecklistStatus::Pending,
            DocumentStatus::Approved => ChecklistStatus::Approved,
            DocumentStatus::Rejected => ChecklistStatus::Rejected,
            DocumentStatus::Expired => ChecklistStatus::Expired,
        }
    }
}

impl ChecklistStatus {
    /// Never uploaded or turned down. An expired item still blocks verification but is not
    /// reported as missing.
    pub fn needs_submission(self) -> bool {
        matches!(self, ChecklistStatus::Missing | ChecklistStatus::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub document_type: DocumentType,
    pub label: &'static str,
    pub status: ChecklistStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Builds the checklist for `role` from every document the user ever uploaded.
pub fn build_checklist(role: UserRole, documents: &[Document]) -> Vec<ChecklistItem> {
    let required = requirements::required_document_types(role);
    if required.is_empty() {
        return Vec::new();
    }

    let mut latest: HashMap<DocumentType, &Document> = HashMap::new();
    for document in documents {
        latest
            .entry(document.document_type)
            .and_modify(|current| {
                if document.recency() > current.recency() {
                    *current = document;
                }
            })
            .or_insert(document);
    }

    required
        .iter()
        .map(|kind| match latest.get(kind) {
            Some(document) => ChecklistItem {
                document_type: *kind,
                label: kind.label(),
                status: document.status.into(),
                document_id: Some(document.id),
                uploaded_at: Some(document.uploaded_at),
            },
            None => ChecklistItem {
                document_type: *kind,
                label: kind.label(),
                status: ChecklistStatus::Missing,
                document_id: None,
                uploaded_at: None,
            },
        })
        .collect()
}

/// `floor(approved / required * 100)`; vacuously 100 when nothing is required.
pub fn completion_percentage(checklist: &[ChecklistItem]) -> u8 {
    if checklist.is_empty() {
        return 100;
    }

    let approved = checklist
        .iter()
        .filter(|item| item.status == ChecklistStatus::Approved)
        .count();
    (approved * 100 / checklist.len()) as u8
}

/// False for an empty checklist: "nothing required" is not "fully verified".
pub fn all_approved(checklist: &[ChecklistItem]) -> bool {
    !checklist.is_empty()
        && checklist
            .iter()
            .all(|item| item.status == ChecklistStatus::Approved)
}

pub fn missing_types(checklist: &[ChecklistItem]) -> Vec<DocumentType> {
    checklist
        .iter()
        .filter(|item| item.status.needs_submission())
        .map(|item| item.document_type)
        .collect()
}

/// Read-side view over the document repository; holds no state of its own.
pub struct DocumentChecklistService<R> {
    documents: Arc<R>,
}

impl<R> Clone for DocumentChecklistService<R> {
    fn clone(&self) -> Self {
        Self {
            documents: Arc::clone(&self.documents),
        }
    }
}

impl<R> DocumentChecklistService<R>
where
    R: DocumentRepository,
{
    pub fn new(documents: Arc<R>) -> Self {
        Self { documents }
    }

    pub fn get_required_document_types(role: UserRole) -> Vec<DocumentType> {
        requirements::required_document_types(role).to_vec()
    }

    pub fn get_checklist(&self, user: &UserAccount) -> Result<Vec<ChecklistItem>, RepositoryError> {
        if requirements::required_document_types(user.role).is_empty() {
            return Ok(Vec::new());
        }
        let documents = self.documents.documents_for(user.id)?;
        Ok(build_checklist(user.role, &documents))
    }

    pub fn get_completion_percentage(&self, user: &UserAccount) -> Result<u8, RepositoryError> {
        Ok(completion_percentage(&self.get_checklist(user)?))
    }

    pub fn are_all_required_approved(&self, user: &UserAccount) -> Result<bool, RepositoryError> {
        Ok(all_approved(&self.get_checklist(user)?))
    }

    pub fn get_missing_document_types(
        &self,
        user: &UserAccount,
    ) -> Result<Vec<DocumentType>, RepositoryError> {
        Ok(missing_types(&self.get_checklist(user)?))
    }
}
