//! Document verification: role requirements, per-user checklists, admin review and the
//! profile status machine driven by document decisions.

pub mod checklist;
pub mod domain;
pub mod error;
pub mod maintenance;
pub mod memory;
pub mod repository;
pub mod requirements;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use checklist::{ChecklistItem, ChecklistStatus, DocumentChecklistService};
pub use domain::{
    Document, DocumentId, DocumentStatus, DocumentType, DocumentUpload, DocumentView,
    ProfileAction, Registration, ReviewDecision, StoredFile, UserAccount, UserAccountView, UserId,
    UserRole, VerificationStatus,
};
pub use error::{ValidationError, VerificationError};
pub use maintenance::{run_maintenance, MaintenanceReport};
pub use memory::InMemoryVerificationStore;
pub use repository::{
    DocumentRepository, NotificationRepository, RepositoryError, UserDirectory, VerificationStore,
};
pub use router::{verification_router, ActingUser, ACTING_USER_HEADER};
pub use service::{VerificationService, VerificationSummary};
