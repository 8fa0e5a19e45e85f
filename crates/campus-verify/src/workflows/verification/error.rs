use super::domain::{DocumentStatus, DocumentType, UserRole};
use super::repository::RepositoryError;

/// Caller-facing validation failures, reported synchronously.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown document type '{0}'")]
    UnknownDocumentType(String),
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error("unknown profile action '{0}'")]
    UnknownProfileAction(String),
    #[error("document type '{document_type}' is not accepted for role '{role}'")]
    DocumentTypeNotAllowed {
        role: UserRole,
        document_type: DocumentType,
    },
    #[error("a rejection reason is required")]
    MissingRejectionReason,
    #[error("document is {} and can no longer be reviewed", .from.label())]
    InvalidTransition { from: DocumentStatus },
    #[error("at least one document is required")]
    EmptySubmission,
    #[error("field '{0}' must not be blank")]
    BlankField(&'static str),
}

/// Error raised by the verification service.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("operation requires an administrator")]
    PermissionDenied,
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for VerificationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound { entity } => Self::NotFound { entity },
            other => Self::Repository(other),
        }
    }
}
