use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::config::VerificationConfig;
use crate::workflows::notifications::{
    EmailDispatch, EmailJob, EmailTemplate, Notification, NotificationId, NotificationKind,
};
use crate::workflows::verification::domain::{
    Document, DocumentId, DocumentStatus, DocumentUpload, Registration, ReviewDecision,
    UserAccount, UserId,
};
use crate::workflows::verification::repository::{
    DocumentRepository, NotificationRepository, RepositoryError, UserDirectory,
};
use crate::workflows::verification::{
    verification_router, InMemoryVerificationStore, VerificationService,
};

pub(super) type TestService = VerificationService<InMemoryVerificationStore, RecordingDispatch>;

#[derive(Default)]
pub(super) struct RecordingDispatch {
    jobs: Mutex<Vec<EmailJob>>,
}

impl RecordingDispatch {
    pub(super) fn jobs(&self) -> Vec<EmailJob> {
        self.jobs.lock().expect("dispatch mutex poisoned").clone()
    }

    pub(super) fn templates_for(&self, recipient: &str) -> Vec<EmailTemplate> {
        self.jobs()
            .into_iter()
            .filter(|job| job.recipient == recipient)
            .map(|job| job.template)
            .collect()
    }
}

impl EmailDispatch for RecordingDispatch {
    fn dispatch(&self, job: EmailJob) {
        self.jobs.lock().expect("dispatch mutex poisoned").push(job);
    }
}

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryVerificationStore>,
    Arc<RecordingDispatch>,
) {
    let store = Arc::new(InMemoryVerificationStore::default());
    let dispatch = Arc::new(RecordingDispatch::default());
    let service = VerificationService::new(
        store.clone(),
        dispatch.clone(),
        VerificationConfig::default(),
    );
    (service, store, dispatch)
}

pub(super) fn register(service: &TestService, role: &str, email: &str) -> UserAccount {
    service
        .register_user(Registration {
            email: email.to_string(),
            display_name: format!("{role} account"),
            role: role.to_string(),
        })
        .expect("registration succeeds")
}

pub(super) fn admin(service: &TestService) -> UserAccount {
    register(service, "admin", "admin@campus.test")
}

pub(super) fn upload(document_type: &str) -> DocumentUpload {
    DocumentUpload {
        document_type: document_type.to_string(),
        title: format!("{document_type} scan"),
        description: String::new(),
        storage_key: format!("documents/{document_type}.pdf"),
        file_name: format!("{document_type}.pdf"),
        size_bytes: Some(524_288),
        expiry_date: None,
    }
}

pub(super) fn expiring_upload(document_type: &str, expiry_date: NaiveDate) -> DocumentUpload {
    DocumentUpload {
        expiry_date: Some(expiry_date),
        ..upload(document_type)
    }
}

pub(super) const DRIVER_DOCUMENTS: [&str; 5] = [
    "id_card",
    "address_proof",
    "driver_license",
    "vehicle_insurance",
    "vehicle_registration",
];

/// Submits and approves every required driver document.
pub(super) fn verified_driver(service: &TestService, reviewer: &UserAccount) -> UserAccount {
    let driver = register(service, "driver", "driver@campus.test");
    let documents = service
        .submit_verification_documents(
            driver.id,
            DRIVER_DOCUMENTS.iter().map(|kind| upload(kind)).collect(),
        )
        .expect("submission succeeds");
    for document in documents {
        service
            .verify_document(document.id, reviewer.id, ReviewDecision::Approve)
            .expect("approval succeeds");
    }
    service.user(driver.id).expect("driver exists")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn kinds_for(store: &InMemoryVerificationStore, user: UserId) -> Vec<NotificationKind> {
    let mut notifications = store.notifications_for(user).expect("notifications load");
    notifications.sort_by_key(|notification| notification.id);
    notifications
        .into_iter()
        .map(|notification| notification.kind)
        .collect()
}

pub(super) fn backdate(
    store: &InMemoryVerificationStore,
    id: DocumentId,
    uploaded_at: DateTime<Utc>,
) {
    let mut document = store
        .fetch_document(id)
        .expect("fetch succeeds")
        .expect("document present");
    document.uploaded_at = uploaded_at;
    store.update_document(document).expect("update succeeds");
}

pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl UserDirectory for UnavailableStore {
    fn next_user_id(&self) -> UserId {
        UserId(1)
    }

    fn insert_user(&self, _account: UserAccount) -> Result<UserAccount, RepositoryError> {
        offline()
    }

    fn update_user(&self, _account: UserAccount) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_user(&self, _id: UserId) -> Result<Option<UserAccount>, RepositoryError> {
        offline()
    }

    fn admins(&self) -> Result<Vec<UserAccount>, RepositoryError> {
        offline()
    }
}

impl DocumentRepository for UnavailableStore {
    fn next_document_id(&self) -> DocumentId {
        DocumentId(1)
    }

    fn insert_documents(&self, _documents: Vec<Document>) -> Result<Vec<Document>, RepositoryError> {
        offline()
    }

    fn update_document(&self, _document: Document) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_document(&self, _id: DocumentId) -> Result<Option<Document>, RepositoryError> {
        offline()
    }

    fn documents_for(&self, _owner: UserId) -> Result<Vec<Document>, RepositoryError> {
        offline()
    }

    fn documents_with_status(
        &self,
        _status: DocumentStatus,
    ) -> Result<Vec<Document>, RepositoryError> {
        offline()
    }
}

impl NotificationRepository for UnavailableStore {
    fn next_notification_id(&self) -> NotificationId {
        NotificationId(1)
    }

    fn insert_notification(&self, _notification: Notification) -> Result<(), RepositoryError> {
        offline()
    }

    fn update_notification(&self, _notification: Notification) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_notification(
        &self,
        _id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        offline()
    }

    fn notifications_for(&self, _recipient: UserId) -> Result<Vec<Notification>, RepositoryError> {
        offline()
    }

    fn delete_read_before(&self, _threshold: DateTime<Utc>) -> Result<usize, RepositoryError> {
        offline()
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    verification_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
