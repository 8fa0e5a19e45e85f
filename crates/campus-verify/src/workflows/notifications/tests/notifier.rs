use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::workflows::notifications::{
    resolve_rejection_reason, EmailDispatch, EmailJob, EmailTemplate, NotificationKind,
    StatusNotifier,
};
use crate::workflows::verification::repository::{NotificationRepository, UserDirectory};
use crate::workflows::verification::{
    Document, DocumentStatus, DocumentType, InMemoryVerificationStore, StoredFile, UserAccount,
    UserRole, VerificationStatus,
};

#[derive(Default)]
struct Outbox {
    jobs: Mutex<Vec<EmailJob>>,
}

impl Outbox {
    fn jobs(&self) -> Vec<EmailJob> {
        self.jobs.lock().expect("outbox mutex poisoned").clone()
    }
}

impl EmailDispatch for Outbox {
    fn dispatch(&self, job: EmailJob) {
        self.jobs.lock().expect("outbox mutex poisoned").push(job);
    }
}

fn account(store: &InMemoryVerificationStore, role: UserRole, email: &str) -> UserAccount {
    store
        .insert_user(UserAccount {
            id: store.next_user_id(),
            email: email.to_string(),
            display_name: String::new(),
            role,
            verification_status: VerificationStatus::Pending,
            is_active: true,
            verified_at: None,
            verified_by: None,
            verification_note: String::new(),
            created_at: Utc::now(),
        })
        .expect("insert succeeds")
}

fn document(owner: &UserAccount) -> Document {
    Document {
        id: crate::workflows::verification::DocumentId(42),
        owner: owner.id,
        document_type: DocumentType::DriverLicense,
        title: "License front".to_string(),
        description: String::new(),
        file: StoredFile::new("documents/license.jpg".to_string(), "license.jpg".to_string(), None),
        status: DocumentStatus::Pending,
        uploaded_at: Utc::now(),
        expiry_date: None,
        verified_by: None,
        verified_at: None,
        rejection_reason: String::new(),
    }
}

fn setup() -> (
    StatusNotifier<InMemoryVerificationStore, Outbox>,
    Arc<InMemoryVerificationStore>,
    Arc<Outbox>,
) {
    let store = Arc::new(InMemoryVerificationStore::default());
    let outbox = Arc::new(Outbox::default());
    (
        StatusNotifier::new(store.clone(), outbox.clone()),
        store,
        outbox,
    )
}

#[test]
fn reason_codes_expand_and_free_text_passes_through() {
    assert_eq!(
        resolve_rejection_reason(" wrong_type "),
        "Wrong document type"
    );
    assert_eq!(
        resolve_rejection_reason("Photo is cropped"),
        "Photo is cropped"
    );
}

#[test]
fn submissions_skip_inactive_admins() {
    let (notifier, store, outbox) = setup();
    let active = account(&store, UserRole::Admin, "active@campus.test");
    let mut inactive = account(&store, UserRole::Admin, "inactive@campus.test");
    inactive.is_active = false;
    store.update_user(inactive.clone()).expect("update succeeds");
    let driver = account(&store, UserRole::Driver, "driver@campus.test");

    notifier
        .document_submitted(&driver, &document(&driver))
        .expect("notify succeeds");

    assert_eq!(store.notifications_for(active.id).expect("loads").len(), 1);
    assert!(store.notifications_for(inactive.id).expect("loads").is_empty());
    let jobs = outbox.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].recipient, "active@campus.test");
    assert_eq!(jobs[0].template, EmailTemplate::DocumentSubmittedAdmin);
    assert!(jobs[0].body.contains("driver@campus.test"));
    assert_eq!(
        jobs[0].payload.get("document_type").map(String::as_str),
        Some("driver_license")
    );
}

#[test]
fn rejection_notice_carries_the_resolved_reason() {
    let (notifier, store, outbox) = setup();
    let driver = account(&store, UserRole::Driver, "driver@campus.test");

    notifier
        .document_rejected(&driver, &document(&driver), "illegible")
        .expect("notify succeeds");

    let stored = store.notifications_for(driver.id).expect("loads");
    assert_eq!(stored[0].kind, NotificationKind::DocumentRejected);
    assert!(stored[0].message.ends_with("Document is illegible or of poor quality"));
    assert_eq!(
        outbox.jobs()[0].payload.get("rejection_reason").map(String::as_str),
        Some("Document is illegible or of poor quality")
    );
}

#[test]
fn profile_changes_pick_kind_template_and_note() {
    let (notifier, store, outbox) = setup();
    let landlord = account(&store, UserRole::Landlord, "landlord@campus.test");

    notifier
        .profile_status_changed(
            &landlord,
            VerificationStatus::Pending,
            VerificationStatus::Verified,
            "",
        )
        .expect("notify succeeds");
    notifier
        .profile_status_changed(
            &landlord,
            VerificationStatus::Verified,
            VerificationStatus::Suspended,
            "Fraud check",
        )
        .expect("notify succeeds");

    let mut stored = store.notifications_for(landlord.id).expect("loads");
    stored.sort_by_key(|notification| notification.id);
    assert_eq!(stored[0].kind, NotificationKind::ProfileVerified);
    assert!(!stored[0].message.contains("Note:"));
    assert_eq!(stored[1].kind, NotificationKind::ProfileSuspended);
    assert!(stored[1].message.contains("from \"verified\" to \"suspended\""));
    assert!(stored[1].message.ends_with("Note: Fraud check"));

    let templates: Vec<_> = outbox.jobs().iter().map(|job| job.template).collect();
    assert_eq!(
        templates,
        vec![EmailTemplate::ProfileVerified, EmailTemplate::ProfileStatus]
    );
}
