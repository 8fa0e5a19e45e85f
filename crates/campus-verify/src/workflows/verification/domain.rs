use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Identifier wrapper for platform accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user-{:06}", self.0)
    }
}

/// Identifier wrapper for uploaded documents. Ids grow with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc-{:06}", self.0)
    }
}

/// Account role issued by the user directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Company,
    School,
    Landlord,
    Driver,
    Partner,
    TrainingCenter,
    Recruiter,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 9] = [
        UserRole::Student,
        UserRole::Company,
        UserRole::School,
        UserRole::Landlord,
        UserRole::Driver,
        UserRole::Partner,
        UserRole::TrainingCenter,
        UserRole::Recruiter,
        UserRole::Admin,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Company => "company",
            UserRole::School => "school",
            UserRole::Landlord => "landlord",
            UserRole::Driver => "driver",
            UserRole::Partner => "partner",
            UserRole::TrainingCenter => "training_center",
            UserRole::Recruiter => "recruiter",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        UserRole::ALL
            .into_iter()
            .find(|role| role.label() == normalized)
            .ok_or_else(|| ValidationError::UnknownRole(value.to_string()))
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Profile-level verification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Incomplete,
    UnderReview,
    Verified,
    Rejected,
    Suspended,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Incomplete => "incomplete",
            VerificationStatus::UnderReview => "under_review",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
            VerificationStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Directory record for a platform account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub verification_status: VerificationStatus,
    pub is_active: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<UserId>,
    pub verification_note: String,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Derived from the status so the flag and the status cannot disagree.
    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin && self.is_active
    }

    pub fn view(&self) -> UserAccountView {
        UserAccountView {
            id: self.id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            verification_status: self.verification_status,
            is_verified: self.is_verified(),
            verification_note: self.verification_note.clone(),
            verified_at: self.verified_at,
        }
    }
}

/// Sanitized representation returned by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAccountView {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub verification_status: VerificationStatus,
    pub is_verified: bool,
    pub verification_note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

/// Registration payload accepted by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub display_name: String,
    pub role: String,
}

/// Fixed vocabulary of uploadable documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdCard,
    AddressProof,
    DriverLicense,
    VehicleInsurance,
    VehicleRegistration,
    PropertyProof,
    HomeInsurance,
    KbisSiret,
    RepresentativeId,
    Accreditation,
    PartnershipProof,
    InternshipConvention,
    Contract,
    AdministrativeDoc,
    Cv,
    CoverLetter,
    Certificate,
    SignedConvention,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 19] = [
        DocumentType::IdCard,
        DocumentType::AddressProof,
        DocumentType::DriverLicense,
        DocumentType::VehicleInsurance,
        DocumentType::VehicleRegistration,
        DocumentType::PropertyProof,
        DocumentType::HomeInsurance,
        DocumentType::KbisSiret,
        DocumentType::RepresentativeId,
        DocumentType::Accreditation,
        DocumentType::PartnershipProof,
        DocumentType::InternshipConvention,
        DocumentType::Contract,
        DocumentType::AdministrativeDoc,
        DocumentType::Cv,
        DocumentType::CoverLetter,
        DocumentType::Certificate,
        DocumentType::SignedConvention,
        DocumentType::Other,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            DocumentType::IdCard => "id_card",
            DocumentType::AddressProof => "address_proof",
            DocumentType::DriverLicense => "driver_license",
            DocumentType::VehicleInsurance => "vehicle_insurance",
            DocumentType::VehicleRegistration => "vehicle_registration",
            DocumentType::PropertyProof => "property_proof",
            DocumentType::HomeInsurance => "home_insurance",
            DocumentType::KbisSiret => "kbis_siret",
            DocumentType::RepresentativeId => "representative_id",
            DocumentType::Accreditation => "accreditation",
            DocumentType::PartnershipProof => "partnership_proof",
            DocumentType::InternshipConvention => "internship_convention",
            DocumentType::Contract => "contract",
            DocumentType::AdministrativeDoc => "administrative_doc",
            DocumentType::Cv => "cv",
            DocumentType::CoverLetter => "cover_letter",
            DocumentType::Certificate => "certificate",
            DocumentType::SignedConvention => "signed_convention",
            DocumentType::Other => "other",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::IdCard => "Identity card",
            DocumentType::AddressProof => "Proof of address",
            DocumentType::DriverLicense => "Driver's license",
            DocumentType::VehicleInsurance => "Vehicle insurance",
            DocumentType::VehicleRegistration => "Vehicle registration",
            DocumentType::PropertyProof => "Proof of ownership",
            DocumentType::HomeInsurance => "Home insurance",
            DocumentType::KbisSiret => "Company registration extract",
            DocumentType::RepresentativeId => "Representative identity card",
            DocumentType::Accreditation => "Accreditation",
            DocumentType::PartnershipProof => "Partnership agreement",
            DocumentType::InternshipConvention => "Internship agreement",
            DocumentType::Contract => "Contract",
            DocumentType::AdministrativeDoc => "Administrative document",
            DocumentType::Cv => "CV",
            DocumentType::CoverLetter => "Cover letter",
            DocumentType::Certificate => "Certificate",
            DocumentType::SignedConvention => "Signed agreement",
            DocumentType::Other => "Other",
        }
    }
}

impl FromStr for DocumentType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        DocumentType::ALL
            .into_iter()
            .find(|kind| kind.code() == normalized)
            .ok_or_else(|| ValidationError::UnknownDocumentType(value.to_string()))
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Review state of a single uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl DocumentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::Expired => "expired",
        }
    }
}

/// Handle to the stored file; the bytes live in the file store under `storage_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub storage_key: String,
    pub file_name: String,
    pub size_bytes: Option<u64>,
    pub mime_type: String,
}

impl StoredFile {
    pub fn new(storage_key: String, file_name: String, size_bytes: Option<u64>) -> Self {
        let mime_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Self {
            storage_key,
            file_name,
            size_bytes,
            mime_type,
        }
    }

    pub fn size_mb(&self) -> f64 {
        match self.size_bytes {
            Some(bytes) => (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
            None => 0.0,
        }
    }
}

/// Uploaded verification document. Superseded rows are kept for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub owner: UserId,
    pub document_type: DocumentType,
    pub title: String,
    pub description: String,
    pub file: StoredFile,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
    pub expiry_date: Option<NaiveDate>,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejection_reason: String,
}

impl Document {
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }

    /// Newest-first ordering key; equal timestamps fall back to insertion order.
    pub(crate) fn recency(&self) -> (DateTime<Utc>, DocumentId) {
        (self.uploaded_at, self.id)
    }

    pub fn view(&self) -> DocumentView {
        DocumentView {
            id: self.id,
            owner: self.owner,
            document_type: self.document_type,
            label: self.document_type.label(),
            title: self.title.clone(),
            status: self.status,
            file_name: self.file.file_name.clone(),
            mime_type: self.file.mime_type.clone(),
            size_mb: self.file.size_mb(),
            uploaded_at: self.uploaded_at,
            expiry_date: self.expiry_date,
            verified_at: self.verified_at,
            rejection_reason: if self.rejection_reason.is_empty() {
                None
            } else {
                Some(self.rejection_reason.clone())
            },
        }
    }
}

/// Sanitized document payload exposed by the API (storage keys stay internal).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub owner: UserId,
    pub document_type: DocumentType,
    pub label: &'static str,
    pub title: String,
    pub status: DocumentStatus,
    pub file_name: String,
    pub mime_type: String,
    pub size_mb: f64,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// One item of a submission batch. The type stays a string until validated against the role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub document_type: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub storage_key: String,
    pub file_name: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// Admin decision on a pending document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject { reason: String },
}

impl ReviewDecision {
    /// Builds a decision from the flat form payload; a rejection needs a non-blank reason.
    pub fn from_parts(approved: bool, reason: Option<String>) -> Result<Self, ValidationError> {
        if approved {
            return Ok(ReviewDecision::Approve);
        }

        match reason.map(|reason| reason.trim().to_string()) {
            Some(reason) if !reason.is_empty() => Ok(ReviewDecision::Reject { reason }),
            _ => Err(ValidationError::MissingRejectionReason),
        }
    }
}

/// Admin actions on a profile's verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileAction {
    Verify,
    Reject,
    Incomplete,
    UnderReview,
    Suspend,
    Unverify,
}

impl ProfileAction {
    pub const fn target_status(self) -> VerificationStatus {
        match self {
            ProfileAction::Verify => VerificationStatus::Verified,
            ProfileAction::Reject => VerificationStatus::Rejected,
            ProfileAction::Incomplete => VerificationStatus::Incomplete,
            ProfileAction::UnderReview => VerificationStatus::UnderReview,
            ProfileAction::Suspend => VerificationStatus::Suspended,
            ProfileAction::Unverify => VerificationStatus::Pending,
        }
    }

    pub const fn default_note(self) -> &'static str {
        match self {
            ProfileAction::Verify => "Profile verified manually by an administrator.",
            ProfileAction::Reject => "Profile rejected.",
            ProfileAction::Incomplete => "Incomplete file: required documents are missing.",
            ProfileAction::UnderReview => "File under review.",
            ProfileAction::Suspend => "Account suspended by an administrator.",
            ProfileAction::Unverify => "Verification withdrawn.",
        }
    }
}

impl FromStr for ProfileAction {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "verify" => Ok(ProfileAction::Verify),
            "reject" => Ok(ProfileAction::Reject),
            "incomplete" => Ok(ProfileAction::Incomplete),
            "under_review" => Ok(ProfileAction::UnderReview),
            "suspend" => Ok(ProfileAction::Suspend),
            "unverify" => Ok(ProfileAction::Unverify),
            _ => Err(ValidationError::UnknownProfileAction(value.to_string())),
        }
    }
}
