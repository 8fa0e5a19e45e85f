use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::verification::domain::{UserId, VerificationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ntf-{:06}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DocumentSubmitted,
    DocumentApproved,
    DocumentRejected,
    DocumentExpired,
    DocumentExpiring,
    ProfileVerified,
    ProfileRejected,
    ProfileSuspended,
    ProfileIncomplete,
    System,
}

impl NotificationKind {
    pub fn for_profile_status(status: VerificationStatus) -> Self {
        match status {
            VerificationStatus::Verified => NotificationKind::ProfileVerified,
            VerificationStatus::Rejected => NotificationKind::ProfileRejected,
            VerificationStatus::Suspended => NotificationKind::ProfileSuspended,
            VerificationStatus::Incomplete => NotificationKind::ProfileIncomplete,
            VerificationStatus::Pending | VerificationStatus::UnderReview => {
                NotificationKind::System
            }
        }
    }
}

/// In-app message for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Returns whether the flag actually changed.
    pub fn mark_read(&mut self) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationFeed {
    pub unread_count: usize,
    pub notifications: Vec<Notification>,
}
