//! Surgical case types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend identifier of a surgical case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurgeryId(pub i64);

impl fmt::Display for SurgeryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clinical urgency of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Emergency,
    Urgent,
    Routine,
    #[serde(alias = "SCHEDULED")]
    Elective,
}

/// Lifecycle status of a case: `PENDING_CONSENT → SCHEDULED | CANCELLED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    PendingConsent,
    Scheduled,
    Cancelled,
}

impl CaseStatus {
    /// The wire value used in `?status=` query parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::PendingConsent => "PENDING_CONSENT",
            CaseStatus::Scheduled => "SCHEDULED",
            CaseStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A surgical case awaiting (or past) the multi-surgeon decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurgicalCase {
    pub surgery_id: SurgeryId,
    pub patient_id: i64,
    pub procedure_name: String,
    #[serde(default)]
    pub diagnosis: String,
    pub urgency: Urgency,
    pub status: CaseStatus,
}
