//! Surgeon decisions and the derived consensus state.
//!
//! Consensus is never stored client-side: it is recomputed from decisions
//! (or re-fetched from the backend) after every mutation.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::surgery::{CaseStatus, SurgeryId};

/// Number of independent reviews required to finalize a case.
pub const QUORUM: u32 = 3;

/// Accepted reviews (out of `QUORUM`) required for the case to proceed.
pub const ACCEPT_MAJORITY: u32 = 2;

/// A single surgeon's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Accepted,
    Declined,
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionStatus::Accepted => f.write_str("ACCEPTED"),
            DecisionStatus::Declined => f.write_str("DECLINED"),
        }
    }
}

/// Fixed list of clinical factors a surgeon can tick when reviewing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClinicalFactor {
    PatientAge,
    Comorbidities,
    SurgicalRisk,
    AnesthesiaRisk,
    ExpectedOutcome,
    AlternativeTreatments,
    PatientPreference,
    ResourceAvailability,
}

impl ClinicalFactor {
    pub const ALL: [ClinicalFactor; 8] = [
        ClinicalFactor::PatientAge,
        ClinicalFactor::Comorbidities,
        ClinicalFactor::SurgicalRisk,
        ClinicalFactor::AnesthesiaRisk,
        ClinicalFactor::ExpectedOutcome,
        ClinicalFactor::AlternativeTreatments,
        ClinicalFactor::PatientPreference,
        ClinicalFactor::ResourceAvailability,
    ];

    /// The camelCase key used in `factorsConsidered`.
    pub fn key(&self) -> &'static str {
        match self {
            ClinicalFactor::PatientAge => "patientAge",
            ClinicalFactor::Comorbidities => "comorbidities",
            ClinicalFactor::SurgicalRisk => "surgicalRisk",
            ClinicalFactor::AnesthesiaRisk => "anesthesiaRisk",
            ClinicalFactor::ExpectedOutcome => "expectedOutcome",
            ClinicalFactor::AlternativeTreatments => "alternativeTreatments",
            ClinicalFactor::PatientPreference => "patientPreference",
            ClinicalFactor::ResourceAvailability => "resourceAvailability",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClinicalFactor::PatientAge => "Patient age",
            ClinicalFactor::Comorbidities => "Comorbidities",
            ClinicalFactor::SurgicalRisk => "Surgical risk",
            ClinicalFactor::AnesthesiaRisk => "Anesthesia risk",
            ClinicalFactor::ExpectedOutcome => "Expected outcome",
            ClinicalFactor::AlternativeTreatments => "Alternative treatments",
            ClinicalFactor::PatientPreference => "Patient preference",
            ClinicalFactor::ResourceAvailability => "Resource availability",
        }
    }

    /// Look a factor up by its wire key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// Which factors a surgeon considered.
pub type FactorMap = BTreeMap<ClinicalFactor, bool>;

/// A factor map with every factor unticked.
pub fn blank_factors() -> FactorMap {
    ClinicalFactor::ALL.into_iter().map(|f| (f, false)).collect()
}

/// `POST /api/surgical-decisions` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDecision {
    pub surgery_id: SurgeryId,
    pub surgeon_name: String,
    pub decision_status: DecisionStatus,
    pub comments: String,
    pub factors_considered: FactorMap,
}

/// A recorded decision. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub surgery_id: SurgeryId,
    pub surgeon_name: String,
    pub decision_status: DecisionStatus,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub factors_considered: FactorMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The binding outcome once quorum is met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusOutcome {
    Accept,
    Decline,
}

impl ConsensusOutcome {
    /// The case status this outcome writes back.
    pub fn target_status(&self) -> CaseStatus {
        match self {
            ConsensusOutcome::Accept => CaseStatus::Scheduled,
            ConsensusOutcome::Decline => CaseStatus::Cancelled,
        }
    }
}

/// Tally of decisions for one case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusState {
    pub total_decisions: u32,
    pub accepted: u32,
    pub declined: u32,
    #[serde(default)]
    pub consensus_reached: bool,
}

impl ConsensusState {
    /// Recompute the tally from decision records.
    pub fn from_decisions(decisions: &[Decision]) -> Self {
        let accepted = decisions
            .iter()
            .filter(|d| d.decision_status == DecisionStatus::Accepted)
            .count() as u32;
        let total = decisions.len() as u32;
        Self {
            total_decisions: total,
            accepted,
            declined: total - accepted,
            consensus_reached: false,
        }
        .normalized()
    }

    /// Recompute `consensus_reached` from the quorum rule, ignoring whatever
    /// the backend reported.
    pub fn normalized(mut self) -> Self {
        self.consensus_reached = self.total_decisions >= QUORUM;
        self
    }

    /// `None` until quorum; then `Accept` iff `accepted >= ACCEPT_MAJORITY`.
    pub fn outcome(&self) -> Option<ConsensusOutcome> {
        if self.total_decisions < QUORUM {
            return None;
        }
        if self.accepted >= ACCEPT_MAJORITY {
            Some(ConsensusOutcome::Accept)
        } else {
            Some(ConsensusOutcome::Decline)
        }
    }

    /// More decisions than the quorum, e.g. two reviewers racing the last slot.
    pub fn exceeds_quorum(&self) -> bool {
        self.total_decisions > QUORUM
    }

    /// Review slots still open before quorum.
    pub fn remaining(&self) -> u32 {
        QUORUM.saturating_sub(self.total_decisions)
    }
}
