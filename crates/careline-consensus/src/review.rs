//! The surgeon review form and its local validation.
//!
//! Validation happens entirely client-side: a form that fails it never
//! reaches the backend, so it cannot change the decision count.

use careline_contracts::{
    decision::{blank_factors, ClinicalFactor, DecisionStatus, FactorMap, NewDecision},
    error::{CarelineError, CarelineResult},
    surgery::SurgeryId,
};

/// What a surgeon fills in for one review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewForm {
    pub surgeon_name: String,
    /// `None` until the surgeon picks accept or decline.
    pub decision: Option<DecisionStatus>,
    pub comments: String,
    pub factors: FactorMap,
}

impl ReviewForm {
    /// An empty form with every factor unticked.
    pub fn blank() -> Self {
        Self {
            surgeon_name: String::new(),
            decision: None,
            comments: String::new(),
            factors: blank_factors(),
        }
    }

    pub fn new(surgeon_name: impl Into<String>, decision: DecisionStatus) -> Self {
        Self {
            surgeon_name: surgeon_name.into(),
            decision: Some(decision),
            ..Self::blank()
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    pub fn with_factor(mut self, factor: ClinicalFactor, considered: bool) -> Self {
        self.factors.insert(factor, considered);
        self
    }

    /// Check required fields. Surgeon name and decision must be present.
    pub fn validate(&self) -> CarelineResult<ValidReview> {
        let surgeon_name = self.surgeon_name.trim();
        if surgeon_name.is_empty() {
            return Err(CarelineError::validation("surgeonName", "surgeon name is required"));
        }
        let decision = self
            .decision
            .ok_or_else(|| CarelineError::validation("decisionStatus", "a decision is required"))?;

        // Factors missing from the map count as not considered.
        let mut factors = blank_factors();
        factors.extend(self.factors.iter().map(|(k, v)| (*k, *v)));

        Ok(ValidReview {
            surgeon_name: surgeon_name.to_string(),
            decision,
            comments: self.comments.trim().to_string(),
            factors,
        })
    }
}

impl Default for ReviewForm {
    fn default() -> Self {
        Self::blank()
    }
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReview {
    pub surgeon_name: String,
    pub decision: DecisionStatus,
    pub comments: String,
    pub factors: FactorMap,
}

impl ValidReview {
    /// Key used to detect a surgeon reviewing the same case twice.
    pub fn reviewer_key(&self) -> String {
        self.surgeon_name.to_lowercase()
    }

    pub fn into_decision(self, surgery_id: SurgeryId) -> NewDecision {
        NewDecision {
            surgery_id,
            surgeon_name: self.surgeon_name,
            decision_status: self.decision,
            comments: self.comments,
            factors_considered: self.factors,
        }
    }
}
