//! The surgical decision consensus engine.
//!
//! Drives the sequential-review workflow for one selected case:
//!
//!   SELECTING ──select──▶ REVIEWING ──submit (total < 3)──▶ REVIEWING
//!                              │
//!                              └──submit (total reaches 3)──▶ DECIDED
//!
//! The backend owns the decision count. After every submission the engine
//! re-fetches the tally instead of counting locally. Once a tally at quorum
//! has been seen for a case that is still `PENDING_CONSENT`, the engine owes
//! exactly one status write (`SCHEDULED` on a 2-of-3 accept, `CANCELLED`
//! otherwise). The write is issued right after the submission that reaches
//! quorum. If it cannot go out then, it stays pending until
//! `finalize_pending` succeeds. A completed write is never re-issued.
//!
//! Nothing here coordinates with other clients. Two sessions that observe
//! quorum at the same time will each issue their own status write.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use careline_contracts::{
    decision::{ConsensusOutcome, ConsensusState, QUORUM},
    error::{CarelineError, CarelineResult},
    surgery::{CaseStatus, SurgeryId, SurgicalCase},
};
use careline_core::traits::SurgeryBackend;

use crate::review::ReviewForm;

/// Where the engine is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    /// No case chosen.
    Selecting,
    /// A case is chosen and still has open review slots.
    Reviewing,
    /// Quorum reached; terminal for the selected case.
    Decided(ConsensusOutcome),
}

#[derive(Debug, Clone)]
struct SelectedCase {
    case: SurgicalCase,
    consensus: ConsensusState,
    /// A decision went out but the tally after it was never fetched.
    stale: bool,
}

/// Runs the multi-surgeon review for pending-consent cases.
pub struct ConsensusEngine<B: SurgeryBackend> {
    backend: B,
    selected: Option<SelectedCase>,
    /// Cases whose status write this engine completed.
    status_written: HashSet<SurgeryId>,
    /// Reviewers who submitted through this engine, per case.
    reviewers: HashMap<SurgeryId, HashSet<String>>,
}

impl<B: SurgeryBackend> ConsensusEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            selected: None,
            status_written: HashSet::new(),
            reviewers: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Cases awaiting the decision.
    pub fn pending_cases(&self) -> CarelineResult<Vec<SurgicalCase>> {
        self.backend.pending_cases()
    }

    // ── Selection ────────────────────────────────────────────────────────────

    /// Choose `case` and load its existing decision count from the backend.
    ///
    /// The case may already carry reviews from other sessions. Selecting a
    /// case that is already at quorum lands in `Decided` without writing; the
    /// owed status write is left to `finalize_pending`.
    pub fn select_case(&mut self, case: SurgicalCase) -> CarelineResult<ConsensusState> {
        let consensus = self.backend.consensus(case.surgery_id)?;
        info!(
            surgery_id = %case.surgery_id,
            procedure = %case.procedure_name,
            total = consensus.total_decisions,
            "case selected for review"
        );
        let surgery_id = case.surgery_id;
        self.selected = Some(SelectedCase {
            case,
            consensus,
            stale: false,
        });
        warn_if_over_quorum(surgery_id, &consensus);
        if let Some(status) = self.pending_status_write() {
            info!(surgery_id = %surgery_id, status = %status, "quorum already reached; status write pending");
        }
        Ok(consensus)
    }

    /// Select a pending-consent case by id.
    pub fn select_case_by_id(&mut self, surgery_id: SurgeryId) -> CarelineResult<ConsensusState> {
        let case = self
            .backend
            .pending_cases()?
            .into_iter()
            .find(|c| c.surgery_id == surgery_id)
            .ok_or_else(|| CarelineError::Workflow {
                reason: format!("surgery {} is not pending consent", surgery_id),
            })?;
        self.select_case(case)
    }

    /// Return to `Selecting`.
    pub fn deselect(&mut self) {
        if let Some(selected) = self.selected.take() {
            debug!(surgery_id = %selected.case.surgery_id, "case deselected");
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn phase(&self) -> WorkflowPhase {
        match &self.selected {
            None => WorkflowPhase::Selecting,
            Some(selected) => match selected.consensus.outcome() {
                None => WorkflowPhase::Reviewing,
                Some(outcome) => WorkflowPhase::Decided(outcome),
            },
        }
    }

    pub fn selected_case(&self) -> Option<&SurgicalCase> {
        self.selected.as_ref().map(|s| &s.case)
    }

    /// The last tally fetched for the selected case.
    pub fn consensus(&self) -> Option<ConsensusState> {
        self.selected.as_ref().map(|s| s.consensus)
    }

    /// The status the selected case still owes the backend, if any.
    ///
    /// `Some` once a tally at quorum has been seen for a case that is still
    /// `PENDING_CONSENT` and this engine has not completed its write.
    pub fn pending_status_write(&self) -> Option<CaseStatus> {
        let selected = self.selected.as_ref()?;
        let outcome = selected.consensus.outcome()?;
        if selected.case.status != CaseStatus::PendingConsent
            || self.status_written.contains(&selected.case.surgery_id)
        {
            return None;
        }
        Some(outcome.target_status())
    }

    // ── Review submission ────────────────────────────────────────────────────

    /// Submit one surgeon's review for the selected case.
    ///
    /// If the tally after an earlier submission could not be fetched, it is
    /// re-fetched first, so a case that already reached quorum is never sent
    /// a fourth review.
    ///
    /// # Errors
    ///
    /// - `Workflow` when no case is selected or the case is already decided.
    /// - `Validation` for a blank surgeon name or a missing decision; nothing
    ///   is sent and the tally is unchanged.
    /// - `DuplicateReviewer` when this engine already submitted a review from
    ///   the same surgeon for this case.
    /// - Any backend error from the submission, the re-fetch, or the status
    ///   write. A failed re-fetch or status write leaves the write pending.
    pub fn submit_review(&mut self, form: ReviewForm) -> CarelineResult<ConsensusState> {
        let surgery_id = self.selected_id()?;
        if self.selected.as_ref().is_some_and(|s| s.stale) {
            debug!(surgery_id = %surgery_id, "tally out of date; re-fetching before submission");
            self.refresh_consensus()?;
        }
        if let WorkflowPhase::Decided(outcome) = self.phase() {
            return Err(CarelineError::Workflow {
                reason: format!(
                    "surgery {} already has a binding decision ({:?})",
                    surgery_id, outcome
                ),
            });
        }

        let review = form.validate()?;
        let reviewer = review.reviewer_key();
        if self
            .reviewers
            .get(&surgery_id)
            .is_some_and(|seen| seen.contains(&reviewer))
        {
            warn!(surgery_id = %surgery_id, surgeon = %review.surgeon_name, "duplicate reviewer rejected");
            return Err(CarelineError::DuplicateReviewer {
                surgery_id: surgery_id.0,
                surgeon: review.surgeon_name,
            });
        }

        let decision = review.into_decision(surgery_id);
        self.mark_stale(surgery_id);
        self.backend.submit_decision(&decision)?;
        self.reviewers.entry(surgery_id).or_default().insert(reviewer);

        // Server truth, never a local increment.
        let consensus = self.backend.consensus(surgery_id)?;
        self.store_consensus(surgery_id, consensus);
        debug!(
            surgery_id = %surgery_id,
            total = consensus.total_decisions,
            remaining = consensus.remaining(),
            "review submitted"
        );

        self.finalize_pending()?;
        Ok(consensus)
    }

    /// Re-fetch the tally for the selected case. Never writes status.
    pub fn refresh_consensus(&mut self) -> CarelineResult<ConsensusState> {
        let surgery_id = self.selected_id()?;
        let consensus = self.backend.consensus(surgery_id)?;
        self.store_consensus(surgery_id, consensus);
        Ok(consensus)
    }

    /// Issue the status write the selected case still owes, if any.
    ///
    /// Returns the status written, or `None` when nothing was pending. On
    /// failure the write stays pending and can be attempted again.
    pub fn finalize_pending(&mut self) -> CarelineResult<Option<CaseStatus>> {
        let Some(status) = self.pending_status_write() else {
            return Ok(None);
        };
        let surgery_id = self.selected_id()?;
        info!(surgery_id = %surgery_id, status = %status, "consensus reached; writing case status");

        if let Err(e) = self.backend.update_status(surgery_id, status) {
            warn!(surgery_id = %surgery_id, error = %e, "status write failed; still pending");
            return Err(e);
        }
        self.status_written.insert(surgery_id);
        if let Some(selected) = self.selected.as_mut() {
            selected.case.status = status;
        }
        Ok(Some(status))
    }

    fn selected_id(&self) -> CarelineResult<SurgeryId> {
        self.selected
            .as_ref()
            .map(|s| s.case.surgery_id)
            .ok_or_else(|| CarelineError::Workflow {
                reason: "no case selected".to_string(),
            })
    }

    fn mark_stale(&mut self, surgery_id: SurgeryId) {
        if let Some(selected) = self.selected.as_mut() {
            if selected.case.surgery_id == surgery_id {
                selected.stale = true;
            }
        }
    }

    fn store_consensus(&mut self, surgery_id: SurgeryId, consensus: ConsensusState) {
        warn_if_over_quorum(surgery_id, &consensus);
        if let Some(selected) = self.selected.as_mut() {
            if selected.case.surgery_id == surgery_id {
                selected.consensus = consensus;
                selected.stale = false;
            }
        }
    }
}

fn warn_if_over_quorum(surgery_id: SurgeryId, consensus: &ConsensusState) {
    if consensus.exceeds_quorum() {
        warn!(
            surgery_id = %surgery_id,
            total = consensus.total_decisions,
            quorum = QUORUM,
            "more decisions recorded than the quorum allows"
        );
    }
}
