//! REST wrappers for the surgical-decision endpoints.
//!
//! `SurgeryService` implements `SurgeryBackend` on top of a shared
//! `SessionManager`, so every call carries the bearer token and gets the
//! one-shot refresh-and-retry behaviour. Error bodies are decoded here,
//! once, via `ApiResponse::into_result`.

use std::sync::Arc;

use tracing::{debug, info};

use careline_contracts::{
    decision::{ConsensusState, Decision, NewDecision},
    error::CarelineResult,
    http::ApiRequest,
    surgery::{CaseStatus, SurgeryId, SurgicalCase},
};

use crate::session::SessionManager;
use crate::traits::SurgeryBackend;

pub const PENDING_CONSENT_PATH: &str = "/api/surgeries/pending-consent";
pub const DECISIONS_PATH: &str = "/api/surgical-decisions";

pub fn consensus_path(surgery_id: SurgeryId) -> String {
    format!("/api/surgical-decisions/consensus/{}", surgery_id)
}

pub fn status_path(surgery_id: SurgeryId) -> String {
    format!("/api/surgeries/{}/status", surgery_id)
}

/// Surgery and decision endpoints, authenticated through a `SessionManager`.
#[derive(Clone)]
pub struct SurgeryService {
    session: Arc<SessionManager>,
}

impl SurgeryService {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }
}

impl SurgeryBackend for SurgeryService {
    fn pending_cases(&self) -> CarelineResult<Vec<SurgicalCase>> {
        let response = self
            .session
            .authorized_request(ApiRequest::get(PENDING_CONSENT_PATH))?
            .into_result()?;
        let cases: Vec<SurgicalCase> = response.json()?;
        debug!(count = cases.len(), "loaded pending-consent cases");
        Ok(cases)
    }

    fn consensus(&self, surgery_id: SurgeryId) -> CarelineResult<ConsensusState> {
        let response = self
            .session
            .authorized_request(ApiRequest::get(consensus_path(surgery_id)))?
            .into_result()?;
        let state = response.json::<ConsensusState>()?.normalized();
        debug!(
            surgery_id = %surgery_id,
            total = state.total_decisions,
            accepted = state.accepted,
            declined = state.declined,
            "fetched consensus"
        );
        Ok(state)
    }

    fn submit_decision(&self, decision: &NewDecision) -> CarelineResult<Decision> {
        let request = ApiRequest::post(DECISIONS_PATH).with_json(decision)?;
        let response = self.session.authorized_request(request)?.into_result()?;
        let recorded: Decision = response.json()?;
        info!(
            surgery_id = %decision.surgery_id,
            decision = %decision.decision_status,
            "decision recorded"
        );
        Ok(recorded)
    }

    fn update_status(&self, surgery_id: SurgeryId, status: CaseStatus) -> CarelineResult<()> {
        let request = ApiRequest::put(status_path(surgery_id)).with_query("status", status.as_str());
        self.session.authorized_request(request)?.into_result()?;
        info!(surgery_id = %surgery_id, status = %status, "case status updated");
        Ok(())
    }
}
