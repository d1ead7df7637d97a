//! Seam traits for the Careline client.
//!
//! - `Transport`: sends one `ApiRequest` and returns the raw response
//! - `SessionStore`: session-scoped key/value persistence for tokens
//! - `SessionObserver`: receives the "go back to login" signal
//! - `SurgeryBackend`: the four calls the consensus workflow needs
//!
//! Production implementations live in `careline-http`, `careline-storage`
//! and `service::SurgeryService`; tests supply mocks.

use careline_contracts::{
    decision::{ConsensusState, Decision, NewDecision},
    error::CarelineResult,
    http::{ApiRequest, ApiResponse},
    surgery::{CaseStatus, SurgeryId, SurgicalCase},
};

/// Sends requests to the backend.
pub trait Transport: Send + Sync {
    /// Execute `request` once.
    ///
    /// Every HTTP status, including 4xx/5xx, is returned as `Ok`. Only
    /// connectivity failures (connect, timeout) are `Err(Network)`.
    /// Implementations never retry.
    fn execute(&self, request: &ApiRequest) -> CarelineResult<ApiResponse>;
}

/// Client-side persistence for the session under fixed keys.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> CarelineResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> CarelineResult<()>;

    /// Remove every key in `keys` as one operation.
    fn remove_all(&self, keys: &[&str]) -> CarelineResult<()>;
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    LoggedOut,
    /// The backend rejected the refresh token (401/403).
    RefreshRejected,
    /// A 401 arrived and there was no refresh token to exchange.
    MissingRefreshToken,
    /// The request was still rejected with 401 after a successful refresh.
    RetryRejected,
}

/// Receives the redirect-to-login signal when a session is torn down.
pub trait SessionObserver: Send + Sync {
    fn session_ended(&self, reason: EndReason);
}

/// Backend operations used by the consensus workflow.
pub trait SurgeryBackend {
    fn pending_cases(&self) -> CarelineResult<Vec<SurgicalCase>>;

    /// Current tally for `surgery_id`, normalized to the quorum rule.
    fn consensus(&self, surgery_id: SurgeryId) -> CarelineResult<ConsensusState>;

    fn submit_decision(&self, decision: &NewDecision) -> CarelineResult<Decision>;

    fn update_status(&self, surgery_id: SurgeryId, status: CaseStatus) -> CarelineResult<()>;
}

impl<B: SurgeryBackend + ?Sized> SurgeryBackend for &B {
    fn pending_cases(&self) -> CarelineResult<Vec<SurgicalCase>> {
        (**self).pending_cases()
    }

    fn consensus(&self, surgery_id: SurgeryId) -> CarelineResult<ConsensusState> {
        (**self).consensus(surgery_id)
    }

    fn submit_decision(&self, decision: &NewDecision) -> CarelineResult<Decision> {
        (**self).submit_decision(decision)
    }

    fn update_status(&self, surgery_id: SurgeryId, status: CaseStatus) -> CarelineResult<()> {
        (**self).update_status(surgery_id, status)
    }
}
