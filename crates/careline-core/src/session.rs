//! The session/token manager.
//!
//! `SessionManager` owns the access/refresh token pair and the signed-in
//! user, and is the only path authenticated calls take to the backend:
//!
//!   request → attach bearer → Transport → 401? → refresh → retry once
//!
//! The retry is bounded by the `retried` flag on the request itself, so a
//! second 401 is handed back to the caller rather than looping. A refresh
//! that the backend rejects (401/403), or a 401 with no refresh token to
//! exchange, tears the session down and signals the observer to send the
//! user back to login.
//!
//! There is no global state: the hosting application constructs one manager
//! (init restores from the `SessionStore`) and passes it to whatever needs
//! authenticated access. Concurrent requests that race a refresh are not
//! coordinated; each may trigger its own refresh.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use careline_contracts::{
    error::{CarelineError, CarelineResult},
    http::{ApiRequest, ApiResponse},
    session::{
        AuthTokens, Credentials, RefreshRequest, RefreshedTokens, Session, SessionPhase,
        SignupRequest, UserProfile,
    },
};

use crate::traits::{EndReason, SessionObserver, SessionStore, Transport};

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key for the serialized `UserProfile`.
pub const USER_KEY: &str = "user";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

pub const SIGNIN_PATH: &str = "/auth/signin";
pub const SIGNUP_PATH: &str = "/auth/signup";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";

const DEFAULT_CREDENTIALS_MESSAGE: &str = "invalid username or password";

/// Result of one refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed,
    /// The session was cleared; the caller must redirect to login.
    TornDown(EndReason),
    /// Transient failure (network, 5xx, bad body). The session is kept.
    Failed,
}

struct ManagerState {
    session: Session,
    refreshing: bool,
}

/// Holds the client session and performs every authenticated call.
pub struct SessionManager {
    transport: Box<dyn Transport>,
    store: Box<dyn SessionStore>,
    observer: Option<Box<dyn SessionObserver>>,
    state: Mutex<ManagerState>,
}

impl SessionManager {
    /// Create a manager, restoring any session persisted in `store`.
    pub fn new(
        transport: Box<dyn Transport>,
        store: Box<dyn SessionStore>,
    ) -> CarelineResult<Self> {
        let session = restore(store.as_ref())?;
        if session.is_authenticated() {
            debug!("restored persisted session");
        }
        Ok(Self {
            transport,
            store,
            observer: None,
            state: Mutex::new(ManagerState {
                session,
                refreshing: false,
            }),
        })
    }

    /// Attach the listener that receives the redirect-to-login signal.
    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.lock().session.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().session.is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.lock().session.user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().session.access_token.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        let state = self.lock();
        if state.refreshing {
            SessionPhase::Refreshing
        } else if state.session.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }

    // ── Sign-in / sign-up ────────────────────────────────────────────────────

    /// Sign in and persist the resulting session.
    ///
    /// Blank fields fail with `Validation` before anything is sent. A 401/403
    /// from the backend yields `InvalidCredentials` and leaves the session
    /// anonymous.
    pub fn login(&self, username: &str, password: &str) -> CarelineResult<Session> {
        require("username", username)?;
        require("password", password)?;

        let request = ApiRequest::post(SIGNIN_PATH).with_json(&Credentials {
            username: username.trim().to_string(),
            password: password.to_string(),
        })?;
        let response = self.transport.execute(&request)?;
        self.establish(response)
    }

    /// Register a new account and sign in with it.
    pub fn signup(&self, signup: &SignupRequest) -> CarelineResult<Session> {
        require("username", &signup.username)?;
        require("email", &signup.email)?;
        require("password", &signup.password)?;

        let request = ApiRequest::post(SIGNUP_PATH).with_json(signup)?;
        let response = self.transport.execute(&request)?;
        self.establish(response)
    }

    fn establish(&self, response: ApiResponse) -> CarelineResult<Session> {
        if response.is_auth_failure() {
            let message = response
                .error_message()
                .unwrap_or_else(|| DEFAULT_CREDENTIALS_MESSAGE.to_string());
            warn!(status = response.status, "sign-in rejected");
            return Err(CarelineError::InvalidCredentials { message });
        }

        let tokens: AuthTokens = response.into_result()?.json()?;
        let session = Session::from_tokens(tokens);
        self.persist(&session)?;
        self.lock().session = session.clone();

        info!(
            username = session.user.as_ref().map(|u| u.username.as_str()).unwrap_or("<unknown>"),
            "session established"
        );
        Ok(session)
    }

    // ── Authenticated calls ──────────────────────────────────────────────────

    /// Send `request` with the current bearer token.
    ///
    /// On a 401, and only if `request.retried` is unset, the manager runs one
    /// refresh cycle and re-issues a single copy carrying the new token. A
    /// 401 on that copy ends the session. Any other status from the copy is
    /// handed back as-is.
    ///
    /// # Errors
    ///
    /// - `Network` from the transport, never retried.
    /// - `SessionExpired` when the refresh tore the session down, or when the
    ///   refreshed token was still rejected.
    ///
    /// HTTP failures are returned as `Ok(response)`; decode them with
    /// `ApiResponse::into_result`.
    pub fn authorized_request(&self, mut request: ApiRequest) -> CarelineResult<ApiResponse> {
        request.bearer = self.access_token();

        debug!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            retried = request.retried,
            "sending authorized request"
        );
        let response = self.transport.execute(&request)?;

        if !response.is_unauthorized() || request.retried {
            return Ok(response);
        }

        request.retried = true;
        debug!(request_id = %request.id, "401 received, refreshing access token");

        match self.refresh_once() {
            RefreshOutcome::Refreshed => {
                request.bearer = self.access_token();
                debug!(request_id = %request.id, "retrying request with refreshed token");
                let retry = self.transport.execute(&request)?;
                if retry.is_unauthorized() {
                    warn!(request_id = %request.id, "refreshed token rejected; ending session");
                    self.teardown(EndReason::RetryRejected);
                    return Err(CarelineError::SessionExpired {
                        reason: "request rejected after token refresh".to_string(),
                    });
                }
                Ok(retry)
            }
            RefreshOutcome::TornDown(reason) => Err(CarelineError::SessionExpired {
                reason: match reason {
                    EndReason::MissingRefreshToken => "no refresh token available".to_string(),
                    _ => "refresh token rejected".to_string(),
                },
            }),
            RefreshOutcome::Failed => Ok(response),
        }
    }

    // ── Refresh ──────────────────────────────────────────────────────────────

    /// Exchange the refresh token for a new token pair.
    ///
    /// Returns `false` without a network call when no refresh token is held;
    /// the session is left as it is. A 401/403 from the backend clears the
    /// session and signals the observer. Transient failures return `false`
    /// and keep the session.
    ///
    /// A missing refresh token only forces a logout on the 401 path of
    /// `authorized_request`.
    pub fn refresh(&self) -> bool {
        if self.lock().session.refresh_token.is_none() {
            debug!("no refresh token held; nothing to refresh");
            return false;
        }
        self.refresh_once() == RefreshOutcome::Refreshed
    }

    fn refresh_once(&self) -> RefreshOutcome {
        let refresh_token = self.lock().session.refresh_token.clone();
        let Some(refresh_token) = refresh_token else {
            warn!("no refresh token held; ending session");
            self.teardown(EndReason::MissingRefreshToken);
            return RefreshOutcome::TornDown(EndReason::MissingRefreshToken);
        };

        self.lock().refreshing = true;
        let outcome = self.exchange_refresh_token(refresh_token);
        self.lock().refreshing = false;
        outcome
    }

    fn exchange_refresh_token(&self, refresh_token: String) -> RefreshOutcome {
        let request = match ApiRequest::post(REFRESH_PATH).with_json(&RefreshRequest { refresh_token }) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "could not build refresh request");
                return RefreshOutcome::Failed;
            }
        };

        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "token refresh failed; keeping session");
                return RefreshOutcome::Failed;
            }
        };

        if response.is_auth_failure() {
            warn!(status = response.status, "refresh token rejected; ending session");
            self.teardown(EndReason::RefreshRejected);
            return RefreshOutcome::TornDown(EndReason::RefreshRejected);
        }
        if !response.is_success() {
            warn!(status = response.status, "token refresh returned an error; keeping session");
            return RefreshOutcome::Failed;
        }

        let refreshed: RefreshedTokens = match response.json() {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(error = %e, "malformed refresh response; keeping session");
                return RefreshOutcome::Failed;
            }
        };

        let session = {
            let mut state = self.lock();
            state.session.apply_refresh(refreshed);
            state.session.clone()
        };
        if let Err(e) = self.persist(&session) {
            warn!(error = %e, "refreshed tokens could not be persisted");
        }

        info!("access token refreshed");
        RefreshOutcome::Refreshed
    }

    // ── Logout / teardown ────────────────────────────────────────────────────

    /// Best-effort server-side logout, then unconditional local teardown.
    pub fn logout(&self) {
        if let Some(token) = self.access_token() {
            let mut request = ApiRequest::post(LOGOUT_PATH);
            request.bearer = Some(token);
            match self.transport.execute(&request) {
                Ok(response) if response.is_success() => debug!("server-side logout acknowledged"),
                Ok(response) => debug!(status = response.status, "server-side logout not acknowledged"),
                Err(e) => debug!(error = %e, "server-side logout failed; continuing"),
            }
        }
        self.teardown(EndReason::LoggedOut);
    }

    fn teardown(&self, reason: EndReason) {
        if let Err(e) = self.store.remove_all(&SESSION_KEYS) {
            warn!(error = %e, "failed to clear persisted session");
        }
        self.lock().session = Session::anonymous();

        info!(reason = ?reason, "session ended");
        if let Some(observer) = &self.observer {
            observer.session_ended(reason);
        }
    }

    fn persist(&self, session: &Session) -> CarelineResult<()> {
        if let Some(token) = &session.access_token {
            self.store.set(ACCESS_TOKEN_KEY, token)?;
        }
        if let Some(token) = &session.refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, token)?;
        }
        match &session.user {
            Some(user) => {
                let json = serde_json::to_string(user).map_err(|e| CarelineError::Storage {
                    reason: format!("failed to serialize user profile: {}", e),
                })?;
                self.store.set(USER_KEY, &json)
            }
            None => self.store.remove_all(&[USER_KEY]),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn restore(store: &dyn SessionStore) -> CarelineResult<Session> {
    let user = match store.get(USER_KEY)? {
        Some(json) => match serde_json::from_str::<UserProfile>(&json) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable persisted user profile");
                None
            }
        },
        None => None,
    };
    Ok(Session {
        access_token: store.get(ACCESS_TOKEN_KEY)?,
        refresh_token: store.get(REFRESH_TOKEN_KEY)?,
        user,
    })
}

fn require(field: &str, value: &str) -> CarelineResult<()> {
    if value.trim().is_empty() {
        return Err(CarelineError::validation(field, "must not be blank"));
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use careline_contracts::{
        error::{CarelineError, CarelineResult, NetworkFailure},
        http::{ApiRequest, ApiResponse},
        session::SessionPhase,
    };

    use crate::traits::{EndReason, SessionObserver, SessionStore, Transport};

    use super::*;

    // ── Mock helpers ─────────────────────────────────────────────────────────

    /// A transport that replays canned responses and records every request.
    #[derive(Clone, Default)]
    struct ScriptedTransport {
        responses: Arc<Mutex<VecDeque<CarelineResult<ApiResponse>>>>,
        requests: Arc<Mutex<Vec<ApiRequest>>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<CarelineResult<ApiResponse>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into())),
                requests: Arc::new(Mutex::new(vec![])),
            }
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: &ApiRequest) -> CarelineResult<ApiResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected request to {}", request.path))
        }
    }

    #[derive(Clone, Default)]
    struct MapStore {
        entries: Arc<Mutex<HashMap<String, String>>>,
    }

    impl SessionStore for MapStore {
        fn get(&self, key: &str) -> CarelineResult<Option<String>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> CarelineResult<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove_all(&self, keys: &[&str]) -> CarelineResult<()> {
            let mut entries = self.entries.lock().unwrap();
            for key in keys {
                entries.remove(*key);
            }
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingObserver {
        ended: Arc<Mutex<Vec<EndReason>>>,
    }

    impl SessionObserver for RecordingObserver {
        fn session_ended(&self, reason: EndReason) {
            self.ended.lock().unwrap().push(reason);
        }
    }

    fn ok(status: u16, body: serde_json::Value) -> CarelineResult<ApiResponse> {
        Ok(ApiResponse::new(status, body.to_string()))
    }

    fn signin_body() -> serde_json::Value {
        serde_json::json!({
            "accessToken": "access-1",
            "refreshToken": "refresh-1",
            "user": { "id": 5, "username": "asingh", "roles": ["SURGEON"] }
        })
    }

    fn manager(
        transport: &ScriptedTransport,
        store: &MapStore,
    ) -> (SessionManager, RecordingObserver) {
        let observer = RecordingObserver::default();
        let manager = SessionManager::new(Box::new(transport.clone()), Box::new(store.clone()))
            .unwrap()
            .with_observer(Box::new(observer.clone()));
        (manager, observer)
    }

    fn signed_in_store() -> MapStore {
        let store = MapStore::default();
        store.set(ACCESS_TOKEN_KEY, "access-1").unwrap();
        store.set(REFRESH_TOKEN_KEY, "refresh-1").unwrap();
        store
    }

    // ── Login ────────────────────────────────────────────────────────────────

    #[test]
    fn login_success_authenticates_and_persists() {
        let transport = ScriptedTransport::new(vec![ok(200, signin_body())]);
        let store = MapStore::default();
        let (manager, _) = manager(&transport, &store);

        assert_eq!(manager.phase(), SessionPhase::Anonymous);
        let session = manager.login("asingh", "s3cret").unwrap();

        assert_eq!(session.access_token.as_deref(), Some("access-1"));
        assert!(manager.is_authenticated());
        assert_eq!(manager.phase(), SessionPhase::Authenticated);
        assert_eq!(manager.current_user().unwrap().username, "asingh");

        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("access-1"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("refresh-1"));
        assert!(store.get(USER_KEY).unwrap().unwrap().contains("asingh"));

        // Sign-in goes out without a bearer token.
        let requests = transport.requests();
        assert_eq!(requests[0].path, SIGNIN_PATH);
        assert!(requests[0].bearer.is_none());
    }

    #[test]
    fn login_invalid_credentials_stays_anonymous() {
        let transport = ScriptedTransport::new(vec![ok(
            401,
            serde_json::json!({ "message": "Bad credentials" }),
        )]);
        let store = MapStore::default();
        let (manager, _) = manager(&transport, &store);

        match manager.login("asingh", "wrong") {
            Err(CarelineError::InvalidCredentials { message }) => {
                assert_eq!(message, "Bad credentials");
            }
            other => panic!("expected InvalidCredentials, got {:?}", other),
        }
        assert!(!manager.is_authenticated());
        assert!(store.get(ACCESS_TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn login_invalid_credentials_without_body_has_message() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(401, ""))]);
        let (manager, _) = manager(&transport, &MapStore::default());

        let err = manager.login("asingh", "wrong").unwrap_err();
        match err {
            CarelineError::InvalidCredentials { message } => assert!(!message.is_empty()),
            other => panic!("expected InvalidCredentials, got {:?}", other),
        }
    }

    #[test]
    fn login_blank_username_is_not_sent() {
        let transport = ScriptedTransport::new(vec![]);
        let (manager, _) = manager(&transport, &MapStore::default());

        let err = manager.login("  ", "pw").unwrap_err();
        assert!(matches!(err, CarelineError::Validation { .. }));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn signup_establishes_session() {
        let transport = ScriptedTransport::new(vec![ok(200, signin_body())]);
        let (manager, _) = manager(&transport, &MapStore::default());

        manager
            .signup(&SignupRequest {
                username: "asingh".to_string(),
                email: "asingh@example.org".to_string(),
                password: "s3cret".to_string(),
                full_name: None,
            })
            .unwrap();

        assert!(manager.is_authenticated());
        assert_eq!(transport.requests()[0].path, SIGNUP_PATH);
    }

    // ── Refresh-and-retry ────────────────────────────────────────────────────

    #[test]
    fn unauthorized_request_refreshes_and_retries_once_with_new_token() {
        let transport = ScriptedTransport::new(vec![
            Ok(ApiResponse::new(401, "")),
            ok(200, serde_json::json!({ "accessToken": "access-2", "refreshToken": "refresh-2" })),
            ok(200, serde_json::json!([])),
        ]);
        let store = signed_in_store();
        let (manager, observer) = manager(&transport, &store);

        let original = ApiRequest::get("/api/surgeries/pending-consent");
        let original_id = original.id;
        let response = manager.authorized_request(original).unwrap();
        assert_eq!(response.status, 200);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].bearer.as_deref(), Some("access-1"));
        assert_eq!(requests[1].path, REFRESH_PATH);
        assert!(requests[1].bearer.is_none());

        // Exactly one retried copy of the original, carrying the new token.
        let retries: Vec<_> = requests.iter().filter(|r| r.id == original_id && r.retried).collect();
        assert_eq!(retries.len(), 1);
        assert_eq!(retries[0].bearer.as_deref(), Some("access-2"));

        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("refresh-2"));
        assert!(observer.ended.lock().unwrap().is_empty());
    }

    #[test]
    fn second_unauthorized_ends_session_without_refreshing_again() {
        let transport = ScriptedTransport::new(vec![
            Ok(ApiResponse::new(401, "")),
            ok(200, serde_json::json!({ "accessToken": "access-2" })),
            Ok(ApiResponse::new(401, r#"{"message":"still no"}"#)),
        ]);
        let store = signed_in_store();
        let (manager, observer) = manager(&transport, &store);

        let err = manager
            .authorized_request(ApiRequest::get("/api/surgeries/pending-consent"))
            .unwrap_err();
        assert!(matches!(err, CarelineError::SessionExpired { .. }));
        assert_eq!(transport.requests().len(), 3);
        assert!(!manager.is_authenticated());
        assert!(store.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert_eq!(*observer.ended.lock().unwrap(), vec![EndReason::RetryRejected]);
    }

    #[test]
    fn caller_flagged_retry_is_returned_as_is() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(401, ""))]);
        let (manager, observer) = manager(&transport, &signed_in_store());

        let mut request = ApiRequest::get("/api/surgeries/pending-consent");
        request.retried = true;
        let response = manager.authorized_request(request).unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(transport.requests().len(), 1);
        assert!(manager.is_authenticated());
        assert!(observer.ended.lock().unwrap().is_empty());
    }

    #[test]
    fn unauthorized_without_refresh_token_forces_logout() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(401, ""))]);
        let store = MapStore::default();
        store.set(ACCESS_TOKEN_KEY, "access-1").unwrap();
        let (manager, observer) = manager(&transport, &store);

        let err = manager
            .authorized_request(ApiRequest::get("/api/surgeries/pending-consent"))
            .unwrap_err();
        assert!(matches!(err, CarelineError::SessionExpired { .. }));
        assert!(!manager.is_authenticated());
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(
            *observer.ended.lock().unwrap(),
            vec![EndReason::MissingRefreshToken]
        );
    }

    #[test]
    fn refresh_rejected_tears_down_session() {
        let transport = ScriptedTransport::new(vec![
            Ok(ApiResponse::new(401, "")),
            Ok(ApiResponse::new(403, "")),
        ]);
        let store = signed_in_store();
        let (manager, observer) = manager(&transport, &store);

        let err = manager
            .authorized_request(ApiRequest::get("/api/surgeries/pending-consent"))
            .unwrap_err();
        assert!(matches!(err, CarelineError::SessionExpired { .. }));
        assert!(!manager.is_authenticated());
        assert!(store.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert!(store.get(REFRESH_TOKEN_KEY).unwrap().is_none());
        assert_eq!(*observer.ended.lock().unwrap(), vec![EndReason::RefreshRejected]);
        // No retry after a rejected refresh.
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn refresh_without_token_makes_no_network_call() {
        let transport = ScriptedTransport::new(vec![]);
        let (manager, observer) = manager(&transport, &MapStore::default());

        assert!(!manager.refresh());
        assert!(transport.requests().is_empty());
        assert!(observer.ended.lock().unwrap().is_empty());
    }

    #[test]
    fn direct_refresh_without_token_keeps_access_token() {
        let transport = ScriptedTransport::new(vec![]);
        let store = MapStore::default();
        store.set(ACCESS_TOKEN_KEY, "access-1").unwrap();
        let (manager, observer) = manager(&transport, &store);

        assert!(!manager.refresh());
        assert!(transport.requests().is_empty());
        assert!(manager.is_authenticated());
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("access-1"));
        assert!(observer.ended.lock().unwrap().is_empty());
    }

    #[test]
    fn refresh_network_failure_keeps_session() {
        let transport = ScriptedTransport::new(vec![Err(CarelineError::Network {
            kind: NetworkFailure::Timeout,
            reason: "timed out".to_string(),
        })]);
        let (manager, observer) = manager(&transport, &signed_in_store());

        assert!(!manager.refresh());
        assert!(manager.is_authenticated());
        assert!(observer.ended.lock().unwrap().is_empty());
        assert_eq!(manager.phase(), SessionPhase::Authenticated);
    }

    #[test]
    fn network_error_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Err(CarelineError::Network {
            kind: NetworkFailure::Connect,
            reason: "connection refused".to_string(),
        })]);
        let (manager, _) = manager(&transport, &signed_in_store());

        let err = manager
            .authorized_request(ApiRequest::get("/api/surgeries/pending-consent"))
            .unwrap_err();
        assert!(matches!(err, CarelineError::Network { kind: NetworkFailure::Connect, .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn forbidden_does_not_trigger_refresh() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(403, ""))]);
        let (manager, _) = manager(&transport, &signed_in_store());

        let response = manager
            .authorized_request(ApiRequest::get("/api/surgeries/pending-consent"))
            .unwrap();
        assert_eq!(response.status, 403);
        assert_eq!(transport.requests().len(), 1);
        assert!(manager.is_authenticated());
    }

    // ── Logout / restore ─────────────────────────────────────────────────────

    #[test]
    fn logout_swallows_server_errors_and_clears_state() {
        let transport = ScriptedTransport::new(vec![Err(CarelineError::Network {
            kind: NetworkFailure::Connect,
            reason: "offline".to_string(),
        })]);
        let store = signed_in_store();
        let (manager, observer) = manager(&transport, &store);

        manager.logout();

        assert!(!manager.is_authenticated());
        assert!(store.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert_eq!(*observer.ended.lock().unwrap(), vec![EndReason::LoggedOut]);
        assert_eq!(transport.requests()[0].path, LOGOUT_PATH);
        assert_eq!(transport.requests()[0].bearer.as_deref(), Some("access-1"));
    }

    #[test]
    fn new_manager_restores_persisted_session() {
        let transport = ScriptedTransport::new(vec![ok(200, signin_body())]);
        let store = MapStore::default();
        let (first, _) = manager(&transport, &store);
        first.login("asingh", "s3cret").unwrap();

        let (second, _) = manager(&ScriptedTransport::default(), &store);
        assert_eq!(second.session(), first.session());
    }
}
