//! # careline-contracts
//!
//! Shared types, wire contracts, and errors for the Careline clinic client.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate beyond the consensus tally and error-body decoding.

pub mod decision;
pub mod error;
pub mod http;
pub mod session;
pub mod surgery;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use decision::{
        blank_factors, ClinicalFactor, ConsensusOutcome, ConsensusState, Decision, DecisionStatus,
        NewDecision,
    };
    use error::CarelineError;
    use http::ApiResponse;
    use session::{AuthTokens, RefreshedTokens, Session};
    use surgery::{CaseStatus, SurgeryId, SurgicalCase, Urgency};

    fn decision(status: DecisionStatus) -> Decision {
        Decision {
            id: None,
            surgery_id: SurgeryId(7),
            surgeon_name: "Dr. Okafor".to_string(),
            decision_status: status,
            comments: String::new(),
            factors_considered: blank_factors(),
            created_at: None,
        }
    }

    // ── ConsensusState ───────────────────────────────────────────────────────

    #[test]
    fn consensus_not_reached_below_quorum() {
        for n in 0..3 {
            let decisions: Vec<Decision> =
                (0..n).map(|_| decision(DecisionStatus::Accepted)).collect();
            let state = ConsensusState::from_decisions(&decisions);
            assert_eq!(state.total_decisions, n);
            assert!(!state.consensus_reached);
            assert_eq!(state.outcome(), None);
        }
    }

    #[test]
    fn two_of_three_accepts() {
        let decisions = vec![
            decision(DecisionStatus::Declined),
            decision(DecisionStatus::Accepted),
            decision(DecisionStatus::Accepted),
        ];
        let state = ConsensusState::from_decisions(&decisions);
        assert!(state.consensus_reached);
        assert_eq!(state.accepted, 2);
        assert_eq!(state.declined, 1);
        assert_eq!(state.outcome(), Some(ConsensusOutcome::Accept));
        assert_eq!(
            state.outcome().map(|o| o.target_status()),
            Some(CaseStatus::Scheduled)
        );
    }

    #[test]
    fn one_of_three_declines() {
        let decisions = vec![
            decision(DecisionStatus::Accepted),
            decision(DecisionStatus::Declined),
            decision(DecisionStatus::Declined),
        ];
        let state = ConsensusState::from_decisions(&decisions);
        assert_eq!(state.outcome(), Some(ConsensusOutcome::Decline));
        assert_eq!(
            state.outcome().map(|o| o.target_status()),
            Some(CaseStatus::Cancelled)
        );
    }

    #[test]
    fn fourth_decision_exceeds_quorum() {
        let mut decisions: Vec<Decision> =
            (0..3).map(|_| decision(DecisionStatus::Declined)).collect();
        assert!(!ConsensusState::from_decisions(&decisions).exceeds_quorum());

        decisions.push(decision(DecisionStatus::Accepted));
        let state = ConsensusState::from_decisions(&decisions);
        assert!(state.exceeds_quorum());
        assert_eq!(state.outcome(), Some(ConsensusOutcome::Decline));
    }

    #[test]
    fn normalized_overrides_backend_flag() {
        let reported: ConsensusState = serde_json::from_value(json!({
            "totalDecisions": 2,
            "accepted": 2,
            "declined": 0,
            "consensusReached": true
        }))
        .unwrap();
        let state = reported.normalized();
        assert!(!state.consensus_reached);
        assert_eq!(state.remaining(), 1);
    }

    // ── Wire shapes ──────────────────────────────────────────────────────────

    #[test]
    fn surgical_case_decodes_camel_case() {
        let case: SurgicalCase = serde_json::from_value(json!({
            "surgeryId": 12,
            "patientId": 400,
            "procedureName": "Laparoscopic cholecystectomy",
            "diagnosis": "Symptomatic cholelithiasis",
            "urgency": "SCHEDULED",
            "status": "PENDING_CONSENT",
            "operatingRoom": "OR-3"
        }))
        .unwrap();
        assert_eq!(case.surgery_id, SurgeryId(12));
        assert_eq!(case.urgency, Urgency::Elective);
        assert_eq!(case.status, CaseStatus::PendingConsent);
    }

    #[test]
    fn new_decision_encodes_factor_keys() {
        let mut factors = blank_factors();
        factors.insert(ClinicalFactor::SurgicalRisk, true);
        let body = NewDecision {
            surgery_id: SurgeryId(3),
            surgeon_name: "Dr. Lindqvist".to_string(),
            decision_status: DecisionStatus::Accepted,
            comments: "Low risk profile".to_string(),
            factors_considered: factors,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["surgeryId"], json!(3));
        assert_eq!(value["decisionStatus"], json!("ACCEPTED"));
        assert_eq!(value["factorsConsidered"]["surgicalRisk"], json!(true));
        assert_eq!(value["factorsConsidered"]["patientAge"], json!(false));
        assert_eq!(
            value["factorsConsidered"].as_object().unwrap().len(),
            ClinicalFactor::ALL.len()
        );
    }

    #[test]
    fn factor_keys_round_trip_through_lookup() {
        for factor in ClinicalFactor::ALL {
            assert_eq!(ClinicalFactor::from_key(factor.key()), Some(factor));
        }
        assert_eq!(ClinicalFactor::from_key("bloodType"), None);
    }

    // ── Session ──────────────────────────────────────────────────────────────

    #[test]
    fn refresh_without_new_refresh_token_keeps_old_one() {
        let tokens: AuthTokens = serde_json::from_value(json!({
            "accessToken": "a1",
            "refreshToken": "r1",
            "user": { "id": 1, "username": "mchen" }
        }))
        .unwrap();
        let mut session = Session::from_tokens(tokens);
        assert!(session.is_authenticated());

        session.apply_refresh(RefreshedTokens {
            access_token: "a2".to_string(),
            refresh_token: None,
        });
        assert_eq!(session.access_token.as_deref(), Some("a2"));
        assert_eq!(session.refresh_token.as_deref(), Some("r1"));
    }

    // ── ApiResponse decoding ─────────────────────────────────────────────────

    #[test]
    fn server_error_message_extracted_from_body() {
        let err = ApiResponse::new(409, r#"{"message":"Case already scheduled"}"#)
            .into_result()
            .unwrap_err();
        match err {
            CarelineError::Server { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Case already scheduled");
            }
            other => panic!("expected Server, got {:?}", other),
        }
    }

    #[test]
    fn error_message_falls_back_through_fields() {
        let resp = ApiResponse::new(400, r#"{"message":"","error":"Bad Request"}"#);
        assert_eq!(resp.error_message().as_deref(), Some("Bad Request"));

        let resp = ApiResponse::new(502, "Bad Gateway");
        assert_eq!(resp.error_message().as_deref(), Some("Bad Gateway"));

        let resp = ApiResponse::new(500, "<html><body>oops</body></html>");
        assert_eq!(resp.error_message(), None);
    }

    #[test]
    fn generic_fallback_when_body_empty() {
        let err = ApiResponse::new(500, "").into_result().unwrap_err();
        assert!(err.to_string().contains("request failed with status 500"));
    }

    #[test]
    fn forbidden_maps_to_auth() {
        let err = ApiResponse::new(403, "").into_result().unwrap_err();
        assert!(matches!(err, CarelineError::Auth { status: 403, .. }));
        assert!(err.is_auth());
    }

    // ── CarelineError display messages ───────────────────────────────────────

    #[test]
    fn error_validation_display() {
        let err = CarelineError::validation("surgeonName", "must not be blank");
        let msg = err.to_string();
        assert!(msg.contains("surgeonName"));
        assert!(msg.contains("must not be blank"));
    }

    #[test]
    fn error_duplicate_reviewer_display() {
        let err = CarelineError::DuplicateReviewer {
            surgery_id: 9,
            surgeon: "Dr. Haddad".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Dr. Haddad"));
        assert!(msg.contains("surgery 9"));
    }
}
