//! # careline-consensus
//!
//! Multi-surgeon surgical decision workflow for the Careline client.
//!
//! Up to three surgeons review a pending-consent case one after another.
//! Once three decisions exist the case is accepted iff at least two of them
//! are `ACCEPTED`, and the engine writes the case status (`SCHEDULED` or
//! `CANCELLED`) back to the backend exactly once.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use careline_consensus::{ConsensusEngine, ReviewForm};
//! use careline_contracts::decision::DecisionStatus;
//!
//! let mut engine = ConsensusEngine::new(surgery_service);
//! engine.select_case_by_id(SurgeryId(31))?;
//! let tally = engine.submit_review(ReviewForm::new("Dr. Osei", DecisionStatus::Accepted))?;
//! ```

pub mod engine;
pub mod review;

pub use engine::{ConsensusEngine, WorkflowPhase};
pub use review::{ReviewForm, ValidReview};

// ── Tests ─────────────────────────────────────────────────────────────────────
