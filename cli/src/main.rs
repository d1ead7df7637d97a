//! Careline command-line client.
//!
//! Signs in against the hospital backend and drives the surgical decision
//! workflow. The session is kept in a JSON file between invocations, so
//! `login` once and then run the other subcommands.
//!
//! Usage:
//!   careline login --username coordinator
//!   careline pending
//!   careline consensus 31
//!   careline review 31 --surgeon "Dr. Osei" --decision accepted --factor comorbidities

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use careline_config::ClientConfig;
use careline_consensus::{ConsensusEngine, ReviewForm, WorkflowPhase};
use careline_contracts::{
    decision::{ClinicalFactor, ConsensusState, DecisionStatus},
    error::{CarelineError, CarelineResult},
    session::SignupRequest,
    surgery::SurgeryId,
};
use careline_core::{
    traits::{EndReason, SessionObserver, SurgeryBackend},
    SessionManager, SurgeryService,
};
use careline_http::HttpTransport;
use careline_storage::FileStore;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Careline: hospital client for the surgical decision workflow.
#[derive(Parser)]
#[command(
    name = "careline",
    about = "Careline hospital client",
    long_about = "Signs in to the Careline backend, lists pending-consent surgeries,\n\
                  and records multi-surgeon decisions until the 2-of-3 consensus binds."
)]
struct Cli {
    /// Path to a TOML config file. Built-in defaults apply without it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "CARELINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Register an account and sign in with it.
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "CARELINE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// End the session and clear stored tokens.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List surgeries awaiting the consent decision.
    Pending,
    /// Show the decision tally for a surgery.
    Consensus { surgery_id: i64 },
    /// Write the case status for a surgery whose reviews already reached quorum.
    Finalize { surgery_id: i64 },
    /// Submit one surgeon's review for a surgery.
    Review {
        surgery_id: i64,
        #[arg(long)]
        surgeon: String,
        #[arg(long, value_enum)]
        decision: DecisionArg,
        #[arg(long, default_value = "")]
        comments: String,
        /// Clinical factor considered (repeatable), e.g. `surgicalRisk`.
        #[arg(long = "factor", value_parser = parse_factor)]
        factors: Vec<ClinicalFactor>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionArg {
    Accepted,
    Declined,
}

impl From<DecisionArg> for DecisionStatus {
    fn from(arg: DecisionArg) -> Self {
        match arg {
            DecisionArg::Accepted => DecisionStatus::Accepted,
            DecisionArg::Declined => DecisionStatus::Declined,
        }
    }
}

fn parse_factor(key: &str) -> Result<ClinicalFactor, String> {
    ClinicalFactor::from_key(key).ok_or_else(|| {
        let known: Vec<&str> = ClinicalFactor::ALL.iter().map(|f| f.key()).collect();
        format!("unknown factor '{}' (expected one of: {})", key, known.join(", "))
    })
}

// ── Session wiring ────────────────────────────────────────────────────────────

/// Prints the re-login hint when the backend ends the session.
struct LoginHint;

impl SessionObserver for LoginHint {
    fn session_ended(&self, reason: EndReason) {
        if reason != EndReason::LoggedOut {
            eprintln!("session expired; run `careline login` to sign in again");
        }
    }
}

fn load_config(cli: &Cli) -> CarelineResult<ClientConfig> {
    let config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    match &cli.base_url {
        Some(url) => config.with_base_url(url.clone()),
        None => Ok(config),
    }
}

fn connect(config: &ClientConfig) -> CarelineResult<Arc<SessionManager>> {
    let transport = HttpTransport::new(&config.api.base_url, config.timeout())?;
    let store = FileStore::new(config.session.store_path.clone());
    let manager = SessionManager::new(Box::new(transport), Box::new(store))?
        .with_observer(Box::new(LoginHint));
    Ok(Arc::new(manager))
}

fn require_login(session: &SessionManager) -> CarelineResult<()> {
    if session.is_authenticated() {
        Ok(())
    } else {
        Err(CarelineError::SessionExpired {
            reason: "not signed in; run `careline login` first".to_string(),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug to trace requests and refreshes.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CarelineResult<()> {
    let config = load_config(&cli)?;
    let session = connect(&config)?;

    match cli.command {
        Command::Login { username, password } => {
            let established = session.login(&username, &password)?;
            print_signed_in(established.user.as_ref().map(|u| u.username.as_str()));
        }
        Command::Signup {
            username,
            email,
            password,
            full_name,
        } => {
            let established = session.signup(&SignupRequest {
                username,
                email,
                password,
                full_name,
            })?;
            print_signed_in(established.user.as_ref().map(|u| u.username.as_str()));
        }
        Command::Logout => {
            session.logout();
            println!("Signed out.");
        }
        Command::Whoami => {
            require_login(&session)?;
            match session.current_user() {
                Some(user) => {
                    println!("{} (id {})", user.username, user.id);
                    if let Some(name) = &user.full_name {
                        println!("  name:  {}", name);
                    }
                    if let Some(email) = &user.email {
                        println!("  email: {}", email);
                    }
                    if !user.roles.is_empty() {
                        println!("  roles: {}", user.roles.join(", "));
                    }
                }
                None => println!("Signed in (no profile stored)."),
            }
        }
        Command::Pending => {
            require_login(&session)?;
            run_pending(SurgeryService::new(session))?;
        }
        Command::Consensus { surgery_id } => {
            require_login(&session)?;
            let service = SurgeryService::new(session);
            let tally = service.consensus(SurgeryId(surgery_id))?;
            print_tally(SurgeryId(surgery_id), &tally);
        }
        Command::Finalize { surgery_id } => {
            require_login(&session)?;
            run_finalize(SurgeryService::new(session), SurgeryId(surgery_id))?;
        }
        Command::Review {
            surgery_id,
            surgeon,
            decision,
            comments,
            factors,
        } => {
            require_login(&session)?;
            let form = factors.into_iter().fold(
                ReviewForm::new(surgeon, decision.into()).with_comments(comments),
                |form, factor| form.with_factor(factor, true),
            );
            run_review(SurgeryService::new(session), SurgeryId(surgery_id), form)?;
        }
    }
    Ok(())
}

// ── Workflow commands ─────────────────────────────────────────────────────────

fn run_pending(service: SurgeryService) -> CarelineResult<()> {
    let cases = service.pending_cases()?;
    if cases.is_empty() {
        println!("No surgeries awaiting consent.");
        return Ok(());
    }
    println!("{:>6}  {:>8}  {:<10}  PROCEDURE", "ID", "PATIENT", "URGENCY");
    for case in cases {
        println!(
            "{:>6}  {:>8}  {:<10}  {}",
            case.surgery_id,
            case.patient_id,
            format!("{:?}", case.urgency),
            case.procedure_name
        );
        if !case.diagnosis.is_empty() {
            println!("{:>30}{}", "", case.diagnosis);
        }
    }
    Ok(())
}

fn run_finalize(service: SurgeryService, surgery_id: SurgeryId) -> CarelineResult<()> {
    let mut engine = ConsensusEngine::new(service);
    let tally = engine.select_case_by_id(surgery_id)?;
    print_tally(surgery_id, &tally);
    match engine.finalize_pending()? {
        Some(status) => println!("Case status set to {}.", status),
        None => println!("Nothing to write yet."),
    }
    Ok(())
}

fn run_review(service: SurgeryService, surgery_id: SurgeryId, form: ReviewForm) -> CarelineResult<()> {
    let mut engine = ConsensusEngine::new(service);
    engine.select_case_by_id(surgery_id)?;
    if let WorkflowPhase::Decided(outcome) = engine.phase() {
        if let Some(status) = engine.finalize_pending()? {
            println!("Consensus was already reached; case status set to {}.", status);
        }
        return Err(CarelineError::Workflow {
            reason: format!("surgery {} already decided ({:?}); review not recorded", surgery_id, outcome),
        });
    }

    let tally = engine.submit_review(form)?;
    println!("Review recorded.");
    print_tally(surgery_id, &tally);
    if let Some(case) = engine.selected_case() {
        if tally.consensus_reached {
            println!("Case status is now {}.", case.status);
        }
    }
    Ok(())
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_signed_in(username: Option<&str>) {
    match username {
        Some(name) => println!("Signed in as {}.", name),
        None => println!("Signed in."),
    }
}

fn print_tally(surgery_id: SurgeryId, tally: &ConsensusState) {
    println!(
        "Surgery {}: {} accepted, {} declined ({} of 3 reviews)",
        surgery_id, tally.accepted, tally.declined, tally.total_decisions
    );
    match tally.outcome() {
        Some(outcome) => println!("Consensus reached: {:?} → {}", outcome, outcome.target_status()),
        None => println!("Awaiting {} more review(s).", tally.remaining()),
    }
}
