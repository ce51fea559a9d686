//! # Proctor Session Runtime
//!
//! Runs one proctored assessment attempt in the terminal.
//!
//! ## Startup Sequence
//!
//! 1. Parse CLI flags, initialise telemetry
//! 2. Load the session config (env or file, then CLI overrides)
//! 3. Load the question bank and derive the answer key
//! 4. Wire simulated capture/classification and the local grader
//! 5. Start the session and drive it from stdin or a scripted candidate
//! 6. Print the graded result (and metrics, if asked)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, oneshot};
use tracing::{info, warn};

use proctor_session::{
    AnswerKeyGrader, CaptureSource, QuestionBank, SessionController, SessionEvent, SessionPorts,
    SessionStatus,
};
use proctor_telemetry::{init_telemetry, TelemetryConfig};
use session_runtime::commands::{self, Command, HELP};
use session_runtime::{
    load_session_config, ConfigOverrides, NullCapture, ScriptedCandidate, SimulatedCamera,
    SimulatedClassifier,
};

/// Bytes per simulated camera frame
const FRAME_SIZE: usize = 1024;

/// Run one proctored assessment session
#[derive(Parser, Debug)]
#[command(name = "session-runtime")]
#[command(about = "Run one proctored, timed assessment session in the terminal")]
struct Args {
    /// Question bank JSON file
    #[arg(short, long)]
    questions: PathBuf,

    /// Question category to draw from
    #[arg(short, long)]
    category: String,

    /// Exam duration in seconds
    #[arg(short, long, default_value = "1200")]
    duration: u64,

    /// Session config JSON file (replaces PROCTOR_* variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Violations that close the attempt
    #[arg(long)]
    threshold: Option<u32>,

    /// Seconds between integrity checks
    #[arg(long)]
    monitor_interval: Option<u64>,

    /// Probability that a simulated frame is flagged suspicious
    #[arg(long, default_value = "0.0")]
    suspicion_rate: f64,

    /// Run without a camera; every integrity check is inconclusive
    #[arg(long)]
    no_camera: bool,

    /// Let a scripted candidate take the exam, answering every N seconds
    #[arg(long)]
    scripted: Option<u64>,

    /// Seed for the simulation and the scripted candidate
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Points the local grader deducts per violation
    #[arg(long, default_value = "0.0")]
    violation_penalty: f64,

    /// Print Prometheus metrics on exit
    #[arg(long)]
    dump_metrics: bool,

    /// Log filter (overrides RUST_LOG and PROCTOR_LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut telemetry_config = TelemetryConfig::from_env();
    if let Some(level) = &args.log_level {
        telemetry_config = telemetry_config.with_log_level(level.clone());
    }
    let telemetry = init_telemetry(telemetry_config).context("Failed to initialize telemetry")?;

    let overrides = ConfigOverrides {
        violation_threshold: args.threshold,
        monitor_interval_secs: args.monitor_interval,
    };
    let config = load_session_config(args.config.as_deref(), &overrides)?;

    let bank = QuestionBank::load(&args.questions)
        .await
        .context("Failed to load question bank")?;
    let grader = AnswerKeyGrader::new(bank.answer_key(&args.category))
        .with_violation_penalty(args.violation_penalty);

    let capture: Arc<dyn CaptureSource> = if args.no_camera {
        Arc::new(NullCapture)
    } else {
        Arc::new(SimulatedCamera::new(FRAME_SIZE, args.seed))
    };
    let ports = SessionPorts {
        capture,
        classifier: Arc::new(SimulatedClassifier::new(args.suspicion_rate, args.seed)),
        grading: Arc::new(grader),
    };

    let session =
        SessionController::start_from_source(config, ports, &bank, &args.category, args.duration)
            .await
            .context("Failed to start session")?;
    println!(
        "Session {} started: {} questions, {}s. Type 'help' for commands.",
        session.id(),
        session.questions().len(),
        args.duration
    );

    let (stop_printer, printer_stopped) = oneshot::channel();
    let printer = tokio::spawn(print_events(session.subscribe(), printer_stopped));

    match args.scripted {
        Some(secs) => {
            let candidate = ScriptedCandidate::new(Duration::from_secs(secs), true, args.seed);
            if let Err(e) = candidate.run(&session).await {
                warn!(error = %e, "Scripted attempt did not reach a graded result");
            }
        }
        None => {
            println!("{}", commands::render_current(&session));
            run_interactive(&session).await?;
        }
    }

    let _ = stop_printer.send(());
    if let Err(e) = printer.await {
        warn!(error = %e, "Event printer failed");
    }

    if session.status() == SessionStatus::Submitted {
        let result = session.wait_for_outcome().await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", commands::render_status(&session));
        warn!(session_id = %session.id(), "Exiting without a graded result");
    }

    if args.dump_metrics {
        print!("{}", telemetry.metrics().render()?);
    }

    info!("Session runtime finished");
    Ok(())
}

/// Read commands until the attempt is graded, stdin closes, or the
/// candidate quits.
async fn run_interactive(session: &SessionController) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut delivery_failed = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => println!("{}", commands::execute(session, command).await),
                    Err(e) => println!("{e}\n{HELP}"),
                }
                if session.status() == SessionStatus::Submitted {
                    break;
                }
            }
            outcome = session.wait_for_outcome(), if !delivery_failed => {
                match outcome {
                    Ok(_) => break,
                    Err(_) => delivery_failed = true,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}

/// Print events as they arrive. On `stop`, flush whatever is queued and return.
async fn print_events(
    mut events: broadcast::Receiver<SessionEvent>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    if let Some(line) = commands::render_event(&event) {
                        println!("{line}");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            _ = &mut stop => break,
        }
    }
    for line in commands::drain_event_lines(&mut events) {
        println!("{line}");
    }
}
