//! # Session Runtime Library
//!
//! Host-side pieces of the session runtime, exposed for testing.
//! The main entry point is the `main.rs` binary.
//!
//! ## Modules
//!
//! - `config` - Layered `SessionConfig` loading (defaults, env or file, CLI)
//! - `simulation` - Simulated camera and classifier, null capture
//! - `candidate` - Scripted candidate for unattended runs
//! - `commands` - Terminal command parsing and rendering

pub mod candidate;
pub mod commands;
pub mod config;
pub mod simulation;

pub use candidate::ScriptedCandidate;
pub use commands::{drain_event_lines, execute, render_event, Command, CommandError};
pub use config::{load_session_config, ConfigOverrides};
pub use simulation::{NullCapture, SimulatedCamera, SimulatedClassifier};
