//! Candidate commands typed at the terminal
//!
//! Question numbers are 1-based on the terminal and 0-based in the session.

use std::str::FromStr;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

use proctor_session::{ProctoredSessionApi, SessionController, SessionEvent, SessionStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    GoTo(usize),
    Select(String),
    Clear,
    Mark,
    Show,
    Status,
    Submit,
    Resubmit,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{command}' needs an argument: {usage}")]
    MissingArgument {
        command: &'static str,
        usage: &'static str,
    },

    #[error("'{0}' is not a question number")]
    BadQuestionNumber(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or(CommandError::Empty)?;
        let rest: Vec<&str> = parts.collect();

        match verb.to_lowercase().as_str() {
            "next" | "n" => Ok(Command::Next),
            "prev" | "previous" | "p" => Ok(Command::Previous),
            "goto" | "g" => {
                let arg = rest.first().ok_or(CommandError::MissingArgument {
                    command: "goto",
                    usage: "goto <question number>",
                })?;
                match arg.parse::<usize>() {
                    Ok(n) if n >= 1 => Ok(Command::GoTo(n - 1)),
                    _ => Err(CommandError::BadQuestionNumber(arg.to_string())),
                }
            }
            "select" | "s" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "select",
                        usage: "select <option text>",
                    });
                }
                Ok(Command::Select(rest.join(" ")))
            }
            "clear" => Ok(Command::Clear),
            "mark" | "m" => Ok(Command::Mark),
            "show" => Ok(Command::Show),
            "status" => Ok(Command::Status),
            "submit" => Ok(Command::Submit),
            "resubmit" => Ok(Command::Resubmit),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

pub const HELP: &str = "\
commands:
  next | prev | goto N     move between questions
  select OPTION            answer the current question
  clear                    clear the current answer
  mark                     toggle review mark on the current question
  show                     show the current question
  status                   answered / marked / remaining time
  submit                   finish the attempt
  resubmit                 retry a failed submission
  quit                     leave without submitting";

/// Apply a command and render the reply for the terminal.
///
/// `Quit` is the caller's business and renders nothing.
pub async fn execute(session: &SessionController, command: Command) -> String {
    match command {
        Command::Next => moved(session.next(), session),
        Command::Previous => moved(session.previous(), session),
        Command::GoTo(index) => moved(session.go_to(index), session),
        Command::Select(option) => match session.current_question() {
            None => "no question".to_string(),
            Some(_) if session.status() != SessionStatus::Active => {
                "cannot change answers now".to_string()
            }
            Some(q) if session.select_answer(&q.id, &option) => format!("answered: {option}"),
            Some(q) => format!("'{option}' not accepted; options: {}", q.options.join(", ")),
        },
        Command::Clear => with_current(session, |q| {
            if session.clear_answer(q) {
                "answer cleared".to_string()
            } else {
                "cannot change answers now".to_string()
            }
        }),
        Command::Mark => with_current(session, |q| {
            if !session.toggle_mark(q) {
                return "cannot change marks now".to_string();
            }
            let marked = session
                .snapshot()
                .answers
                .get(q)
                .is_some_and(|e| e.marked_for_review);
            if marked {
                "marked for review".to_string()
            } else {
                "review mark removed".to_string()
            }
        }),
        Command::Show => render_current(session),
        Command::Status => render_status(session),
        Command::Submit => match session.submit().await {
            Ok(result) => format!(
                "submitted: score {} ({} of {} correct)",
                result.score,
                result.correct_count(),
                result.per_question.len()
            ),
            Err(e) => format!("submission failed: {e}"),
        },
        Command::Resubmit => match session.resubmit().await {
            Ok(result) => format!("submitted: score {}", result.score),
            Err(e) => format!("resubmission failed: {e}"),
        },
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

fn moved(did_move: bool, session: &SessionController) -> String {
    if did_move {
        render_current(session)
    } else {
        "cannot move there".to_string()
    }
}

fn with_current(
    session: &SessionController,
    f: impl FnOnce(&proctor_session::QuestionId) -> String,
) -> String {
    match session.current_question() {
        Some(q) => f(&q.id),
        None => "no question".to_string(),
    }
}

/// Current question with its options and the recorded answer.
pub fn render_current(session: &SessionController) -> String {
    let snapshot = session.snapshot();
    let Some(question) = session.current_question() else {
        return "no question".to_string();
    };
    let entry = snapshot.answers.get(&question.id);
    let selected = entry.and_then(|e| e.selected_option.as_deref());
    let marked = entry.is_some_and(|e| e.marked_for_review);

    let mut out = format!(
        "[{}/{}]{} {}\n",
        snapshot.current_question_index + 1,
        session.questions().len(),
        if marked { " (marked)" } else { "" },
        question.prompt_text
    );
    for option in &question.options {
        let bullet = if selected == Some(option.as_str()) { "*" } else { "-" };
        out.push_str(&format!("  {bullet} {option}\n"));
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn render_status(session: &SessionController) -> String {
    let summary = session.summary();
    format!(
        "{}: {}/{} answered, {} marked, {} unanswered, {}s left, {} violations",
        session.status(),
        summary.answered,
        summary.total,
        summary.marked,
        summary.unanswered,
        summary.remaining_seconds,
        summary.violations
    )
}

/// Terminal line for a session event, if it deserves one.
///
/// Ticks are shown once a minute and every second of the last ten.
pub fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Tick { remaining_seconds } => {
            let r = *remaining_seconds;
            (r % 60 == 0 || r <= 10).then(|| format!("-- {}:{:02} left", r / 60, r % 60))
        }
        SessionEvent::Violation { record, total } => Some(format!(
            "!! integrity warning {total}: {}",
            record.reason
        )),
        SessionEvent::TerminationStarted { trigger } => {
            Some(format!("== attempt closed ({trigger}); answers frozen"))
        }
        SessionEvent::Submitted { result } => Some(format!("== graded: score {}", result.score)),
        SessionEvent::SubmissionFailed { error } => Some(format!(
            "== submission failed: {error} (type 'resubmit' to retry)"
        )),
    }
}

/// Renders every event already queued on `events` without waiting for more.
pub fn drain_event_lines(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<String> {
    let mut lines = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => lines.extend(render_event(&event)),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Event printer lagged");
            }
            Err(_) => return lines,
        }
    }
}
