//! Reflective reports over a day's check-in.
//!
//! The text itself comes from an external generator; this module assembles
//! what the generator gets and stores what it returns.

use thiserror::Error;
use tracing::{info, warn};

use crate::database::{Database, DatabaseError};
use crate::models::Entry;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Entry {0} not found")]
    EntryNotFound(i64),
    #[error("Entry {0} already has a report")]
    AlreadyGenerated(i64),
    #[error("Report generator returned no text")]
    Empty,
    #[error("Report generator failed: {0}")]
    Generator(String),
    #[error("Invalid report command: {0}")]
    InvalidCommand(String),
}

/// Instructions sent ahead of the profile and the day's answers
pub const REPORT_INSTRUCTIONS: &str = "\
You are an empathetic, reflective well-being companion.
Write a supportive daily report based on the user's logged data.
Keep the tone warm, calm and friendly, never judgmental or clinical.

The report should read like a thoughtful note or journal entry, not like an assistant asking questions or expecting a reply.
Use neutral language such as \"Today you felt...\", \"It seems...\" or \"Perhaps...\".
Take the user information into account and use it to personalize ideas based on hobbies, goals and lifestyle.
Call the user by their name at least once in the report.

The daily report must:
Summarize the user's key logged data (mood, sleep, stress, energy).
Reflect briefly on any noticeable patterns or changes from recent days.
Offer gentle, practical suggestions if something could help.
Celebrate small positives or improvements.
Avoid making assumptions about the user's feelings or experiences.

Avoid:
Asking questions (\"What do you think...?\")
Commands (\"You should...\" / \"Try to...\")
Medical advice or diagnosis
Overly formal or robotic tone";

/// Everything a generator needs to write one report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    /// Labelled check-in answers, one per line
    pub entry_text: String,
    /// Rendered user profile, when one is stored
    pub profile_text: Option<String>,
}

/// An external text generator (e.g. a hosted language model)
pub trait ReportGenerator {
    fn generate(&self, request: &ReportRequest) -> Result<String, ReportError>;
}

/// Runs an external program: the prompt goes to stdin, the report is read from stdout
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    /// Split a configured command line with shell quoting rules.
    /// A blank command means no generator is configured.
    pub fn from_command_line(command: &str) -> Result<Option<Self>, ReportError> {
        let parts = shell_words::split(command)
            .map_err(|e| ReportError::InvalidCommand(format!("{command:?}: {e}")))?;
        let mut parts = parts.into_iter();
        Ok(parts.next().map(|program| Self { program, args: parts.collect() }))
    }
}

impl ReportGenerator for CommandGenerator {
    fn generate(&self, request: &ReportRequest) -> Result<String, ReportError> {
        use std::io::Write;
        use std::process::{Command, Stdio};

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ReportError::Generator(format!("failed to start {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.prompt().as_bytes())
                .map_err(|e| ReportError::Generator(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ReportError::Generator(e.to_string()))?;
        if !output.status.success() {
            return Err(ReportError::Generator(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ReportRequest {
    /// Plain-text prompt: instructions, then the profile, then the day's answers
    pub fn prompt(&self) -> String {
        let profile = self.profile_text.as_deref().unwrap_or("No user information available.");
        format!(
            "{}\n\n{}\n\nGenerate a report based on the following entries:\n{}\n",
            REPORT_INSTRUCTIONS, profile, self.entry_text
        )
    }

    pub fn new(entry: &Entry, profile_text: Option<String>) -> Self {
        let entry_text = entry
            .fields()
            .iter()
            .map(|(label, value)| format!("{}: {}", label, value.unwrap_or("")))
            .collect::<Vec<_>>()
            .join("\n");
        Self { entry_text, profile_text }
    }
}

/// Generate a report for entry `id` and attach it. An entry keeps its first report.
pub fn generate_report<G: ReportGenerator + ?Sized>(
    db: &Database,
    generator: &G,
    id: i64,
) -> Result<String, ReportError> {
    let entry = db.get_entry(id)?.ok_or(ReportError::EntryNotFound(id))?;
    if entry.ai_report.as_deref().is_some_and(|r| !r.trim().is_empty()) {
        return Err(ReportError::AlreadyGenerated(id));
    }

    let profile_text = db.get_user_info()?.map(|info| info.to_profile_text());
    let request = ReportRequest::new(&entry, profile_text);

    let report = generator
        .generate(&request)
        .inspect_err(|e| warn!(id, error = %e, "report generation failed"))?;
    let report = report.trim();
    if report.is_empty() {
        return Err(ReportError::Empty);
    }

    db.update_ai_report(id, report)?;
    info!(id, chars = report.len(), "report attached");
    Ok(report.to_string())
}
