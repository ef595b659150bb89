use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::database::DatabaseError;
use crate::journal::Journal;
use crate::models::{Entry, ThoughtLog};
use crate::notifications::{NotificationCenter, NotificationError};
use crate::reminder::{ReminderError, ReminderTime, ReminderTimeError};
use crate::report::{self, ReportError, ReportGenerator};
use crate::utils::{format_timestamp, join_tags, parse_date};

#[derive(Parser)]
#[command(name = "clarity")]
#[command(about = "Clarity - daily mood check-ins, streaks and reminders")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record today's check-in (default date: today)
    Checkin {
        /// Back-fill a day (YYYY-MM-DD); the current time of day is used
        #[arg(long)]
        date: Option<String>,
        #[command(flatten)]
        fields: EntryFields,
    },
    /// Edit an entry; only the given fields change
    Edit {
        id: i64,
        /// Move the entry to another day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        #[command(flatten)]
        fields: EntryFields,
    },
    /// Delete an entry
    Delete { id: i64 },
    /// Show one entry
    Show { id: i64 },
    /// Show the entry for a calendar day (YYYY-MM-DD)
    Day { date: String },
    /// Show today's entry and streak (default if no subcommand)
    Today,
    /// Entries from the last 7 days
    Week,
    /// All entries, newest first
    List,
    /// Current and longest streak
    Streak,
    /// Generate and attach a reflective report for an entry
    Report { id: i64 },
    /// Check-in reminder settings
    Reminder {
        #[command(subcommand)]
        action: ReminderAction,
    },
    /// CBT thought records
    Thought {
        #[command(subcommand)]
        action: ThoughtAction,
    },
    /// Personal profile used in reports
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Delete all data
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct EntryFields {
    #[arg(long)]
    pub sleep_time: Option<String>,
    #[arg(long)]
    pub sleep_quality: Option<String>,
    /// Mood tags, comma-separated or repeated
    #[arg(long = "mood", value_delimiter = ',')]
    pub moods: Vec<String>,
    #[arg(long)]
    pub energy: Option<String>,
    #[arg(long)]
    pub stress: Option<String>,
    /// Body-feel tags, comma-separated or repeated
    #[arg(long = "body-feel", value_delimiter = ',')]
    pub body_feel: Vec<String>,
    #[arg(long)]
    pub appetite: Option<String>,
    #[arg(long)]
    pub focus: Option<String>,
    #[arg(long)]
    pub motivation: Option<String>,
    #[arg(long)]
    pub anxiety: Option<String>,
    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Show the configured time and the pending reminder
    Show,
    /// Set the daily reminder time (HH:MM)
    Set { time: String },
    /// Re-derive and reinstall the reminder
    Sync,
    /// Print and remove reminders that are due
    Due,
}

#[derive(Subcommand)]
pub enum ThoughtAction {
    /// Record a thought
    Add {
        situation: String,
        #[arg(long, default_value = "")]
        emotions: String,
        #[arg(long, default_value = "")]
        thoughts: String,
        #[arg(long, default_value = "")]
        evidence_for: String,
        #[arg(long, default_value = "")]
        evidence_against: String,
        #[arg(long, default_value = "")]
        alternative: String,
        #[arg(long, default_value = "")]
        outcome: String,
    },
    /// List thought records, newest first
    List,
    /// Show one thought record
    Show { id: i64 },
    /// Delete a thought record
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum ProfileAction {
    Show,
    /// Update profile fields; others are kept
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<i64>,
        #[arg(long)]
        weight: Option<i64>,
        #[arg(long)]
        height: Option<i64>,
        #[arg(long)]
        conditions: Option<String>,
        #[arg(long)]
        medications: Option<String>,
        #[arg(long)]
        hobbies: Option<String>,
        #[arg(long)]
        goals: Option<String>,
        #[arg(long)]
        occupation: Option<String>,
        #[arg(long)]
        physical_activity: Option<String>,
        #[arg(long)]
        additional_info: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Invalid reminder time: {0}")]
    ReminderTimeError(#[from] ReminderTimeError),
    #[error("Reminder error: {0}")]
    ReminderError(#[from] ReminderError),
    #[error("Notification error: {0}")]
    NotificationError(#[from] NotificationError),
    #[error("Report error: {0}")]
    ReportError(#[from] ReportError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("No report_command configured")]
    NoReportGenerator,
    #[error("Refusing to clear data without --yes")]
    NotConfirmed,
}

impl EntryFields {
    /// Copy the given fields onto `entry`, leaving the rest untouched
    pub fn apply(self, entry: &mut Entry) {
        fn set(target: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *target = value;
            }
        }
        fn set_tags(target: &mut Option<String>, tags: Vec<String>) {
            if !tags.is_empty() {
                *target = Some(join_tags(&tags));
            }
        }

        set(&mut entry.sleep_time, self.sleep_time);
        set(&mut entry.sleep_quality, self.sleep_quality);
        set_tags(&mut entry.moods, self.moods);
        set(&mut entry.energy_level, self.energy);
        set(&mut entry.stress_level, self.stress);
        set_tags(&mut entry.body_feel, self.body_feel);
        set(&mut entry.appetite, self.appetite);
        set(&mut entry.focus, self.focus);
        set(&mut entry.motivation, self.motivation);
        set(&mut entry.anxiety, self.anxiety);
        set(&mut entry.others, self.notes);
    }
}

fn parse_day(value: &str) -> Result<chrono::NaiveDate, CliError> {
    parse_date(value).map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", value, e)))
}

fn print_entry(entry: &Entry) {
    let when = entry.timestamp.as_ref().map(format_timestamp).unwrap_or_default();
    println!("#{} {}", entry.id.unwrap_or_default(), when);
    for (label, value) in entry.fields() {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            println!("  {label}: {value}");
        }
    }
    if let Some(report) = &entry.ai_report {
        println!("  Report:\n{report}");
    }
}

fn print_summary(entry: &Entry) {
    let when = entry.timestamp.as_ref().map(format_timestamp).unwrap_or_default();
    let moods = entry.moods.as_deref().unwrap_or("-");
    println!("#{:<5} {}  {}", entry.id.unwrap_or_default(), when, moods);
}

/// Handle the checkin command
pub fn handle_checkin<N: NotificationCenter>(
    journal: &mut Journal<N>,
    date: Option<String>,
    fields: EntryFields,
) -> Result<(), CliError> {
    let mut entry = Entry::new();
    if let Some(date) = date {
        entry.timestamp = Some(journal.timestamp_for(parse_day(&date)?));
    }
    fields.apply(&mut entry);

    let day = entry.timestamp.map(|t| t.date()).unwrap_or_else(|| journal.db().today());
    if journal.db().get_entry_by_day(day)?.is_some() {
        println!("Note: {} already has a check-in; the newest one is shown for that day.", day);
    }

    let id = journal.create_entry(entry)?;
    println!("Check-in saved (ID: {})", id);
    println!("Streak: {} day(s)", journal.db().compute_streak()?);
    Ok(())
}

/// Handle the edit command
pub fn handle_edit<N: NotificationCenter>(
    journal: &mut Journal<N>,
    id: i64,
    date: Option<String>,
    fields: EntryFields,
) -> Result<(), CliError> {
    let mut entry = journal
        .db()
        .get_entry(id)?
        .ok_or_else(|| CliError::NotFound(format!("Entry {}", id)))?;
    entry.timestamp = match date {
        Some(date) => Some(journal.timestamp_for(parse_day(&date)?)),
        None => None,
    };
    fields.apply(&mut entry);
    journal.update_entry(&entry)?;
    println!("Entry {} updated", id);
    Ok(())
}

pub fn handle_delete<N: NotificationCenter>(journal: &mut Journal<N>, id: i64) -> Result<(), CliError> {
    journal.delete_entry(id)?;
    println!("Entry {} deleted", id);
    Ok(())
}

pub fn handle_show<N: NotificationCenter>(journal: &Journal<N>, id: i64) -> Result<(), CliError> {
    let entry = journal
        .db()
        .get_entry(id)?
        .ok_or_else(|| CliError::NotFound(format!("Entry {}", id)))?;
    print_entry(&entry);
    Ok(())
}

pub fn handle_day<N: NotificationCenter>(journal: &Journal<N>, date: &str) -> Result<(), CliError> {
    match journal.db().get_entry_by_day(parse_day(date)?)? {
        Some(entry) => print_entry(&entry),
        None => println!("No check-in on {}", date),
    }
    Ok(())
}

pub fn handle_today<N: NotificationCenter>(journal: &Journal<N>) -> Result<(), CliError> {
    match journal.db().get_most_recent_for_today()? {
        Some(entry) => print_entry(&entry),
        None => println!("No check-in yet today"),
    }
    println!("Streak: {} day(s)", journal.db().compute_streak()?);
    Ok(())
}

pub fn handle_week<N: NotificationCenter>(journal: &Journal<N>) -> Result<(), CliError> {
    for entry in journal.db().get_entries_last_days(7)? {
        print_summary(&entry);
    }
    Ok(())
}

pub fn handle_list<N: NotificationCenter>(journal: &Journal<N>) -> Result<(), CliError> {
    for entry in journal.db().get_all_entries()? {
        print_summary(&entry);
    }
    Ok(())
}

pub fn handle_streak<N: NotificationCenter>(journal: &Journal<N>) -> Result<(), CliError> {
    println!("Current streak: {} day(s)", journal.db().compute_streak()?);
    println!("Longest streak: {} day(s)", journal.db().longest_streak()?);
    Ok(())
}

pub fn handle_report<N: NotificationCenter>(
    journal: &Journal<N>,
    generator: Option<&dyn ReportGenerator>,
    id: i64,
) -> Result<(), CliError> {
    let generator = generator.ok_or(CliError::NoReportGenerator)?;
    let text = report::generate_report(journal.db(), generator, id)?;
    println!("{}", text);
    Ok(())
}

pub fn handle_reminder<N: NotificationCenter>(
    journal: &mut Journal<N>,
    action: ReminderAction,
) -> Result<(), CliError> {
    match action {
        ReminderAction::Show => {
            println!("Reminder time: {}", journal.scheduler().reminder_time(journal.db())?);
            for reminder in journal.scheduler().scheduled_checkin_reminders()? {
                println!("Next reminder: {} ({})", format_timestamp(&reminder.fire_at), reminder.identifier);
            }
        }
        ReminderAction::Set { time } => {
            let time: ReminderTime = time.parse()?;
            match journal.set_reminder_time(time)? {
                Some(fire_at) => println!("Reminder set for {}; next at {}", time, format_timestamp(&fire_at)),
                None => println!("Reminder time saved as {}, but no reminder could be scheduled", time),
            }
        }
        ReminderAction::Sync => match journal.start() {
            Some(fire_at) => println!("Next reminder at {}", format_timestamp(&fire_at)),
            None => println!("No reminder could be scheduled"),
        },
        ReminderAction::Due => {
            let now = journal.db().now();
            for notification in journal.scheduler_mut().notifications_mut().take_due(now)? {
                println!("{}: {}", notification.title, notification.body);
            }
        }
    }
    Ok(())
}

pub fn handle_thought<N: NotificationCenter>(
    journal: &Journal<N>,
    action: ThoughtAction,
) -> Result<(), CliError> {
    let db = journal.db();
    match action {
        ThoughtAction::Add {
            situation,
            emotions,
            thoughts,
            evidence_for,
            evidence_against,
            alternative,
            outcome,
        } => {
            let log = ThoughtLog {
                emotions,
                automatic_thoughts: thoughts,
                evidence_for,
                evidence_against,
                alternative_thought: alternative,
                outcome,
                ..ThoughtLog::new(situation)
            };
            let id = db.insert_thought_log(&log)?;
            println!("Thought record saved (ID: {})", id);
        }
        ThoughtAction::List => {
            for log in db.get_thought_logs()? {
                let when = log.timestamp.as_ref().map(format_timestamp).unwrap_or_default();
                println!("#{:<5} {}  {}", log.id.unwrap_or_default(), when, log.situation);
            }
        }
        ThoughtAction::Show { id } => {
            let log = db
                .get_thought_log(id)?
                .ok_or_else(|| CliError::NotFound(format!("Thought record {}", id)))?;
            println!("Situation: {}", log.situation);
            println!("Emotions: {}", log.emotions);
            println!("Automatic thoughts: {}", log.automatic_thoughts);
            println!("Evidence for: {}", log.evidence_for);
            println!("Evidence against: {}", log.evidence_against);
            println!("Alternative thought: {}", log.alternative_thought);
            println!("Outcome: {}", log.outcome);
        }
        ThoughtAction::Delete { id } => {
            db.delete_thought_log(id)?;
            println!("Thought record {} deleted", id);
        }
    }
    Ok(())
}

pub fn handle_profile<N: NotificationCenter>(
    journal: &Journal<N>,
    action: ProfileAction,
) -> Result<(), CliError> {
    let db = journal.db();
    match action {
        ProfileAction::Show => match db.get_user_info()? {
            Some(info) => println!("{}", info.to_profile_text()),
            None => println!("No profile saved"),
        },
        ProfileAction::Set {
            name,
            age,
            weight,
            height,
            conditions,
            medications,
            hobbies,
            goals,
            occupation,
            physical_activity,
            additional_info,
        } => {
            let mut info = db.get_user_info()?.unwrap_or_default();
            info.name = name.or(info.name);
            info.age = age.or(info.age);
            info.weight = weight.or(info.weight);
            info.height = height.or(info.height);
            info.conditions = conditions.or(info.conditions);
            info.medications = medications.or(info.medications);
            info.hobbies = hobbies.or(info.hobbies);
            info.goals = goals.or(info.goals);
            info.occupation = occupation.or(info.occupation);
            info.physical_activity = physical_activity.or(info.physical_activity);
            info.additional_info = additional_info.or(info.additional_info);
            db.save_user_info(&info)?;
            println!("Profile saved");
        }
    }
    Ok(())
}

pub fn handle_clear<N: NotificationCenter>(journal: &mut Journal<N>, yes: bool) -> Result<(), CliError> {
    if !yes {
        return Err(CliError::NotConfirmed);
    }
    journal.db().clear()?;
    journal.start();
    println!("All data cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_only_override_what_was_given() {
        let mut entry = Entry {
            sleep_time: Some("6h".to_string()),
            moods: Some("calm".to_string()),
            ..Entry::default()
        };
        let fields = EntryFields {
            moods: vec!["happy".to_string(), " tired".to_string()],
            notes: Some("gym".to_string()),
            ..EntryFields::default()
        };
        fields.apply(&mut entry);
        assert_eq!(entry.sleep_time.as_deref(), Some("6h"));
        assert_eq!(entry.moods.as_deref(), Some("happy,tired"));
        assert_eq!(entry.others.as_deref(), Some("gym"));
    }

    #[test]
    fn parses_checkin_flags() {
        let cli = Cli::try_parse_from([
            "clarity", "checkin", "--mood", "happy,calm", "--mood", "focused", "--stress", "low",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Checkin { date, fields }) => {
                assert_eq!(date, None);
                assert_eq!(fields.moods, vec!["happy", "calm", "focused"]);
                assert_eq!(fields.stress.as_deref(), Some("low"));
            }
            _ => panic!("expected checkin"),
        }
    }

    #[test]
    fn rejects_bad_dates() {
        assert!(matches!(parse_day("2024-13-01"), Err(CliError::DateParseError(_))));
    }
}
