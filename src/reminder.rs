//! Daily check-in reminder scheduling.
//!
//! Exactly one reminder carrying [`REMINDER_TAG`] should be pending at any
//! time: at the configured time of day, on the earliest day from today on
//! that has no check-in yet. Every call cancels what an earlier call
//! installed and derives the fire time afresh.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::database::{Database, DatabaseError};
use crate::events::EntryEvent;
use crate::notifications::{NotificationCenter, NotificationError, NotificationRequest, ScheduledNotification};
use crate::utils::{at_time, parse_hour_minute};

/// Marker on every notification this scheduler installs
pub const REMINDER_TAG: &str = "checkin-reminder";
/// Settings key holding `{"hour":H,"minute":M}`
pub const REMINDER_TIME_KEY: &str = "reminder_time";
pub const REMINDER_TITLE: &str = "Time to check in";
pub const REMINDER_BODY: &str = "How was your day? Log your mood and habits.";

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Time(#[from] ReminderTimeError),
}

#[derive(Debug, Error)]
pub enum ReminderTimeError {
    #[error("reminder time is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reminder time {hour}:{minute} is out of range")]
    OutOfRange { hour: u32, minute: u32 },
    #[error("expected HH:MM, got {0:?}")]
    Format(String),
}

/// Local wall-clock time at which the daily reminder fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTime {
    pub hour: u32,
    pub minute: u32,
}

impl ReminderTime {
    pub const DEFAULT: ReminderTime = ReminderTime { hour: 19, minute: 0 };

    pub fn new(hour: u32, minute: u32) -> Result<Self, ReminderTimeError> {
        if hour <= 23 && minute <= 59 {
            Ok(Self { hour, minute })
        } else {
            Err(ReminderTimeError::OutOfRange { hour, minute })
        }
    }

    /// Parse the persisted JSON form
    pub fn from_json(raw: &str) -> Result<Self, ReminderTimeError> {
        let parsed: ReminderTime = serde_json::from_str(raw)?;
        Self::new(parsed.hour, parsed.minute)
    }

    pub fn to_json(&self) -> Result<String, ReminderTimeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// `date` at this time of day
    pub fn on(&self, date: chrono::NaiveDate) -> NaiveDateTime {
        // hour/minute are range-checked on construction
        at_time(date, self.hour, self.minute).unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
    }
}

impl Default for ReminderTime {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl std::str::FromStr for ReminderTime {
    type Err = ReminderTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hour_minute(s)
            .map(|(hour, minute)| ReminderTime { hour, minute })
            .ok_or_else(|| ReminderTimeError::Format(s.to_string()))
    }
}

/// Today at `time` if that is still strictly ahead of `now`, else tomorrow at `time`
pub fn next_reminder_from(now: NaiveDateTime, time: ReminderTime) -> NaiveDateTime {
    let today = time.on(now.date());
    if now < today {
        today
    } else {
        time.on(now.date() + Duration::days(1))
    }
}

/// Fire time for the check-in reminder. A day that already has an entry
/// never gets a reminder, so today's slot rolls over to tomorrow.
pub fn checkin_fire_time(now: NaiveDateTime, time: ReminderTime, has_entry_today: bool) -> NaiveDateTime {
    let candidate = next_reminder_from(now, time);
    if has_entry_today && candidate.date() == now.date() {
        time.on(now.date() + Duration::days(1))
    } else {
        candidate
    }
}

pub struct ReminderScheduler<N: NotificationCenter> {
    notifications: N,
    clock: Rc<dyn Clock>,
}

impl<N: NotificationCenter> ReminderScheduler<N> {
    pub fn new(notifications: N, clock: Rc<dyn Clock>) -> Self {
        Self { notifications, clock }
    }

    pub fn notifications(&self) -> &N {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut N {
        &mut self.notifications
    }

    /// The configured reminder time. Absent or malformed values fall back to
    /// 19:00; only storage failures are reported.
    pub fn reminder_time(&self, db: &Database) -> Result<ReminderTime, DatabaseError> {
        let Some(raw) = db.get_setting(REMINDER_TIME_KEY)? else {
            return Ok(ReminderTime::DEFAULT);
        };
        match ReminderTime::from_json(&raw) {
            Ok(time) => Ok(time),
            Err(e) => {
                warn!(stored = %raw, error = %e, "ignoring malformed reminder time, using {}", ReminderTime::DEFAULT);
                Ok(ReminderTime::DEFAULT)
            }
        }
    }

    /// Persist a new reminder time. Callers re-run
    /// [`ReminderScheduler::ensure_daily_checkin_reminder`] afterwards.
    pub fn set_reminder_time(&self, db: &Database, time: ReminderTime) -> Result<(), ReminderError> {
        db.set_setting(REMINDER_TIME_KEY, &time.to_json()?)?;
        info!(%time, "reminder time updated");
        Ok(())
    }

    /// Pending notifications carrying the reminder tag
    pub fn scheduled_checkin_reminders(&self) -> Result<Vec<ScheduledNotification>, NotificationError> {
        Ok(self
            .notifications
            .scheduled()?
            .into_iter()
            .filter(|n| n.tag == REMINDER_TAG)
            .collect())
    }

    /// Cancel every pending check-in reminder, leaving other categories alone
    pub fn cancel_checkin_reminders(&mut self) -> Result<usize, NotificationError> {
        let mine = self.scheduled_checkin_reminders()?;
        for notification in &mine {
            self.notifications.cancel(&notification.identifier)?;
        }
        if !mine.is_empty() {
            debug!(cancelled = mine.len(), "check-in reminders cancelled");
        }
        Ok(mine.len())
    }

    /// Replace any pending check-in reminder with one for the earliest day,
    /// from today on, that has no entry. Returns the fire time.
    pub fn ensure_daily_checkin_reminder(&mut self, db: &Database) -> Result<NaiveDateTime, ReminderError> {
        self.cancel_checkin_reminders()?;

        let time = self.reminder_time(db)?;
        let now = self.clock.now();
        let has_entry_today = db.get_entry_by_day(now.date())?.is_some();
        let fire_at = checkin_fire_time(now, time, has_entry_today);

        self.install(fire_at)?;
        Ok(fire_at)
    }

    /// Right after a check-in: schedule for tomorrow without asking the store
    pub fn schedule_tomorrow_reminder_after_check_in(&mut self, db: &Database) -> Result<NaiveDateTime, ReminderError> {
        self.cancel_checkin_reminders()?;

        let time = self.reminder_time(db)?;
        let fire_at = time.on(self.clock.today() + Duration::days(1));

        self.install(fire_at)?;
        Ok(fire_at)
    }

    /// React to a change in the entry table
    pub fn handle_event(&mut self, db: &Database, event: &EntryEvent) -> Result<NaiveDateTime, ReminderError> {
        let today = self.clock.today();
        debug!(?event, touches_today = event.touches(today), "entry changed");
        match event {
            EntryEvent::Created { .. } if event.touches(today) => {
                self.schedule_tomorrow_reminder_after_check_in(db)
            }
            _ => self.ensure_daily_checkin_reminder(db),
        }
    }

    fn install(&mut self, fire_at: NaiveDateTime) -> Result<String, NotificationError> {
        let identifier = self.notifications.schedule(NotificationRequest {
            title: REMINDER_TITLE.to_string(),
            body: REMINDER_BODY.to_string(),
            tag: REMINDER_TAG.to_string(),
            fire_at,
        })?;
        info!(%identifier, %fire_at, "check-in reminder scheduled");
        Ok(identifier)
    }
}
