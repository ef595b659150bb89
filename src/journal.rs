//! Entry mutations routed through the reminder scheduler.
//!
//! Every create/update/delete produces an [`EntryEvent`] which is handed to
//! the scheduler. Rescheduling is a best-effort side effect: a failure there
//! is logged and never undoes or fails the entry write.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::warn;

use crate::database::{Database, DatabaseError};
use crate::events::EntryEvent;
use crate::models::Entry;
use crate::notifications::NotificationCenter;
use crate::reminder::{ReminderError, ReminderScheduler, ReminderTime};

pub struct Journal<N: NotificationCenter> {
    db: Database,
    scheduler: ReminderScheduler<N>,
}

impl<N: NotificationCenter> Journal<N> {
    /// The scheduler shares the database's clock
    pub fn new(db: Database, notifications: N) -> Self {
        let scheduler = ReminderScheduler::new(notifications, db.clock());
        Self { db, scheduler }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn scheduler(&self) -> &ReminderScheduler<N> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut ReminderScheduler<N> {
        &mut self.scheduler
    }

    /// App start: make sure the check-in reminder is in place
    pub fn start(&mut self) -> Option<NaiveDateTime> {
        let result = self.scheduler.ensure_daily_checkin_reminder(&self.db);
        best_effort(result)
    }

    /// `date` combined with the current time of day, for back-filling a day
    pub fn timestamp_for(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.db.now().time())
    }

    /// Record a check-in. A missing timestamp means now.
    pub fn create_entry(&mut self, mut entry: Entry) -> Result<i64, DatabaseError> {
        let timestamp = *entry.timestamp.get_or_insert_with(|| self.db.now());
        let id = self.db.insert_entry(&entry)?;
        self.dispatch(EntryEvent::Created { id, day: timestamp.date() });
        Ok(id)
    }

    /// Edit a check-in; a `None` timestamp keeps the stored one.
    /// Editing an id that does not exist changes nothing.
    pub fn update_entry(&mut self, entry: &Entry) -> Result<(), DatabaseError> {
        let id = entry.id.ok_or(DatabaseError::MissingIdentifier("entry"))?;
        let Some(previous) = self.db.get_entry(id)? else {
            return Ok(());
        };
        self.db.update_entry(entry)?;

        let previous_day = previous.timestamp.map(|t| t.date());
        let day = entry
            .timestamp
            .map(|t| t.date())
            .or(previous_day)
            .unwrap_or_else(|| self.db.today());
        let previous_day = previous_day.filter(|d| *d != day);
        self.dispatch(EntryEvent::Updated { id, day, previous_day });
        Ok(())
    }

    /// Delete a check-in. Unknown ids are fine.
    pub fn delete_entry(&mut self, id: i64) -> Result<(), DatabaseError> {
        let day = self.db.get_entry(id)?.and_then(|e| e.timestamp).map(|t| t.date());
        self.db.delete_entry(id)?;
        self.dispatch(EntryEvent::Deleted { id, day });
        Ok(())
    }

    /// Persist a new reminder time and reinstall the reminder for it
    pub fn set_reminder_time(&mut self, time: ReminderTime) -> Result<Option<NaiveDateTime>, ReminderError> {
        self.scheduler.set_reminder_time(&self.db, time)?;
        Ok(self.start())
    }

    fn dispatch(&mut self, event: EntryEvent) -> Option<NaiveDateTime> {
        let result = self.scheduler.handle_event(&self.db, &event);
        best_effort(result)
    }
}

fn best_effort(result: Result<NaiveDateTime, ReminderError>) -> Option<NaiveDateTime> {
    match result {
        Ok(fire_at) => Some(fire_at),
        Err(e) => {
            warn!(error = %e, "check-in reminder not scheduled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::MemoryNotificationCenter;
    use crate::test_utils::{at, date, entry_at, setup_test_db};

    fn journal(now: NaiveDateTime) -> (Journal<MemoryNotificationCenter>, std::rc::Rc<crate::clock::FixedClock>) {
        let (db, clock) = setup_test_db(now);
        (Journal::new(db, MemoryNotificationCenter::new()), clock)
    }

    fn fire_times(journal: &Journal<MemoryNotificationCenter>) -> Vec<NaiveDateTime> {
        journal
            .scheduler()
            .scheduled_checkin_reminders()
            .unwrap()
            .into_iter()
            .map(|n| n.fire_at)
            .collect()
    }

    #[test]
    fn check_in_moves_reminder_to_tomorrow() {
        let (mut journal, _clock) = journal(at(2024, 6, 1, 12, 0, 0));
        assert_eq!(journal.start(), Some(at(2024, 6, 1, 19, 0, 0)));

        journal.create_entry(Entry::new()).unwrap();
        assert_eq!(fire_times(&journal), vec![at(2024, 6, 2, 19, 0, 0)]);
    }

    #[test]
    fn deleting_todays_entry_restores_todays_reminder() {
        let (mut journal, _clock) = journal(at(2024, 6, 1, 12, 0, 0));
        let id = journal.create_entry(Entry::new()).unwrap();
        journal.delete_entry(id).unwrap();
        assert_eq!(fire_times(&journal), vec![at(2024, 6, 1, 19, 0, 0)]);
        assert!(journal.db().get_entry(id).unwrap().is_none());
    }

    #[test]
    fn moving_todays_entry_away_reschedules() {
        let (mut journal, _clock) = journal(at(2024, 6, 1, 12, 0, 0));
        let id = journal.create_entry(Entry::new()).unwrap();
        let mut entry = journal.db().get_entry(id).unwrap().unwrap();
        entry.timestamp = Some(journal.timestamp_for(date(2024, 5, 31)));
        journal.update_entry(&entry).unwrap();

        assert_eq!(fire_times(&journal), vec![at(2024, 6, 1, 19, 0, 0)]);
        let stored = journal.db().get_entry(id).unwrap().unwrap();
        assert_eq!(stored.timestamp, Some(at(2024, 5, 31, 12, 0, 0)));
    }

    #[test]
    fn update_of_unknown_id_is_a_no_op() {
        let (mut journal, _clock) = journal(at(2024, 6, 1, 12, 0, 0));
        let ghost = Entry { id: Some(42), ..Entry::default() };
        journal.update_entry(&ghost).unwrap();
        assert!(journal.db().get_all_entries().unwrap().is_empty());
        assert!(fire_times(&journal).is_empty());
    }

    #[test]
    fn reminder_time_change_reinstalls() {
        let (mut journal, _clock) = journal(at(2024, 6, 1, 12, 0, 0));
        journal.start();
        let fire_at = journal.set_reminder_time(ReminderTime::new(8, 0).unwrap()).unwrap();
        assert_eq!(fire_at, Some(at(2024, 6, 2, 8, 0, 0)));
        assert_eq!(fire_times(&journal), vec![at(2024, 6, 2, 8, 0, 0)]);
    }

    #[test]
    fn denied_permission_does_not_block_saving() {
        let (mut journal, _clock) = journal(at(2024, 6, 1, 12, 0, 0));
        journal.scheduler_mut().notifications_mut().deny_permission();
        assert_eq!(journal.start(), None);

        let id = journal.create_entry(entry_at(at(2024, 6, 1, 10, 0, 0), "tired")).unwrap();
        assert!(journal.db().get_entry(id).unwrap().is_some());
        assert!(fire_times(&journal).is_empty());
    }

    #[test]
    fn close_succession_triggers_leave_one_reminder() {
        let (mut journal, clock) = journal(at(2024, 6, 1, 12, 0, 0));
        journal.create_entry(Entry::new()).unwrap();
        // app regains focus right after saving
        journal.start();
        clock.advance(chrono::Duration::seconds(1));
        journal.start();
        assert_eq!(fire_times(&journal), vec![at(2024, 6, 2, 19, 0, 0)]);
    }
}
