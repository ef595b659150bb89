use chrono::{Duration, NaiveDate, NaiveDateTime};
use clarity::clock::{Clock, FixedClock};
use clarity::notifications::{FileNotificationCenter, MemoryNotificationCenter, NotificationCenter};
use clarity::reminder::REMINDER_TAG;
use clarity::{Database, Entry, Journal, ReminderTime};
use std::rc::Rc;

fn at(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
}

fn open(now: NaiveDateTime) -> (Journal<MemoryNotificationCenter>, Rc<FixedClock>) {
    let clock = Rc::new(FixedClock::new(now));
    let shared: Rc<dyn Clock> = clock.clone();
    let db = Database::open_in_memory_with_clock(shared).unwrap();
    (Journal::new(db, MemoryNotificationCenter::new()), clock)
}

fn reminders(journal: &Journal<MemoryNotificationCenter>) -> Vec<NaiveDateTime> {
    journal
        .scheduler()
        .scheduled_checkin_reminders()
        .unwrap()
        .into_iter()
        .map(|n| n.fire_at)
        .collect()
}

#[test]
fn a_week_of_check_ins() {
    let (mut journal, clock) = open(at(2024, 3, 1, 9, 0));
    assert_eq!(journal.start(), Some(at(2024, 3, 1, 19, 0)));

    // check in on four consecutive evenings
    for _ in 0..4 {
        clock.set(clock.now().date().and_hms_opt(20, 30, 0).unwrap());
        journal.start();
        assert_eq!(reminders(&journal), vec![clock.now().date().and_hms_opt(19, 0, 0).unwrap() + Duration::days(1)]);

        journal
            .create_entry(Entry { moods: Some("ok".to_string()), ..Entry::default() })
            .unwrap();
        assert_eq!(reminders(&journal).len(), 1);
        clock.advance(Duration::hours(14));
    }

    // 2024-03-05 10:30, nothing logged yet today
    assert_eq!(clock.now(), at(2024, 3, 5, 10, 30));
    assert_eq!(journal.db().compute_streak().unwrap(), 0);
    assert_eq!(journal.start(), Some(at(2024, 3, 5, 19, 0)));

    journal.create_entry(Entry::new()).unwrap();
    assert_eq!(journal.db().compute_streak().unwrap(), 5);
    assert_eq!(journal.db().get_entries_last_days(7).unwrap().len(), 5);
    assert_eq!(reminders(&journal), vec![at(2024, 3, 6, 19, 0)]);
}

#[test]
fn back_filling_yesterday_keeps_today_open() {
    let (mut journal, _clock) = open(at(2024, 3, 10, 8, 0));
    let yesterday = journal.timestamp_for(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    journal
        .create_entry(Entry { timestamp: Some(yesterday), ..Entry::default() })
        .unwrap();
    assert_eq!(reminders(&journal), vec![at(2024, 3, 10, 19, 0)]);
    assert_eq!(journal.db().compute_streak().unwrap(), 0);
}

#[test]
fn reminder_time_change_replaces_trigger() {
    let (mut journal, _clock) = open(at(2024, 3, 10, 8, 0));
    journal.start();
    let before = journal.scheduler().scheduled_checkin_reminders().unwrap();

    journal.set_reminder_time(ReminderTime::new(7, 45).unwrap()).unwrap();
    let after = journal.scheduler().scheduled_checkin_reminders().unwrap();

    assert_eq!(after.len(), 1);
    assert_eq!(after[0].fire_at, at(2024, 3, 11, 7, 45));
    assert!(after.iter().all(|n| n.identifier != before[0].identifier));
}

#[test]
fn file_spool_holds_a_single_reminder_across_restarts() {
    let dir = std::env::temp_dir().join(format!("clarity-it-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let db_path = dir.join("clarity.db");
    let spool_path = dir.join("notifications.json");

    for _ in 0..3 {
        let clock: Rc<dyn Clock> = Rc::new(FixedClock::new(at(2024, 3, 10, 8, 0)));
        let db = Database::with_clock(db_path.to_str().unwrap(), clock).unwrap();
        let mut journal = Journal::new(db, FileNotificationCenter::new(&spool_path));
        journal.start();
    }

    let spool = FileNotificationCenter::new(&spool_path);
    let pending = spool.scheduled().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].tag, REMINDER_TAG);
    assert_eq!(pending[0].fire_at, at(2024, 3, 10, 19, 0));

    let _ = std::fs::remove_dir_all(&dir);
}
