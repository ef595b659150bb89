#![allow(dead_code)]
use chrono::{NaiveDate, NaiveDateTime};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

use crate::clock::{Clock, FixedClock};
use crate::database::Database;
use crate::models::Entry;

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

pub(crate) fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, mi, s).expect("valid test time")
}

/// In-memory database whose notion of "now" is pinned to `now`
pub(crate) fn setup_test_db(now: NaiveDateTime) -> (Database, Rc<FixedClock>) {
    init_test_tracing();
    let clock = Rc::new(FixedClock::new(now));
    let shared: Rc<dyn Clock> = clock.clone();
    let db = Database::open_in_memory_with_clock(shared).expect("in-memory database");
    (db, clock)
}

pub(crate) fn entry_at(timestamp: NaiveDateTime, mood: &str) -> Entry {
    Entry {
        timestamp: Some(timestamp),
        moods: Some(mood.to_string()),
        ..Entry::default()
    }
}
