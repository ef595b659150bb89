pub mod cli;
pub mod clock;
pub mod config;
pub mod database;
pub mod events;
pub mod journal;
pub mod models;
pub mod notifications;
pub mod reminder;
pub mod report;
pub mod streak;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use database::{Database, DatabaseError};
pub use journal::Journal;
pub use models::{Entry, ThoughtLog, UserInfo};
pub use reminder::{ReminderScheduler, ReminderTime};
pub use utils::Profile;
