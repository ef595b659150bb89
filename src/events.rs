use chrono::NaiveDate;

/// A change to the entry table, tagged with the calendar day(s) it touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryEvent {
    Created {
        id: i64,
        day: NaiveDate,
    },
    Updated {
        id: i64,
        day: NaiveDate,
        /// Day the entry belonged to before the edit, when it moved
        previous_day: Option<NaiveDate>,
    },
    Deleted {
        id: i64,
        /// `None` when the id did not exist
        day: Option<NaiveDate>,
    },
}

impl EntryEvent {
    /// Whether this change affects which entry `day` has
    pub fn touches(&self, day: NaiveDate) -> bool {
        match *self {
            EntryEvent::Created { day: d, .. } => d == day,
            EntryEvent::Updated { day: d, previous_day, .. } => d == day || previous_day == Some(day),
            EntryEvent::Deleted { day: d, .. } => d == Some(day),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::date;

    #[test]
    fn moved_entry_touches_both_days() {
        let event = EntryEvent::Updated {
            id: 4,
            day: date(2024, 5, 2),
            previous_day: Some(date(2024, 5, 1)),
        };
        assert!(event.touches(date(2024, 5, 1)));
        assert!(event.touches(date(2024, 5, 2)));
        assert!(!event.touches(date(2024, 5, 3)));
    }

    #[test]
    fn deleting_unknown_id_touches_nothing() {
        let event = EntryEvent::Deleted { id: 9, day: None };
        assert!(!event.touches(date(2024, 5, 1)));
    }
}
