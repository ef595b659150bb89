use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One daily mood/wellness check-in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Option<i64>,
    /// Local wall-clock time. `None` on create means "now"; `None` on update
    /// keeps the stored timestamp.
    pub timestamp: Option<NaiveDateTime>,
    pub sleep_time: Option<String>,
    pub sleep_quality: Option<String>,
    pub moods: Option<String>, // comma-separated tags
    pub energy_level: Option<String>,
    pub stress_level: Option<String>,
    pub body_feel: Option<String>, // comma-separated tags
    pub appetite: Option<String>,
    pub focus: Option<String>,
    pub motivation: Option<String>,
    pub anxiety: Option<String>,
    pub others: Option<String>,
    pub ai_report: Option<String>,
}

/// CBT thought record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThoughtLog {
    pub id: Option<i64>,
    pub situation: String,
    pub emotions: String,
    pub automatic_thoughts: String,
    pub evidence_for: String,
    pub evidence_against: String,
    pub alternative_thought: String,
    pub outcome: String,
    pub timestamp: Option<NaiveDateTime>,
}

/// Personal profile used to personalise generated reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub weight: Option<i64>,
    pub height: Option<i64>,
    pub conditions: Option<String>,
    pub medications: Option<String>,
    pub hobbies: Option<String>,
    pub goals: Option<String>,
    pub occupation: Option<String>,
    pub physical_activity: Option<String>,
    pub additional_info: Option<String>,
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field labels and values in display order, without id, timestamp or report
    pub fn fields(&self) -> [(&'static str, Option<&str>); 11] {
        [
            ("Sleep Time", self.sleep_time.as_deref()),
            ("Sleep Quality", self.sleep_quality.as_deref()),
            ("Moods", self.moods.as_deref()),
            ("Energy Level", self.energy_level.as_deref()),
            ("Stress Level", self.stress_level.as_deref()),
            ("Body Feel", self.body_feel.as_deref()),
            ("Appetite", self.appetite.as_deref()),
            ("Focus", self.focus.as_deref()),
            ("Motivation", self.motivation.as_deref()),
            ("Anxiety", self.anxiety.as_deref()),
            ("Extra input", self.others.as_deref()),
        ]
    }
}

impl ThoughtLog {
    pub fn new(situation: String) -> Self {
        Self {
            situation,
            ..Self::default()
        }
    }
}

impl UserInfo {
    /// Render the profile as the plain-text blob handed to the report generator
    pub fn to_profile_text(&self) -> String {
        fn or_na<T: ToString>(value: &Option<T>) -> String {
            match value {
                Some(v) => {
                    let s = v.to_string();
                    if s.trim().is_empty() { "N/A".to_string() } else { s }
                }
                None => "N/A".to_string(),
            }
        }

        format!(
            "User Information:\n\
             Name: {}\n\
             Age: {}\n\
             Weight: {}\n\
             Height: {}\n\
             Conditions: {}\n\
             Medications: {}\n\
             Hobbies: {}\n\
             Goals: {}\n\
             Occupation: {}\n\
             Physical Activity: {}\n\
             Additional Info: {}",
            or_na(&self.name),
            or_na(&self.age),
            or_na(&self.weight),
            or_na(&self.height),
            or_na(&self.conditions),
            or_na(&self.medications),
            or_na(&self.hobbies),
            or_na(&self.goals),
            or_na(&self.occupation),
            or_na(&self.physical_activity),
            or_na(&self.additional_info),
        )
    }
}
