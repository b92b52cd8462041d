//! Reminder requests and their lifecycle.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::Prayer;

/// Notification title shared by every reminder.
pub const REMINDER_TITLE: &str = "Prayer Time";

/// Deterministic reminder identifier: `"{date}:{prayer}"`, e.g. `2024-01-01:Fajr`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(String);

impl ReminderId {
    pub fn new(date: NaiveDate, prayer: Prayer) -> Self {
        Self(format!("{}:{}", date.format("%Y-%m-%d"), prayer))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReminderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle of a tracked reminder.
///
/// `Pending` moves to `Fired` or `Cancelled`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderState {
    Pending,
    Fired,
    Cancelled,
}

impl ReminderState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReminderState::Pending)
    }

    /// Validate a move to `to`. Re-cancelling is accepted as a no-op.
    pub fn transition(self, to: ReminderState) -> Result<ReminderState, (ReminderState, ReminderState)> {
        match (self, to) {
            (ReminderState::Pending, ReminderState::Fired)
            | (ReminderState::Pending, ReminderState::Cancelled)
            | (ReminderState::Cancelled, ReminderState::Cancelled) => Ok(to),
            (from, to) => Err((from, to)),
        }
    }
}

impl fmt::Display for ReminderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReminderState::Pending => "pending",
            ReminderState::Fired => "fired",
            ReminderState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Sound identifiers handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default = "default_sound")]
    pub default_sound: String,
    /// Per-prayer overrides of `default_sound`.
    #[serde(default = "default_overrides")]
    pub overrides: HashMap<Prayer, String>,
}

fn default_sound() -> String {
    "adhan.wav".to_string()
}

fn default_overrides() -> HashMap<Prayer, String> {
    HashMap::from([(Prayer::Sunrise, "default".to_string())])
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            default_sound: default_sound(),
            overrides: default_overrides(),
        }
    }
}

impl SoundConfig {
    pub fn sound_for(&self, prayer: Prayer) -> &str {
        self.overrides
            .get(&prayer)
            .map(String::as_str)
            .unwrap_or(&self.default_sound)
    }
}

/// One-shot notification to be armed with the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderRequest {
    pub id: ReminderId,
    pub date: NaiveDate,
    pub prayer: Prayer,
    pub fire_at: DateTime<FixedOffset>,
    pub title: String,
    pub body: String,
    pub sound: String,
}

impl ReminderRequest {
    pub fn new(date: NaiveDate, prayer: Prayer, fire_at: DateTime<FixedOffset>, sound: &str) -> Self {
        Self {
            id: ReminderId::new(date, prayer),
            date,
            prayer,
            fire_at,
            title: REMINDER_TITLE.to_string(),
            body: reminder_body(prayer),
            sound: sound.to_string(),
        }
    }
}

fn reminder_body(prayer: Prayer) -> String {
    if prayer.is_prayer() {
        format!("It is time for {} prayer.", prayer)
    } else {
        "The sun is rising.".to_string()
    }
}
