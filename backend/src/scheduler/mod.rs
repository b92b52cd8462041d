//! Prayer reminder scheduling.
//!
//! ```text
//! PrayerSchedule ──► ReminderScheduler::refresh_reminders(schedule, now)
//!                        │  per-date lock
//!                        ├─ cancel "{date}:{prayer}" ids + tracked ids
//!                        └─ schedule one ReminderRequest per instant > now
//!                                   │
//!                                   ▼
//!                      dyn NotificationDispatcher (external)
//! ```

pub mod dispatcher;
pub mod reminder;
pub mod service;

pub use dispatcher::{DispatchCall, DispatchError, LoggingDispatcher, NotificationDispatcher};
pub use reminder::{ReminderId, ReminderRequest, ReminderState, SoundConfig, REMINDER_TITLE};
pub use service::{ReminderScheduler, SchedulerConfig, SchedulerError, SchedulerResult};
