//! Reminder scheduler.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use super::dispatcher::NotificationDispatcher;
use super::reminder::{ReminderId, ReminderRequest, ReminderState, SoundConfig};
use crate::models::{Prayer, PrayerSchedule};

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors returned by [`ReminderScheduler`].
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The dispatcher refused or did not answer in time. Not retried.
    #[error("Notification dispatcher unavailable: {reason} ({} armed, {} failed)", .armed.len(), .failed.len())]
    DispatcherUnavailable {
        /// Reminders left armed.
        armed: Vec<ReminderRequest>,
        /// Reminders that were not armed.
        failed: Vec<ReminderId>,
        reason: String,
    },

    #[error("Invalid reminder transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: ReminderId,
        from: ReminderState,
        to: ReminderState,
    },

    #[error("Unknown reminder: {id}")]
    UnknownReminder { id: ReminderId },
}

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound on each dispatcher call.
    pub dispatch_timeout: Duration,
    /// Cancel what was armed when a refresh fails part-way.
    pub rollback_on_failure: bool,
    pub sounds: SoundConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout: Duration::from_secs(5),
            rollback_on_failure: false,
            sounds: SoundConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct TrackedReminder {
    request: ReminderRequest,
    state: ReminderState,
}

/// Arms one reminder per future prayer instant and tracks their lifecycle.
///
/// The scheduler is the only writer to the dispatcher. Refreshes of the same
/// date are serialised; refreshes of different dates run concurrently.
/// [`cancel_all`](Self::cancel_all) waits for in-flight refreshes and holds
/// off new ones until it is done.
pub struct ReminderScheduler {
    dispatcher: Arc<dyn NotificationDispatcher>,
    config: SchedulerConfig,
    /// Shared by per-date work, exclusive for `cancel_all`.
    gate: tokio::sync::RwLock<()>,
    date_locks: Mutex<HashMap<NaiveDate, Arc<tokio::sync::Mutex<()>>>>,
    registry: RwLock<HashMap<ReminderId, TrackedReminder>>,
}

impl ReminderScheduler {
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>, config: SchedulerConfig) -> Self {
        Self {
            dispatcher,
            config,
            gate: tokio::sync::RwLock::new(()),
            date_locks: Mutex::new(HashMap::new()),
            registry: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn date_lock(&self, date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        self.date_locks.lock().entry(date).or_default().clone()
    }

    async fn dispatch_schedule(&self, request: &ReminderRequest) -> Result<(), String> {
        match tokio::time::timeout(self.config.dispatch_timeout, self.dispatcher.schedule(request)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "schedule({}) timed out after {:?}",
                request.id, self.config.dispatch_timeout
            )),
        }
    }

    async fn dispatch_cancel(&self, id: &ReminderId) -> Result<(), String> {
        match tokio::time::timeout(self.config.dispatch_timeout, self.dispatcher.cancel(id)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "cancel({}) timed out after {:?}",
                id, self.config.dispatch_timeout
            )),
        }
    }

    fn set_state(&self, id: &ReminderId, to: ReminderState) -> SchedulerResult<()> {
        let mut registry = self.registry.write();
        let tracked = registry
            .get_mut(id)
            .ok_or_else(|| SchedulerError::UnknownReminder { id: id.clone() })?;
        tracked.state = tracked
            .state
            .transition(to)
            .map_err(|(from, to)| SchedulerError::InvalidTransition {
                id: id.clone(),
                from,
                to,
            })?;
        Ok(())
    }

    /// Cancel a tracked reminder if it is still pending; terminal ones are left as is.
    fn mark_cancelled_if_pending(&self, id: &ReminderId) {
        if let Some(tracked) = self.registry.write().get_mut(id) {
            if tracked.state == ReminderState::Pending {
                tracked.state = ReminderState::Cancelled;
            }
        }
    }

    /// Replace the reminders of `schedule`'s date with one per instant after `now`.
    ///
    /// Returns the reminders armed, in daily order. Instants at or before
    /// `now` are skipped, as are prayers whose reminder already fired.
    /// A cancelled reminder is armed again as a fresh `Pending` one.
    ///
    /// # Errors
    ///
    /// `DispatcherUnavailable` when a dispatcher call fails or times out. The
    /// reminders armed before the failure are reported in `armed` (or
    /// cancelled, with `rollback_on_failure`).
    pub async fn refresh_reminders(
        &self,
        schedule: &PrayerSchedule,
        now: DateTime<FixedOffset>,
    ) -> SchedulerResult<Vec<ReminderRequest>> {
        let date = schedule.date();
        let _gate = self.gate.read().await;
        let lock = self.date_lock(date);
        let _guard = lock.lock().await;

        let fired: BTreeSet<ReminderId> = self
            .registry
            .read()
            .iter()
            .filter(|(_, tracked)| {
                tracked.request.date == date && tracked.state == ReminderState::Fired
            })
            .map(|(id, _)| id.clone())
            .collect();
        let requests: Vec<ReminderRequest> = schedule
            .iter()
            .filter(|(prayer, at)| *at > now && !fired.contains(&ReminderId::new(date, *prayer)))
            .map(|(prayer, at)| {
                ReminderRequest::new(date, prayer, at, self.config.sounds.sound_for(prayer))
            })
            .collect();

        let mut stale: BTreeSet<ReminderId> =
            Prayer::ALL.iter().map(|p| ReminderId::new(date, *p)).collect();
        stale.extend(
            self.registry
                .read()
                .iter()
                .filter(|(_, tracked)| tracked.request.date == date)
                .map(|(id, _)| id.clone()),
        );

        for id in &stale {
            if let Err(reason) = self.dispatch_cancel(id).await {
                warn!("Cancelling {} failed: {}", id, reason);
                return Err(SchedulerError::DispatcherUnavailable {
                    armed: self.armed_for(date),
                    failed: requests.iter().map(|r| r.id.clone()).collect(),
                    reason,
                });
            }
            self.mark_cancelled_if_pending(id);
        }
        debug!("Cancelled {} reminder ids for {}", stale.len(), date);

        let mut armed = Vec::with_capacity(requests.len());
        for (i, request) in requests.iter().enumerate() {
            match self.dispatch_schedule(request).await {
                Ok(()) => {
                    self.registry.write().insert(
                        request.id.clone(),
                        TrackedReminder {
                            request: request.clone(),
                            state: ReminderState::Pending,
                        },
                    );
                    armed.push(request.clone());
                }
                Err(reason) => {
                    warn!("Arming {} failed: {}", request.id, reason);
                    let failed: Vec<ReminderId> =
                        requests[i..].iter().map(|r| r.id.clone()).collect();
                    if self.config.rollback_on_failure {
                        self.rollback(&armed, &request.id).await;
                        armed.clear();
                    }
                    return Err(SchedulerError::DispatcherUnavailable {
                        armed,
                        failed,
                        reason,
                    });
                }
            }
        }

        info!(
            "Armed {} reminders for {} ({} past or fired)",
            armed.len(),
            date,
            Prayer::ALL.len() - requests.len()
        );
        Ok(armed)
    }

    /// Best-effort cancel of a partial refresh, including the request whose
    /// outcome is unknown.
    async fn rollback(&self, armed: &[ReminderRequest], failed: &ReminderId) {
        let ids = armed.iter().map(|r| &r.id).chain(std::iter::once(failed));
        for id in ids {
            if let Err(reason) = self.dispatch_cancel(id).await {
                warn!("Rollback of {} failed: {}", id, reason);
            }
            self.mark_cancelled_if_pending(id);
        }
    }

    /// Pending reminders for `date`, in fire order.
    pub fn armed_for(&self, date: NaiveDate) -> Vec<ReminderRequest> {
        let mut armed: Vec<ReminderRequest> = self
            .registry
            .read()
            .values()
            .filter(|t| t.request.date == date && t.state == ReminderState::Pending)
            .map(|t| t.request.clone())
            .collect();
        armed.sort_by_key(|r| r.fire_at);
        armed
    }

    pub fn state_of(&self, id: &ReminderId) -> Option<ReminderState> {
        self.registry.read().get(id).map(|t| t.state)
    }

    /// Record that the dispatcher delivered a reminder.
    pub fn mark_fired(&self, id: &ReminderId) -> SchedulerResult<()> {
        self.set_state(id, ReminderState::Fired)
    }

    /// Cancel one tracked reminder.
    pub async fn cancel_reminder(&self, id: &ReminderId) -> SchedulerResult<()> {
        let (date, state) = {
            let registry = self.registry.read();
            let tracked = registry
                .get(id)
                .ok_or_else(|| SchedulerError::UnknownReminder { id: id.clone() })?;
            (tracked.request.date, tracked.state)
        };
        state
            .transition(ReminderState::Cancelled)
            .map_err(|(from, to)| SchedulerError::InvalidTransition {
                id: id.clone(),
                from,
                to,
            })?;

        let _gate = self.gate.read().await;
        let lock = self.date_lock(date);
        let _guard = lock.lock().await;
        self.dispatch_cancel(id)
            .await
            .map_err(|reason| SchedulerError::DispatcherUnavailable {
                armed: self.armed_for(date),
                failed: Vec::new(),
                reason,
            })?;
        self.mark_cancelled_if_pending(id);
        Ok(())
    }

    /// Cancel every reminder with the dispatcher. Returns how many were pending.
    ///
    /// Runs after any refresh already in progress, so nothing that refresh
    /// arms outlives the call.
    pub async fn cancel_all(&self) -> SchedulerResult<usize> {
        let _gate = self.gate.write().await;
        match tokio::time::timeout(self.config.dispatch_timeout, self.dispatcher.cancel_all()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(self.cancel_all_failed(e.to_string())),
            Err(_) => {
                return Err(self.cancel_all_failed(format!(
                    "cancel_all timed out after {:?}",
                    self.config.dispatch_timeout
                )))
            }
        }

        let mut cancelled = 0;
        for tracked in self.registry.write().values_mut() {
            if tracked.state == ReminderState::Pending {
                tracked.state = ReminderState::Cancelled;
                cancelled += 1;
            }
        }
        info!("Cancelled all reminders ({} pending)", cancelled);
        Ok(cancelled)
    }

    fn cancel_all_failed(&self, reason: String) -> SchedulerError {
        let mut armed: Vec<ReminderRequest> = self
            .registry
            .read()
            .values()
            .filter(|t| t.state == ReminderState::Pending)
            .map(|t| t.request.clone())
            .collect();
        armed.sort_by_key(|r| r.fire_at);
        SchedulerError::DispatcherUnavailable {
            armed,
            failed: Vec::new(),
            reason,
        }
    }

    /// Forget terminal reminders of dates before `before`. Returns how many were dropped.
    pub fn prune_before(&self, before: NaiveDate) -> usize {
        let mut registry = self.registry.write();
        let len = registry.len();
        registry.retain(|_, t| t.request.date >= before || !t.state.is_terminal());
        self.date_locks.lock().retain(|date, _| *date >= before);
        len - registry.len()
    }
}
