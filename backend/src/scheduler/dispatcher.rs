//! Notification dispatcher seam.

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::info;
use parking_lot::RwLock;

use super::reminder::{ReminderId, ReminderRequest};

/// Failure reported by a dispatcher.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// The user has not granted notification permission.
    #[error("Notification permission denied: {0}")]
    PermissionDenied(String),

    #[error("Dispatcher rejected request: {0}")]
    Rejected(String),
}

/// External service that fires one-shot notifications.
///
/// `schedule` with an id already armed replaces it. `cancel` of an unknown
/// id succeeds.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn schedule(&self, request: &ReminderRequest) -> Result<(), DispatchError>;

    async fn cancel(&self, id: &ReminderId) -> Result<(), DispatchError>;

    async fn cancel_all(&self) -> Result<(), DispatchError>;
}

/// A call received by [`LoggingDispatcher`].
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchCall {
    Schedule(ReminderId),
    Cancel(ReminderId),
    CancelAll,
}

/// Dispatcher that logs each call and keeps the set of live reminders in memory.
#[derive(Debug, Default)]
pub struct LoggingDispatcher {
    live: RwLock<BTreeMap<ReminderId, ReminderRequest>>,
    calls: RwLock<Vec<DispatchCall>>,
}

impl LoggingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reminders currently armed, ordered by id.
    pub fn live(&self) -> Vec<ReminderRequest> {
        self.live.read().values().cloned().collect()
    }

    pub fn live_count(&self) -> usize {
        self.live.read().len()
    }

    pub fn is_live(&self, id: &ReminderId) -> bool {
        self.live.read().contains_key(id)
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<DispatchCall> {
        self.calls.read().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn schedule(&self, request: &ReminderRequest) -> Result<(), DispatchError> {
        info!(
            "Reminder {} armed for {} ({})",
            request.id, request.fire_at, request.sound
        );
        self.calls.write().push(DispatchCall::Schedule(request.id.clone()));
        self.live.write().insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn cancel(&self, id: &ReminderId) -> Result<(), DispatchError> {
        self.calls.write().push(DispatchCall::Cancel(id.clone()));
        if self.live.write().remove(id).is_some() {
            info!("Reminder {} cancelled", id);
        }
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), DispatchError> {
        self.calls.write().push(DispatchCall::CancelAll);
        let mut live = self.live.write();
        info!("Cancelling all {} reminders", live.len());
        live.clear();
        Ok(())
    }
}
