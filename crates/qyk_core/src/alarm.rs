use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::instrument;

use crate::clock::Clock;
use crate::error::QykError;
use crate::schedule::{ReminderTime, ScheduleState};
use crate::settings::SettingsStore;

pub type AlarmId = i32;

/// The daily reminder only ever uses this id, so re-arming replaces.
pub const DAILY_QUOTE_ALARM_ID: AlarmId = 1001;

/// Platform wake-alarm service. Implementations must replace any pending
/// alarm registered under the same id.
pub trait AlarmService: Send + Sync {
    /// One-shot wake alarm allowed to fire while the device is idle.
    fn set_exact_and_allow_while_idle(
        &self,
        id: AlarmId,
        trigger_at: DateTime<Utc>,
    ) -> Result<(), QykError>;

    /// Cancelling an id with nothing pending is a no-op.
    fn cancel(&self, id: AlarmId) -> Result<(), QykError>;
}

/// Alarm service that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct InMemoryAlarms {
    pending: Mutex<BTreeMap<AlarmId, DateTime<Utc>>>,
    registrations: Mutex<Vec<(AlarmId, DateTime<Utc>)>>,
}

impl InMemoryAlarms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self, id: AlarmId) -> Option<DateTime<Utc>> {
        self.pending.lock().get(&id).copied()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Every `set` call seen so far, in order.
    pub fn registrations(&self) -> Vec<(AlarmId, DateTime<Utc>)> {
        self.registrations.lock().clone()
    }
}

impl AlarmService for InMemoryAlarms {
    fn set_exact_and_allow_while_idle(
        &self,
        id: AlarmId,
        trigger_at: DateTime<Utc>,
    ) -> Result<(), QykError> {
        self.pending.lock().insert(id, trigger_at);
        self.registrations.lock().push((id, trigger_at));
        Ok(())
    }

    fn cancel(&self, id: AlarmId) -> Result<(), QykError> {
        self.pending.lock().remove(&id);
        Ok(())
    }
}

/// First instant strictly after `now` at which the local wall clock
/// reads `time`: today if still ahead, otherwise tomorrow.
pub fn next_trigger_at(clock: &dyn Clock, time: ReminderTime, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = clock.local_naive(now).date();
    let candidate = clock.resolve_local(today.and_time(time.as_naive_time()));
    if candidate > now {
        return candidate;
    }
    let tomorrow = today + Duration::days(1);
    clock.resolve_local(tomorrow.and_time(time.as_naive_time()))
}

/// Keeps the persisted schedule and the registered wake alarm in step.
pub struct AlarmScheduler {
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    alarms: Arc<dyn AlarmService>,
}

impl AlarmScheduler {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        alarms: Arc<dyn AlarmService>,
    ) -> Self {
        Self {
            settings,
            clock,
            alarms,
        }
    }

    #[instrument(skip(self))]
    pub fn schedule(&self, time: ReminderTime) -> Result<DateTime<Utc>, QykError> {
        ScheduleState::save_enabled(self.settings.as_ref(), time)?;
        let trigger_at = next_trigger_at(self.clock.as_ref(), time, self.clock.now());
        self.arm(trigger_at)?;
        Ok(trigger_at)
    }

    #[instrument(skip(self))]
    pub fn cancel(&self) -> Result<(), QykError> {
        ScheduleState::save_disabled(self.settings.as_ref())?;
        self.alarms.cancel(DAILY_QUOTE_ALARM_ID)?;
        tracing::info!("daily quote alarm disarmed");
        Ok(())
    }

    /// Re-registers the alarm from persisted state after the platform has
    /// dropped it (reboot, app update). Does nothing when disabled.
    #[instrument(skip(self))]
    pub fn ensure_scheduled(&self) -> Result<Option<DateTime<Utc>>, QykError> {
        let state = self.state();
        if !state.enabled {
            tracing::debug!("reminders disabled, nothing to restore");
            return Ok(None);
        }
        let trigger_at = next_trigger_at(self.clock.as_ref(), state.time(), self.clock.now());
        self.arm(trigger_at)?;
        Ok(Some(trigger_at))
    }

    /// Re-arms a flat 24 hours after the current instant. Called after a
    /// reminder fired; a reminder disabled in the meantime stays disarmed.
    #[instrument(skip(self))]
    pub fn schedule_next(&self) -> Result<Option<DateTime<Utc>>, QykError> {
        if !self.state().enabled {
            tracing::debug!("reminders disabled before rearm, skipping");
            return Ok(None);
        }
        let trigger_at = self.clock.now() + Duration::hours(24);
        self.arm(trigger_at)?;
        Ok(Some(trigger_at))
    }

    /// Persisted state with the 09:00 default filled in where no time was
    /// ever stored.
    pub fn state(&self) -> ScheduleState {
        ScheduleState::load(self.settings.as_ref()).with_defaults()
    }

    fn arm(&self, trigger_at: DateTime<Utc>) -> Result<(), QykError> {
        self.alarms
            .set_exact_and_allow_while_idle(DAILY_QUOTE_ALARM_ID, trigger_at)?;
        tracing::info!(%trigger_at, "daily quote alarm armed");
        Ok(())
    }
}
