use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use qyk_bridge::{BridgeState, DailyQuotes, ScheduleOptions, TestNotifyOutcome};
use qyk_core::schedule::{DEFAULT_HOUR, DEFAULT_MINUTE};
use qyk_core::settings::SettingsStore;
use qyk_core::ReminderTime;

pub const MIRROR_NAMESPACE: &str = "qyk_quotes_state";
const KEY_STATE: &str = "state";

/// UI copy of the reminder settings, rendered before the native side answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorState {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
}

impl Default for MirrorState {
    fn default() -> Self {
        Self {
            enabled: false,
            hour: DEFAULT_HOUR,
            minute: DEFAULT_MINUTE,
        }
    }
}

impl MirrorState {
    pub fn time(&self) -> ReminderTime {
        ReminderTime::new(self.hour, self.minute).unwrap_or_default()
    }

    fn with_time(self, time: ReminderTime) -> Self {
        Self {
            hour: time.hour(),
            minute: time.minute(),
            ..self
        }
    }

    /// Native values win; a native side that has no time yet keeps ours.
    fn merge_native(self, native: BridgeState) -> Self {
        Self {
            enabled: native.enabled,
            hour: native.hour.unwrap_or(self.hour),
            minute: native.minute.unwrap_or(self.minute),
        }
    }

    fn from_stored(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        let hour = u32::try_from(value.get("hour")?.as_u64()?).ok()?;
        let minute = u32::try_from(value.get("minute")?.as_u64()?).ok()?;
        let time = ReminderTime::new(hour, minute).ok()?;
        let enabled = value.get("enabled").is_some_and(truthy);
        Some(Self {
            enabled,
            ..Self::default()
        }
        .with_time(time))
    }
}

/// Loose truthiness for `enabled`: `1` or `"yes"` count as on, `0`, `""`
/// and `null` as off.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn read_mirror(store: &dyn SettingsStore) -> MirrorState {
    store
        .get_string(MIRROR_NAMESPACE, KEY_STATE)
        .and_then(|raw| MirrorState::from_stored(&raw))
        .unwrap_or_default()
}

fn write_mirror(store: &dyn SettingsStore, state: MirrorState) {
    let result = serde_json::to_string(&state)
        .map_err(anyhow::Error::from)
        .and_then(|raw| Ok(store.put(MIRROR_NAMESPACE, KEY_STATE, raw.into())?));
    if let Err(err) = result {
        tracing::warn!(%err, "unable to persist reminder mirror");
    }
}

/// Settings-screen model for the daily reminder. Every change lands in the
/// local mirror first and is then pushed to the bridge; bridge failures are
/// logged and never undo the local change.
pub struct ReminderPreferences {
    store: Arc<dyn SettingsStore>,
    bridge: Arc<dyn DailyQuotes>,
    state: RwLock<MirrorState>,
}

impl ReminderPreferences {
    pub fn new(store: Arc<dyn SettingsStore>, bridge: Arc<dyn DailyQuotes>) -> Self {
        let state = read_mirror(store.as_ref());
        Self {
            store,
            bridge,
            state: RwLock::new(state),
        }
    }

    pub fn state(&self) -> MirrorState {
        *self.state.read()
    }

    pub fn enabled(&self) -> bool {
        self.state.read().enabled
    }

    pub fn time(&self) -> ReminderTime {
        self.state.read().time()
    }

    /// `HH:MM`, as shown in the time input.
    pub fn time_label(&self) -> String {
        self.time().to_string()
    }

    /// Pulls the authoritative state from the native side and overwrites
    /// the mirror with it. Does nothing on platforms without reminders.
    #[instrument(skip(self))]
    pub fn sync_from_native(&self) -> Option<MirrorState> {
        if !self.bridge.platform().has_native_reminders() {
            return None;
        }
        let native = match self.bridge.get_state() {
            Ok(native) => native,
            Err(err) => {
                tracing::warn!(%err, "unable to read native reminder state");
                return None;
            }
        };
        let merged = self.state().merge_native(native);
        self.commit(merged);
        Some(merged)
    }

    pub fn request_permissions(&self) {
        if let Err(err) = self.bridge.request_permissions() {
            tracing::warn!(%err, "permission request failed");
        }
    }

    #[instrument(skip(self))]
    pub fn set_enabled(&self, enabled: bool) {
        let next = MirrorState {
            enabled,
            ..self.state()
        };
        self.commit(next);
        let result = if enabled {
            self.bridge
                .schedule_daily_quote(ScheduleOptions::at(next.time()))
        } else {
            self.bridge.cancel_daily_quote()
        };
        if let Err(err) = result {
            tracing::warn!(%err, enabled, "unable to update native reminder");
        }
    }

    #[instrument(skip(self))]
    pub fn set_time(&self, time: ReminderTime) {
        let next = self.state().with_time(time);
        self.commit(next);
        if !next.enabled {
            return;
        }
        if let Err(err) = self.bridge.schedule_daily_quote(ScheduleOptions::at(time)) {
            tracing::warn!(%err, %time, "unable to reschedule native reminder");
        }
    }

    /// Applies a `HH:MM` value from the time input. Input that does not
    /// parse is ignored and `false` returned.
    pub fn set_time_input(&self, input: &str) -> bool {
        match input.parse::<ReminderTime>() {
            Ok(time) => {
                self.set_time(time);
                true
            }
            Err(err) => {
                tracing::debug!(%err, "ignoring time input");
                false
            }
        }
    }

    /// Asks for permission, then tries a test notification.
    pub fn send_test_notification(&self) -> Option<TestNotifyOutcome> {
        self.request_permissions();
        match self.bridge.test_notify() {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::warn!(%err, "test notification failed");
                None
            }
        }
    }

    fn commit(&self, next: MirrorState) {
        *self.state.write() = next;
        write_mirror(self.store.as_ref(), next);
    }
}
