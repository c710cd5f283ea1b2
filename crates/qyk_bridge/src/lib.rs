use std::sync::Arc;

use anyhow::Result;
use qyk_core::schedule::{DEFAULT_HOUR, DEFAULT_MINUTE};
use qyk_core::{ReminderTime, ScheduleState};
use serde::{Deserialize, Serialize};

pub mod native;
#[cfg(feature = "node")]
pub mod node;
pub mod permissions;
pub mod shim;

pub use crate::native::NativeQuotes;
pub use crate::permissions::{PermissionGate, StaticPermissions};
pub use crate::shim::WebShim;

/// Platform the UI is running on, as reported by the capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Web,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else {
            Platform::Web
        }
    }

    /// Whether the platform has wake alarms and local notifications.
    pub fn has_native_reminders(self) -> bool {
        matches!(self, Platform::Android)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    #[serde(default)]
    pub hour: Option<u32>,
    #[serde(default)]
    pub minute: Option<u32>,
}

impl ScheduleOptions {
    pub fn at(time: ReminderTime) -> Self {
        Self {
            hour: Some(time.hour()),
            minute: Some(time.minute()),
        }
    }

    /// Missing fields mean 09:00, the same default the settings screen shows.
    pub fn time(&self) -> Result<ReminderTime> {
        Ok(ReminderTime::new(
            self.hour.unwrap_or(DEFAULT_HOUR),
            self.minute.unwrap_or(DEFAULT_MINUTE),
        )?)
    }
}

/// Reminder state handed to the UI. `hour`/`minute` are left out until a
/// time has been stored; the UI applies 09:00 in that case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeState {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
}

impl From<ScheduleState> for BridgeState {
    fn from(state: ScheduleState) -> Self {
        Self {
            enabled: state.enabled,
            hour: state.hour,
            minute: state.minute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestNotifyOutcome {
    PermissionRequested,
    SettingsOpened,
    Posted { body: String },
    Unsupported,
}

/// Reminder operations the UI layer calls. Every platform exposes the same
/// surface; platforms without native reminders get neutral no-ops.
pub trait DailyQuotes: Send + Sync {
    fn platform(&self) -> Platform;

    /// Shows the permission prompt where one is needed. Resolves whether or
    /// not the user grants it.
    fn request_permissions(&self) -> Result<()>;

    fn schedule_daily_quote(&self, options: ScheduleOptions) -> Result<()>;

    fn cancel_daily_quote(&self) -> Result<()>;

    fn get_state(&self) -> Result<BridgeState>;

    /// Posts one reminder now, or routes the user to the permission prompt
    /// or the notification settings when a reminder could not be shown.
    fn test_notify(&self) -> Result<TestNotifyOutcome>;
}

/// Picks the bridge for `platform` once at startup. A native bridge that
/// fails to initialise falls back to the shim so the UI keeps working.
pub fn select_bridge(
    platform: Platform,
    make_native: impl FnOnce() -> Result<Arc<dyn DailyQuotes>>,
) -> Arc<dyn DailyQuotes> {
    if !platform.has_native_reminders() {
        tracing::debug!(?platform, "no native reminders, using shim");
        return Arc::new(WebShim);
    }
    match make_native() {
        Ok(bridge) => bridge,
        Err(err) => {
            tracing::error!(%err, "native reminders unavailable, using shim");
            Arc::new(WebShim)
        }
    }
}
