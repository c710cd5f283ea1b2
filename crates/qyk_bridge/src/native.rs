use std::sync::Arc;

use anyhow::{Context, Result};
use qyk_core::ReminderRuntime;
use tracing::instrument;

use crate::permissions::PermissionGate;
use crate::{BridgeState, DailyQuotes, Platform, ScheduleOptions, TestNotifyOutcome};

/// Bridge backed by the device's alarm and notification services.
pub struct NativeQuotes {
    runtime: Arc<ReminderRuntime>,
    permissions: Arc<dyn PermissionGate>,
}

impl NativeQuotes {
    pub fn new(runtime: Arc<ReminderRuntime>, permissions: Arc<dyn PermissionGate>) -> Self {
        Self {
            runtime,
            permissions,
        }
    }

}

impl DailyQuotes for NativeQuotes {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn request_permissions(&self) -> Result<()> {
        if self.permissions.requires_runtime_permission() {
            self.permissions.request_permission();
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn schedule_daily_quote(&self, options: ScheduleOptions) -> Result<()> {
        let time = options.time()?;
        self.runtime
            .schedule(time)
            .with_context(|| format!("failed to schedule daily quote at {time}"))?;
        if let Err(err) = self.runtime.poster().ensure_channel() {
            tracing::warn!(%err, "notification channel not created, will retry on first post");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn cancel_daily_quote(&self) -> Result<()> {
        self.runtime
            .cancel()
            .context("failed to cancel daily quote")
    }

    fn get_state(&self) -> Result<BridgeState> {
        Ok(self.runtime.state().into())
    }

    #[instrument(skip(self))]
    fn test_notify(&self) -> Result<TestNotifyOutcome> {
        if self.permissions.requires_runtime_permission() && !self.permissions.permission_granted() {
            tracing::info!("notification permission missing, prompting instead");
            self.permissions.request_permission();
            return Ok(TestNotifyOutcome::PermissionRequested);
        }
        if !self.permissions.notifications_enabled() {
            tracing::info!("notifications disabled, opening settings");
            if let Err(err) = self.permissions.open_notification_settings() {
                tracing::warn!(%err, "unable to open notification settings");
            }
            return Ok(TestNotifyOutcome::SettingsOpened);
        }
        let delivery = self.runtime.post_quote_now();
        Ok(TestNotifyOutcome::Posted {
            body: delivery.body,
        })
    }
}
