use anyhow::Result;

use crate::{BridgeState, DailyQuotes, Platform, ScheduleOptions, TestNotifyOutcome};

/// Stand-in for platforms without alarms or local notifications. Every call
/// succeeds and changes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebShim;

impl DailyQuotes for WebShim {
    fn platform(&self) -> Platform {
        Platform::Web
    }

    fn request_permissions(&self) -> Result<()> {
        Ok(())
    }

    fn schedule_daily_quote(&self, _options: ScheduleOptions) -> Result<()> {
        Ok(())
    }

    fn cancel_daily_quote(&self) -> Result<()> {
        Ok(())
    }

    fn get_state(&self) -> Result<BridgeState> {
        Ok(BridgeState::default())
    }

    fn test_notify(&self) -> Result<TestNotifyOutcome> {
        Ok(TestNotifyOutcome::Unsupported)
    }
}
