use std::sync::Arc;

use napi_derive::napi;
use once_cell::sync::OnceCell;

use crate::{select_bridge, DailyQuotes, Platform, ScheduleOptions};

static BRIDGE: OnceCell<Arc<dyn DailyQuotes>> = OnceCell::new();

/// Installs the bridge every export talks to. Only the first call wins;
/// returns `false` if a bridge was already in place.
pub fn install(bridge: Arc<dyn DailyQuotes>) -> bool {
    BRIDGE.set(bridge).is_ok()
}

fn bridge() -> &'static Arc<dyn DailyQuotes> {
    // Node hosts have no wake alarms, so without an installed bridge the
    // probe settles on the shim.
    BRIDGE.get_or_init(|| {
        select_bridge(Platform::detect(), || {
            anyhow::bail!("no native reminder runtime installed")
        })
    })
}

#[napi(object)]
pub struct ScheduleDailyQuoteOptions {
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

#[napi(object)]
pub struct QuotesState {
    pub enabled: bool,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

#[napi]
pub fn request_permissions() -> napi::Result<()> {
    bridge().request_permissions().map_err(to_napi_error)
}

#[napi]
pub fn schedule_daily_quote(options: ScheduleDailyQuoteOptions) -> napi::Result<()> {
    bridge()
        .schedule_daily_quote(ScheduleOptions {
            hour: options.hour,
            minute: options.minute,
        })
        .map_err(to_napi_error)
}

#[napi]
pub fn cancel_daily_quote() -> napi::Result<()> {
    bridge().cancel_daily_quote().map_err(to_napi_error)
}

#[napi]
pub fn get_state() -> napi::Result<QuotesState> {
    let state = bridge().get_state().map_err(to_napi_error)?;
    Ok(QuotesState {
        enabled: state.enabled,
        hour: state.hour,
        minute: state.minute,
    })
}

#[napi]
pub fn test_notify() -> napi::Result<()> {
    let outcome = bridge().test_notify().map_err(to_napi_error)?;
    tracing::debug!(?outcome, "test notification handled");
    Ok(())
}

fn to_napi_error(err: anyhow::Error) -> napi::Error {
    napi::Error::new(napi::Status::GenericFailure, err.to_string())
}
