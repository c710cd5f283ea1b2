use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use qyk_bridge::{DailyQuotes, NativeQuotes, StaticPermissions};
use qyk_core::alarm::{InMemoryAlarms, DAILY_QUOTE_ALARM_ID};
use qyk_core::clock::FixedClock;
use qyk_core::notifications::RecordingSink;
use qyk_core::schedule::PREFS_NAMESPACE;
use qyk_core::settings::{FileSettings, SettingValue, SettingsStore};
use qyk_core::{ReminderRuntime, ReminderTime};
use qyk_sync::{read_mirror, MirrorState, ReminderPreferences};
use tempfile::tempdir;

fn native_bridge(settings: Arc<dyn SettingsStore>, alarms: Arc<InMemoryAlarms>) -> Arc<NativeQuotes> {
    let now = NaiveDate::from_ymd_opt(2025, 9, 1)
        .expect("date")
        .and_hms_opt(12, 0, 0)
        .expect("time");
    let runtime = ReminderRuntime::builder()
        .with_settings(settings)
        .with_clock(Arc::new(FixedClock::at_local(
            FixedOffset::east_opt(0).expect("offset"),
            now,
        )))
        .with_alarms(alarms)
        .with_notification_sink(Arc::new(RecordingSink::new()))
        .build()
        .expect("runtime");
    Arc::new(NativeQuotes::new(
        Arc::new(runtime),
        Arc::new(StaticPermissions::granted()),
    ))
}

#[test]
fn settings_screen_drives_native_schedule() {
    let temp = tempdir().expect("tempdir");
    let settings: Arc<dyn SettingsStore> =
        Arc::new(FileSettings::open(temp.path()).expect("settings"));
    let alarms = Arc::new(InMemoryAlarms::new());
    let bridge = native_bridge(settings.clone(), alarms.clone());

    let prefs = ReminderPreferences::new(settings.clone(), bridge.clone());
    assert_eq!(prefs.state(), MirrorState::default());

    prefs.set_time(ReminderTime::new(20, 30).expect("time"));
    assert_eq!(alarms.pending_count(), 0, "disabled reminders are not armed");

    prefs.set_enabled(true);
    assert!(alarms.pending(DAILY_QUOTE_ALARM_ID).is_some());
    let native = bridge.get_state().expect("state");
    assert_eq!((native.hour, native.minute), (Some(20), Some(30)));

    prefs.set_enabled(false);
    assert_eq!(alarms.pending_count(), 0);
    assert!(!bridge.get_state().expect("state").enabled);
}

#[test]
fn relaunch_reconciles_stale_mirror_from_native() {
    let temp = tempdir().expect("tempdir");
    let settings: Arc<dyn SettingsStore> =
        Arc::new(FileSettings::open(temp.path()).expect("settings"));
    let alarms = Arc::new(InMemoryAlarms::new());
    let bridge = native_bridge(settings.clone(), alarms);

    // Mirror says disabled; the native side was enabled behind its back.
    let prefs = ReminderPreferences::new(settings.clone(), bridge.clone());
    prefs.set_time(ReminderTime::new(7, 0).expect("time"));
    bridge
        .schedule_daily_quote(qyk_bridge::ScheduleOptions {
            hour: Some(8),
            minute: Some(15),
        })
        .expect("schedule");

    let relaunched = ReminderPreferences::new(settings.clone(), bridge);
    assert!(!relaunched.enabled());
    assert_eq!(relaunched.time_label(), "07:00");

    let synced = relaunched.sync_from_native().expect("native platform");
    assert_eq!(
        synced,
        MirrorState {
            enabled: true,
            hour: 8,
            minute: 15,
        }
    );
    assert_eq!(read_mirror(settings.as_ref()), synced);
}

#[test]
fn corrupt_native_time_never_reaches_the_mirror() {
    let temp = tempdir().expect("tempdir");
    let settings: Arc<dyn SettingsStore> =
        Arc::new(FileSettings::open(temp.path()).expect("settings"));
    settings
        .put_many(
            PREFS_NAMESPACE,
            &[
                ("enabled", true.into()),
                ("hour", SettingValue::Int(30)),
                ("minute", SettingValue::Int(15)),
            ],
        )
        .expect("seed native prefs");
    let bridge = native_bridge(settings.clone(), Arc::new(InMemoryAlarms::new()));

    let native = bridge.get_state().expect("state");
    assert_eq!((native.hour, native.minute), (Some(9), Some(15)));

    let prefs = ReminderPreferences::new(settings.clone(), bridge);
    let synced = prefs.sync_from_native().expect("native platform");
    assert_eq!(
        synced,
        MirrorState {
            enabled: true,
            hour: 9,
            minute: 15,
        }
    );
    assert_eq!(prefs.time_label(), "09:15");
    assert_eq!(read_mirror(settings.as_ref()), synced);
}
