use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::QykError;
use crate::settings::SettingsStore;

pub const PREFS_NAMESPACE: &str = "qyk_quotes_prefs";
const KEY_ENABLED: &str = "enabled";
const KEY_HOUR: &str = "hour";
const KEY_MINUTE: &str = "minute";

pub const DEFAULT_HOUR: u32 = 9;
pub const DEFAULT_MINUTE: u32 = 0;

/// Local wall-clock time of the daily reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReminderTime {
    hour: u32,
    minute: u32,
}

impl ReminderTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, QykError> {
        if hour > 23 || minute > 59 {
            return Err(QykError::InvalidTime { hour, minute });
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Default for ReminderTime {
    fn default() -> Self {
        Self {
            hour: DEFAULT_HOUR,
            minute: DEFAULT_MINUTE,
        }
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ReminderTime {
    type Err = QykError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let unparsable = || QykError::UnparsableTime(input.to_string());
        let (hour, minute) = input.trim().split_once(':').ok_or_else(unparsable)?;
        let hour: u32 = hour.trim().parse().map_err(|_| unparsable())?;
        let minute: u32 = minute.trim().parse().map_err(|_| unparsable())?;
        Self::new(hour, minute)
    }
}

/// Persisted reminder schedule. `hour`/`minute` stay `None` until the first
/// time a reminder is enabled and survive every later disable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
}

impl ScheduleState {
    /// Stored values that are not a valid hour or minute read as absent.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let read_in_range = |key, max: u32| {
            store
                .get_int(PREFS_NAMESPACE, key)
                .and_then(|value| u32::try_from(value).ok())
                .filter(|value| *value <= max)
        };
        Self {
            enabled: store.get_bool(PREFS_NAMESPACE, KEY_ENABLED).unwrap_or(false),
            hour: read_in_range(KEY_HOUR, 23),
            minute: read_in_range(KEY_MINUTE, 59),
        }
    }

    /// Turns scheduling on at `time`.
    pub fn save_enabled(store: &dyn SettingsStore, time: ReminderTime) -> Result<(), QykError> {
        store.put_many(
            PREFS_NAMESPACE,
            &[
                (KEY_ENABLED, true.into()),
                (KEY_HOUR, time.hour().into()),
                (KEY_MINUTE, time.minute().into()),
            ],
        )
    }

    /// Turns scheduling off; the last time is kept for the next enable.
    pub fn save_disabled(store: &dyn SettingsStore) -> Result<(), QykError> {
        store.put(PREFS_NAMESPACE, KEY_ENABLED, false.into())
    }

    /// Same state with any absent hour or minute replaced by the default.
    pub fn with_defaults(self) -> Self {
        let time = self.time();
        Self {
            enabled: self.enabled,
            hour: Some(time.hour()),
            minute: Some(time.minute()),
        }
    }

    /// Reminder time with the 09:00 default filled in for absent or
    /// out-of-range values.
    pub fn time(&self) -> ReminderTime {
        ReminderTime::new(
            self.hour.unwrap_or(DEFAULT_HOUR),
            self.minute.unwrap_or(DEFAULT_MINUTE),
        )
        .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemorySettings, SettingValue};

    #[test]
    fn rejects_out_of_range_times() {
        assert!(ReminderTime::new(24, 0).is_err());
        assert!(ReminderTime::new(0, 60).is_err());
        assert_eq!(ReminderTime::new(23, 59).unwrap().to_string(), "23:59");
    }

    #[test]
    fn parses_time_input() {
        let parsed: ReminderTime = "07:05".parse().unwrap();
        assert_eq!((parsed.hour(), parsed.minute()), (7, 5));
        assert!("7".parse::<ReminderTime>().is_err());
        assert!("ab:cd".parse::<ReminderTime>().is_err());
        assert!("25:00".parse::<ReminderTime>().is_err());
    }

    #[test]
    fn empty_store_reads_disabled_with_default_time() {
        let store = MemorySettings::new();
        let state = ScheduleState::load(&store);
        assert!(!state.enabled);
        assert_eq!(state.hour, None);
        assert_eq!(state.time(), ReminderTime::new(9, 0).unwrap());
    }

    #[test]
    fn disabling_keeps_last_time() {
        let store = MemorySettings::new();
        ScheduleState::save_enabled(&store, ReminderTime::new(21, 15).unwrap()).unwrap();
        ScheduleState::save_disabled(&store).unwrap();
        let state = ScheduleState::load(&store);
        assert_eq!(
            state,
            ScheduleState {
                enabled: false,
                hour: Some(21),
                minute: Some(15),
            }
        );
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        let store = MemorySettings::new();
        store
            .put_many(
                PREFS_NAMESPACE,
                &[
                    (KEY_ENABLED, SettingValue::Text("yes".into())),
                    (KEY_HOUR, SettingValue::Int(-3)),
                    (KEY_MINUTE, SettingValue::Int(75)),
                ],
            )
            .unwrap();
        let state = ScheduleState::load(&store);
        assert!(!state.enabled);
        assert_eq!(state.hour, None);
        assert_eq!(state.time(), ReminderTime::default());
    }

    #[test]
    fn out_of_range_values_read_as_absent() {
        let store = MemorySettings::new();
        store
            .put_many(
                PREFS_NAMESPACE,
                &[
                    (KEY_ENABLED, true.into()),
                    (KEY_HOUR, SettingValue::Int(30)),
                    (KEY_MINUTE, SettingValue::Int(15)),
                ],
            )
            .unwrap();
        let state = ScheduleState::load(&store);
        assert_eq!(
            state,
            ScheduleState {
                enabled: true,
                hour: None,
                minute: Some(15),
            }
        );
        assert_eq!(
            state.with_defaults(),
            ScheduleState {
                enabled: true,
                hour: Some(9),
                minute: Some(15),
            }
        );
    }
}
