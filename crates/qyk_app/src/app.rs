use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use qyk_bridge::{select_bridge, DailyQuotes, NativeQuotes, Platform, StaticPermissions};
use qyk_core::clock::{Clock, SystemClock};
use qyk_core::settings::{FileSettings, SettingsStore};
use qyk_core::{PlatformEvent, ReminderRuntime, ReminderTime};
use qyk_sync::ReminderPreferences;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::host::{ConsoleSink, ThreadAlarms};

pub const USAGE: &str = "usage: qyk <command>

commands:
  state           print the reminder state
  schedule HH:MM  enable the daily reminder at HH:MM
  cancel          disable the daily reminder
  test            send a test notification
  permissions     request notification permission
  boot            restore the reminder after a restart
  run             restore the reminder and wait for it to fire";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) data_dir: PathBuf,
    pub(crate) platform: Platform,
    pub(crate) notifications_enabled: bool,
    pub(crate) permission_granted: bool,
    pub(crate) run_for: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("QYK_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(platform) = std::env::var("QYK_PLATFORM") {
            match platform.trim().to_ascii_lowercase().as_str() {
                "android" => config.platform = Platform::Android,
                "web" => config.platform = Platform::Web,
                other => warn!(value = other, "unknown QYK_PLATFORM, keeping default"),
            }
        }
        if let Ok(enabled) = std::env::var("QYK_NOTIFICATIONS_ENABLED") {
            match parse_flag(&enabled) {
                Some(value) => config.notifications_enabled = value,
                None => warn!(value = %enabled, "invalid QYK_NOTIFICATIONS_ENABLED, keeping default"),
            }
        }
        if let Ok(permission) = std::env::var("QYK_PERMISSION") {
            match permission.trim().to_ascii_lowercase().as_str() {
                "granted" => config.permission_granted = true,
                "denied" => config.permission_granted = false,
                other => warn!(value = other, "unknown QYK_PERMISSION, keeping default"),
            }
        }
        if let Ok(seconds) = std::env::var("QYK_RUN_SECONDS") {
            match seconds.trim().parse::<u64>() {
                Ok(value) => config.run_for = Some(Duration::from_secs(value)),
                Err(_) => warn!(value = %seconds, "invalid QYK_RUN_SECONDS, keeping default"),
            }
        }
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".qyk"),
            // The desktop host stands in for the phone unless told otherwise.
            platform: Platform::Android,
            notifications_enabled: true,
            permission_granted: true,
            run_for: None,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    State,
    Schedule(ReminderTime),
    Cancel,
    Test,
    Permissions,
    Boot,
    Run,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some(name) = args.first() else {
            bail!("missing command");
        };
        let command = match name.as_str() {
            "state" => Command::State,
            "schedule" => {
                let time = args.get(1).context("schedule needs a HH:MM time")?;
                Command::Schedule(time.parse()?)
            }
            "cancel" => Command::Cancel,
            "test" => Command::Test,
            "permissions" => Command::Permissions,
            "boot" => Command::Boot,
            "run" => Command::Run,
            other => bail!("unknown command `{other}`"),
        };
        Ok(command)
    }
}

/// Everything a command needs, wired the way the phone wires it at process
/// start.
pub struct App {
    runtime: Arc<ReminderRuntime>,
    preferences: ReminderPreferences,
    events: mpsc::Receiver<PlatformEvent>,
    run_for: Option<Duration>,
    // Dropped last so the alarm thread outlives the runtime using it.
    _alarms: Arc<ThreadAlarms>,
}

impl App {
    pub fn start(config: &AppConfig) -> Result<Self> {
        let settings: Arc<dyn SettingsStore> = Arc::new(
            FileSettings::open(&config.data_dir)
                .with_context(|| format!("failed to open settings in {}", config.data_dir.display()))?,
        );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let (sender, events) = mpsc::channel();
        let alarms = Arc::new(ThreadAlarms::spawn(clock.clone(), sender));

        let runtime = Arc::new(
            ReminderRuntime::builder()
                .with_settings(settings.clone())
                .with_clock(clock)
                .with_alarms(alarms.clone())
                .with_notification_sink(Arc::new(ConsoleSink::new()))
                .build()
                .context("failed to initialise reminder runtime")?,
        );
        let permissions = Arc::new(StaticPermissions::new(
            true,
            config.permission_granted,
            config.notifications_enabled,
        ));
        let native_runtime = runtime.clone();
        let bridge = select_bridge(config.platform, move || {
            Ok(Arc::new(NativeQuotes::new(native_runtime, permissions)) as Arc<dyn DailyQuotes>)
        });
        info!(platform = ?bridge.platform(), data_dir = %config.data_dir.display(), "qyk host started");

        let preferences = ReminderPreferences::new(settings, bridge);
        preferences.sync_from_native();
        Ok(Self {
            runtime,
            preferences,
            events,
            run_for: config.run_for,
            _alarms: alarms,
        })
    }

    pub fn preferences(&self) -> &ReminderPreferences {
        &self.preferences
    }

    pub fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::State => {
                let state = self.preferences.state();
                let native = self.runtime.state();
                let report = json!({
                    "enabled": state.enabled,
                    "time": self.preferences.time_label(),
                    "native": native,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Command::Schedule(time) => {
                self.preferences.set_time(time);
                if !self.preferences.enabled() {
                    self.preferences.set_enabled(true);
                }
                println!("daily quote reminder set for {time}");
            }
            Command::Cancel => {
                self.preferences.set_enabled(false);
                println!("daily quote reminder disabled");
            }
            Command::Test => match self.preferences.send_test_notification() {
                Some(outcome) => println!("{outcome:?}"),
                None => println!("test notification could not be sent"),
            },
            Command::Permissions => self.preferences.request_permissions(),
            Command::Boot => {
                self.runtime.dispatch(PlatformEvent::BootCompleted)?;
            }
            Command::Run => self.run_event_loop()?,
        }
        Ok(())
    }

    /// Restores the schedule like a fresh boot, then handles alarm events
    /// until `run_for` elapses (or forever).
    fn run_event_loop(&self) -> Result<()> {
        self.runtime.dispatch(PlatformEvent::BootCompleted)?;
        let deadline = self.run_for.map(|limit| Instant::now() + limit);
        loop {
            let wait = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        debug!("run window elapsed");
                        return Ok(());
                    }
                    remaining
                }
                None => Duration::from_secs(3600),
            };
            match self.events.recv_timeout(wait) {
                Ok(event) => {
                    let outcome = self.runtime.dispatch(event)?;
                    debug!(?outcome, "event handled");
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => bail!("alarm thread stopped"),
            }
        }
    }
}

pub fn run(config: AppConfig, command: Command) -> Result<()> {
    let app = App::start(&config)?;
    app.execute(command)
}
