use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::alarm::{AlarmId, AlarmScheduler, AlarmService, DAILY_QUOTE_ALARM_ID};
use crate::clock::{Clock, SystemClock};
use crate::error::QykError;
use crate::handlers::{deliver_quote, BootHandler, Delivery, FireHandler, FireOutcome};
use crate::notifications::{NotificationPoster, NotificationSink};
use crate::quotes::{QuoteRepository, QuoteSource};
use crate::schedule::{ReminderTime, ScheduleState};
use crate::settings::SettingsStore;

/// Callbacks the platform delivers to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    AlarmFired(AlarmId),
    BootCompleted,
    PackageReplaced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Fired(FireOutcome),
    Restored(Option<DateTime<Utc>>),
    Ignored,
}

/// The reminder subsystem with its handlers registered, ready to receive
/// platform events and calls from the bridge.
pub struct ReminderRuntime {
    scheduler: Arc<AlarmScheduler>,
    poster: Arc<NotificationPoster>,
    quotes: Arc<dyn QuoteSource>,
    fire: FireHandler,
    boot: BootHandler,
}

pub struct ReminderRuntimeBuilder {
    settings: Option<Arc<dyn SettingsStore>>,
    clock: Option<Arc<dyn Clock>>,
    alarms: Option<Arc<dyn AlarmService>>,
    notification_sink: Option<Arc<dyn NotificationSink>>,
    quotes: Option<Arc<dyn QuoteSource>>,
}

impl ReminderRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            settings: None,
            clock: None,
            alarms: None,
            notification_sink: None,
            quotes: None,
        }
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_alarms(mut self, alarms: Arc<dyn AlarmService>) -> Self {
        self.alarms = Some(alarms);
        self
    }

    pub fn with_notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    pub fn with_quote_source(mut self, quotes: Arc<dyn QuoteSource>) -> Self {
        self.quotes = Some(quotes);
        self
    }

    /// Settings, alarms and the notification sink are required; the clock
    /// defaults to the system clock and quotes to the built-in rotation.
    pub fn build(self) -> Result<ReminderRuntime, QykError> {
        let settings = self.settings.ok_or(QykError::MissingCapability("settings store"))?;
        let alarms = self.alarms.ok_or(QykError::MissingCapability("alarm service"))?;
        let sink = self
            .notification_sink
            .ok_or(QykError::MissingCapability("notification sink"))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let quotes = self.quotes.unwrap_or_else(|| {
            Arc::new(QuoteRepository::new(settings.clone())) as Arc<dyn QuoteSource>
        });

        let scheduler = Arc::new(AlarmScheduler::new(settings, clock.clone(), alarms));
        let poster = Arc::new(NotificationPoster::new(sink, clock));
        Ok(ReminderRuntime {
            fire: FireHandler::new(quotes.clone(), poster.clone(), scheduler.clone()),
            boot: BootHandler::new(scheduler.clone()),
            scheduler,
            poster,
            quotes,
        })
    }
}

impl Default for ReminderRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReminderRuntime {
    pub fn builder() -> ReminderRuntimeBuilder {
        ReminderRuntimeBuilder::new()
    }

    pub fn poster(&self) -> &NotificationPoster {
        &self.poster
    }

    pub fn schedule(&self, time: ReminderTime) -> Result<DateTime<Utc>, QykError> {
        self.scheduler.schedule(time)
    }

    pub fn cancel(&self) -> Result<(), QykError> {
        self.scheduler.cancel()
    }

    pub fn state(&self) -> ScheduleState {
        self.scheduler.state()
    }

    /// Posts one quote right away through the same path the alarm uses,
    /// without touching the schedule.
    pub fn post_quote_now(&self) -> Delivery {
        deliver_quote(self.quotes.as_ref(), &self.poster)
    }

    pub fn dispatch(&self, event: PlatformEvent) -> Result<DispatchOutcome, QykError> {
        tracing::debug!(?event, "platform event received");
        match event {
            PlatformEvent::AlarmFired(DAILY_QUOTE_ALARM_ID) => {
                self.fire.on_alarm().map(DispatchOutcome::Fired)
            }
            PlatformEvent::AlarmFired(id) => {
                tracing::debug!(id, "ignoring unknown alarm");
                Ok(DispatchOutcome::Ignored)
            }
            PlatformEvent::BootCompleted | PlatformEvent::PackageReplaced => {
                self.boot.on_boot().map(DispatchOutcome::Restored)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::InMemoryAlarms;
    use crate::notifications::RecordingSink;
    use crate::settings::MemorySettings;

    #[test]
    fn build_requires_capabilities() {
        let missing = ReminderRuntime::builder()
            .with_settings(Arc::new(MemorySettings::new()))
            .build();
        assert!(matches!(
            missing,
            Err(QykError::MissingCapability("alarm service"))
        ));
    }

    #[test]
    fn unknown_alarm_ids_are_ignored() {
        let sink = Arc::new(RecordingSink::new());
        let runtime = ReminderRuntime::builder()
            .with_settings(Arc::new(MemorySettings::new()))
            .with_alarms(Arc::new(InMemoryAlarms::new()))
            .with_notification_sink(sink.clone())
            .build()
            .unwrap();
        let outcome = runtime.dispatch(PlatformEvent::AlarmFired(7)).unwrap();
        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert_eq!(sink.post_count(), 0);
    }
}
