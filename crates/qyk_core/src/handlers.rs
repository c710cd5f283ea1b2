use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::alarm::AlarmScheduler;
use crate::error::QykError;
use crate::notifications::{NotificationPoster, DAILY_QUOTE_TITLE};
use crate::quotes::{QuoteSource, FALLBACK_QUOTE};

/// What happened when a quote was fetched and shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub body: String,
    pub used_fallback: bool,
    pub posted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireOutcome {
    pub delivery: Delivery,
    pub next_trigger: Option<DateTime<Utc>>,
}

/// Fetches a quote and posts it. Neither step can fail the caller: a
/// missing quote becomes the fallback body and a failed post is logged.
pub fn deliver_quote(quotes: &dyn QuoteSource, poster: &NotificationPoster) -> Delivery {
    let (body, used_fallback) = match quotes.next_quote() {
        Ok(quote) if !quote.trim().is_empty() => (quote, false),
        Ok(_) => {
            tracing::warn!("quote source returned an empty quote");
            (FALLBACK_QUOTE.to_string(), true)
        }
        Err(err) => {
            tracing::warn!(%err, "quote fetch failed, posting fallback");
            (FALLBACK_QUOTE.to_string(), true)
        }
    };
    let posted = match poster.show_notification(DAILY_QUOTE_TITLE, &body) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(%err, "unable to post quote notification");
            false
        }
    };
    Delivery {
        body,
        used_fallback,
        posted,
    }
}

/// Runs when the daily alarm goes off.
pub struct FireHandler {
    quotes: Arc<dyn QuoteSource>,
    poster: Arc<NotificationPoster>,
    scheduler: Arc<AlarmScheduler>,
}

impl FireHandler {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        poster: Arc<NotificationPoster>,
        scheduler: Arc<AlarmScheduler>,
    ) -> Self {
        Self {
            quotes,
            poster,
            scheduler,
        }
    }

    /// Posts today's quote, then arms tomorrow's alarm. The rearm happens
    /// whatever became of the post.
    #[instrument(skip(self))]
    pub fn on_alarm(&self) -> Result<FireOutcome, QykError> {
        let delivery = deliver_quote(self.quotes.as_ref(), &self.poster);
        let next_trigger = self.scheduler.schedule_next()?;
        Ok(FireOutcome {
            delivery,
            next_trigger,
        })
    }
}

/// Runs once the device finished booting or the app was updated, both of
/// which drop registered alarms.
pub struct BootHandler {
    scheduler: Arc<AlarmScheduler>,
}

impl BootHandler {
    pub fn new(scheduler: Arc<AlarmScheduler>) -> Self {
        Self { scheduler }
    }

    #[instrument(skip(self))]
    pub fn on_boot(&self) -> Result<Option<DateTime<Utc>>, QykError> {
        self.scheduler.ensure_scheduled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{InMemoryAlarms, DAILY_QUOTE_ALARM_ID};
    use crate::clock::{Clock, FixedClock};
    use crate::notifications::{
        NotificationChannel, NotificationId, NotificationRequest, NotificationSink, RecordingSink,
    };
    use crate::schedule::ReminderTime;
    use crate::settings::MemorySettings;
    use chrono::{Duration, FixedOffset, NaiveDate};

    struct FailingQuotes;

    impl QuoteSource for FailingQuotes {
        fn next_quote(&self) -> Result<String, QykError> {
            Err(QykError::Content("offline".into()))
        }
    }

    struct BrokenSink;

    impl NotificationSink for BrokenSink {
        fn create_channel(&self, _channel: &NotificationChannel) -> Result<(), QykError> {
            Err(QykError::Notification("notification service gone".into()))
        }

        fn notify(&self, _id: NotificationId, _request: NotificationRequest) -> Result<(), QykError> {
            Err(QykError::Notification("notification service gone".into()))
        }
    }

    fn clock() -> Arc<FixedClock> {
        let local = NaiveDate::from_ymd_opt(2025, 1, 20)
            .unwrap()
            .and_hms_opt(7, 30, 0)
            .unwrap();
        Arc::new(FixedClock::at_local(FixedOffset::east_opt(0).unwrap(), local))
    }

    fn armed_scheduler(clock: Arc<FixedClock>, alarms: Arc<InMemoryAlarms>) -> Arc<AlarmScheduler> {
        let scheduler = Arc::new(AlarmScheduler::new(
            Arc::new(MemorySettings::new()),
            clock,
            alarms,
        ));
        scheduler.schedule(ReminderTime::new(9, 0).unwrap()).unwrap();
        scheduler
    }

    #[test]
    fn failed_quote_fetch_still_posts_and_rearms() {
        let clock = clock();
        let alarms = Arc::new(InMemoryAlarms::new());
        let scheduler = armed_scheduler(clock.clone(), alarms.clone());
        let sink = Arc::new(RecordingSink::new());
        let poster = Arc::new(NotificationPoster::new(sink.clone(), clock.clone()));
        let handler = FireHandler::new(Arc::new(FailingQuotes), poster, scheduler);

        clock.advance(Duration::minutes(90));
        let outcome = handler.on_alarm().unwrap();

        assert!(outcome.delivery.used_fallback);
        assert!(outcome.delivery.posted);
        assert_eq!(sink.visible()[0].body, FALLBACK_QUOTE);
        assert_eq!(
            alarms.pending(DAILY_QUOTE_ALARM_ID),
            Some(clock.now() + Duration::hours(24))
        );
    }

    #[test]
    fn failed_post_still_rearms() {
        let clock = clock();
        let alarms = Arc::new(InMemoryAlarms::new());
        let scheduler = armed_scheduler(clock.clone(), alarms.clone());
        let poster = Arc::new(NotificationPoster::new(Arc::new(BrokenSink), clock.clone()));
        let handler = FireHandler::new(Arc::new(FailingQuotes), poster, scheduler);

        let outcome = handler.on_alarm().unwrap();
        assert!(!outcome.delivery.posted);
        assert!(outcome.next_trigger.is_some());
    }

    #[test]
    fn boot_does_nothing_when_disabled() {
        let clock = clock();
        let alarms = Arc::new(InMemoryAlarms::new());
        let scheduler = armed_scheduler(clock, alarms.clone());
        scheduler.cancel().unwrap();

        let boot = BootHandler::new(scheduler);
        assert_eq!(boot.on_boot().unwrap(), None);
        assert_eq!(alarms.pending_count(), 0);
    }
}
