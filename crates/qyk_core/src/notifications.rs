use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::QykError;

pub type NotificationId = i32;

/// Posting under a fixed id replaces yesterday's reminder instead of stacking.
pub const DAILY_QUOTE_NOTIFICATION_ID: NotificationId = 1001;

pub const DAILY_QUOTE_TITLE: &str = "Qyk Quote";

/// Channels are created at the platform's default importance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl NotificationChannel {
    pub fn daily_quotes() -> Self {
        Self {
            id: "qyk_quotes_channel".to_string(),
            name: "Qyk Quotes".to_string(),
            description: "Daily Qyk Quotes reminders".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub channel_id: String,
    pub title: String,
    pub body: String,
    /// Expandable body so long quotes are not truncated.
    pub big_text: bool,
    pub auto_cancel: bool,
    pub posted_at: DateTime<Utc>,
}

/// Notification surface of the platform the reminder is posted on.
pub trait NotificationSink: Send + Sync {
    /// Creating a channel that already exists must leave it unchanged.
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), QykError>;

    /// Posts `request`, replacing any visible notification with the same id.
    fn notify(&self, id: NotificationId, request: NotificationRequest) -> Result<(), QykError>;
}

pub struct NotificationPoster {
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    channel: NotificationChannel,
}

impl NotificationPoster {
    pub fn new(sink: Arc<dyn NotificationSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sink,
            clock,
            channel: NotificationChannel::daily_quotes(),
        }
    }

    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    pub fn ensure_channel(&self) -> Result<(), QykError> {
        self.sink.create_channel(&self.channel)
    }

    pub fn show_notification(&self, title: &str, body: &str) -> Result<(), QykError> {
        self.ensure_channel()?;
        let request = NotificationRequest {
            channel_id: self.channel.id.clone(),
            title: title.to_string(),
            body: body.to_string(),
            big_text: true,
            auto_cancel: true,
            posted_at: self.clock.now(),
        };
        self.sink.notify(DAILY_QUOTE_NOTIFICATION_ID, request)?;
        tracing::debug!(title, "notification posted");
        Ok(())
    }
}

/// Sink that keeps channels and notifications in memory, used by tests and
/// headless hosts.
#[derive(Debug, Default)]
pub struct RecordingSink {
    channels: Mutex<BTreeMap<String, NotificationChannel>>,
    visible: Mutex<BTreeMap<NotificationId, NotificationRequest>>,
    posted: Mutex<Vec<(NotificationId, NotificationRequest)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channels(&self) -> Vec<NotificationChannel> {
        self.channels.lock().values().cloned().collect()
    }

    pub fn visible(&self) -> Vec<NotificationRequest> {
        self.visible.lock().values().cloned().collect()
    }

    pub fn posted(&self) -> Vec<(NotificationId, NotificationRequest)> {
        self.posted.lock().clone()
    }

    pub fn post_count(&self) -> usize {
        self.posted.lock().len()
    }
}

impl NotificationSink for RecordingSink {
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), QykError> {
        self.channels
            .lock()
            .entry(channel.id.clone())
            .or_insert_with(|| channel.clone());
        Ok(())
    }

    fn notify(&self, id: NotificationId, request: NotificationRequest) -> Result<(), QykError> {
        if !self.channels.lock().contains_key(&request.channel_id) {
            return Err(QykError::Notification(format!(
                "channel `{}` does not exist",
                request.channel_id
            )));
        }
        self.visible.lock().insert(id, request.clone());
        self.posted.lock().push((id, request));
        Ok(())
    }
}
