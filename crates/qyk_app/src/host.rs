use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use qyk_core::alarm::{AlarmId, AlarmService};
use qyk_core::clock::Clock;
use qyk_core::notifications::{
    NotificationChannel, NotificationId, NotificationRequest, NotificationSink, RecordingSink,
};
use qyk_core::{PlatformEvent, QykError};

#[derive(Default)]
struct TimerState {
    pending: BTreeMap<AlarmId, DateTime<Utc>>,
    shutdown: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

/// Wake alarms for the desktop host: one thread sleeps until the earliest
/// pending deadline and reports it as `PlatformEvent::AlarmFired`. Like the
/// real thing, nothing registered here outlives the process.
pub struct ThreadAlarms {
    shared: Arc<TimerShared>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadAlarms {
    pub fn spawn(clock: Arc<dyn Clock>, events: Sender<PlatformEvent>) -> Self {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState::default()),
            wake: Condvar::new(),
        });
        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("qyk-alarms".into())
            .spawn(move || timer_loop(&worker_shared, clock.as_ref(), &events))
            .map_err(|err| tracing::error!(%err, "unable to start alarm thread"))
            .ok();
        Self { shared, worker }
    }

    pub fn pending(&self, id: AlarmId) -> Option<DateTime<Utc>> {
        self.shared.state.lock().pending.get(&id).copied()
    }
}

fn timer_loop(shared: &TimerShared, clock: &dyn Clock, events: &Sender<PlatformEvent>) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }
        let earliest = state
            .pending
            .iter()
            .min_by_key(|(_, due)| **due)
            .map(|(&id, &due)| (id, due));
        let Some((id, due)) = earliest else {
            shared.wake.wait(&mut state);
            continue;
        };
        let now = clock.now();
        if due > now {
            let wait = (due - now).to_std().unwrap_or_default();
            shared.wake.wait_for(&mut state, wait);
            continue;
        }
        state.pending.remove(&id);
        drop(state);
        tracing::debug!(id, %due, "alarm due");
        if events.send(PlatformEvent::AlarmFired(id)).is_err() {
            tracing::debug!("event receiver gone, stopping alarm thread");
            return;
        }
        state = shared.state.lock();
    }
}

impl AlarmService for ThreadAlarms {
    fn set_exact_and_allow_while_idle(
        &self,
        id: AlarmId,
        trigger_at: DateTime<Utc>,
    ) -> Result<(), QykError> {
        if self.worker.is_none() {
            return Err(QykError::Alarm {
                id,
                reason: "alarm thread is not running".into(),
            });
        }
        self.shared.state.lock().pending.insert(id, trigger_at);
        self.shared.wake.notify_all();
        Ok(())
    }

    fn cancel(&self, id: AlarmId) -> Result<(), QykError> {
        self.shared.state.lock().pending.remove(&id);
        self.shared.wake.notify_all();
        Ok(())
    }
}

impl Drop for ThreadAlarms {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Notification surface of the desktop host: notifications are printed to
/// the terminal and kept for inspection.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    inner: RecordingSink,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> &RecordingSink {
        &self.inner
    }
}

impl NotificationSink for ConsoleSink {
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), QykError> {
        self.inner.create_channel(channel)
    }

    fn notify(&self, id: NotificationId, request: NotificationRequest) -> Result<(), QykError> {
        println!("[{}] {}", request.title, request.body);
        tracing::info!(id, channel = %request.channel_id, "notification shown");
        self.inner.notify(id, request)
    }
}
