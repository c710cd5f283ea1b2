pub mod alarm;
pub mod clock;
pub mod error;
pub mod handlers;
pub mod notifications;
pub mod quotes;
pub mod runtime;
pub mod schedule;
pub mod settings;

pub use crate::error::QykError;
pub use crate::runtime::{PlatformEvent, ReminderRuntime, ReminderRuntimeBuilder};
pub use crate::schedule::{ReminderTime, ScheduleState};
