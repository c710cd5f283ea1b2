use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QykError {
    #[error("reminder time {hour}:{minute} is out of range")]
    InvalidTime { hour: u32, minute: u32 },

    #[error("cannot read `{0}` as a HH:MM reminder time")]
    UnparsableTime(String),

    #[error("settings file `{path}` could not be written")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings could not be encoded")]
    Encoding(#[from] serde_json::Error),

    #[error("alarm {id} could not be registered: {reason}")]
    Alarm { id: i32, reason: String },

    #[error("notification could not be posted: {0}")]
    Notification(String),

    #[error("quote content unavailable: {0}")]
    Content(String),

    #[error("reminder runtime is missing its {0}")]
    MissingCapability(&'static str),
}
