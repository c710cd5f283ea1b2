use anyhow::Result;
use parking_lot::Mutex;

/// Notification permission and settings surface of the platform.
pub trait PermissionGate: Send + Sync {
    /// Whether notifications need a runtime grant (Android 13 and later).
    fn requires_runtime_permission(&self) -> bool;

    fn permission_granted(&self) -> bool;

    /// Shows the system prompt. The answer arrives later, if at all.
    fn request_permission(&self);

    /// Whether the user left notifications switched on for the app.
    fn notifications_enabled(&self) -> bool;

    fn open_notification_settings(&self) -> Result<()>;
}

#[derive(Debug, Default)]
struct PermissionSnapshot {
    granted: bool,
    notifications_enabled: bool,
    prompts: usize,
    settings_opened: usize,
}

/// Permission state fixed by configuration. Prompts and settings visits are
/// counted but never change the answer, like a user who ignores them.
#[derive(Debug)]
pub struct StaticPermissions {
    requires_runtime_permission: bool,
    state: Mutex<PermissionSnapshot>,
}

impl StaticPermissions {
    pub fn new(requires_runtime_permission: bool, granted: bool, notifications_enabled: bool) -> Self {
        Self {
            requires_runtime_permission,
            state: Mutex::new(PermissionSnapshot {
                granted,
                notifications_enabled,
                ..PermissionSnapshot::default()
            }),
        }
    }

    pub fn granted() -> Self {
        Self::new(true, true, true)
    }

    pub fn set_granted(&self, granted: bool) {
        self.state.lock().granted = granted;
    }

    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.state.lock().notifications_enabled = enabled;
    }

    pub fn prompts(&self) -> usize {
        self.state.lock().prompts
    }

    pub fn settings_opened(&self) -> usize {
        self.state.lock().settings_opened
    }
}

impl PermissionGate for StaticPermissions {
    fn requires_runtime_permission(&self) -> bool {
        self.requires_runtime_permission
    }

    fn permission_granted(&self) -> bool {
        !self.requires_runtime_permission || self.state.lock().granted
    }

    fn request_permission(&self) {
        self.state.lock().prompts += 1;
        tracing::info!("notification permission prompt shown");
    }

    fn notifications_enabled(&self) -> bool {
        self.state.lock().notifications_enabled
    }

    fn open_notification_settings(&self) -> Result<()> {
        self.state.lock().settings_opened += 1;
        tracing::info!("notification settings opened");
        Ok(())
    }
}
