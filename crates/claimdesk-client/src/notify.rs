use async_trait::async_trait;
use tracing::{error, info};

/// Where user-facing notices go: success toasts and error popups.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Asks the moderator to confirm a destructive action.
#[async_trait]
pub trait Prompt: Send + Sync {
    /// `true` when confirmed, `false` when dismissed.
    async fn confirm(&self, message: &str) -> bool;
}

/// Notifier that writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }
}

/// Prompt that confirms everything. For non-interactive sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

#[async_trait]
impl Prompt for AutoConfirm {
    async fn confirm(&self, _message: &str) -> bool {
        true
    }
}
