pub mod claim;
pub mod config;
pub mod perform;
pub mod review;
pub mod serve;
pub mod watch;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use claimdesk_client::{
    AutoConfirm, HttpReviewApi, ModeratorSession, Notifier, Prompt, SessionBuilder,
};
use claimdesk_core::{CoordinatorConfig, UserRef};

// ---------------------------------------------------------------------------
// Remote: how to reach the server and as whom
// ---------------------------------------------------------------------------

/// Connection settings shared by every command that talks to a server.
pub struct Remote {
    pub server: String,
    pub user_id: Option<u64>,
    pub username: Option<String>,
    pub config: Option<PathBuf>,
    pub assume_yes: bool,
    pub json: bool,
}

impl Remote {
    pub fn actor(&self) -> Result<UserRef> {
        let id = self
            .user_id
            .context("no moderator id: pass --user-id or set CLAIMDESK_USER_ID")?;
        let username = self
            .username
            .clone()
            .context("no moderator username: pass --username or set CLAIMDESK_USERNAME")?;
        Ok(UserRef::new(id, username))
    }

    pub fn api(&self) -> Result<HttpReviewApi> {
        Ok(HttpReviewApi::new(self.server.clone(), self.actor()?))
    }

    pub fn coordinator_config(&self) -> Result<CoordinatorConfig> {
        match &self.config {
            Some(path) => CoordinatorConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => Ok(CoordinatorConfig::default()),
        }
    }

    /// A session builder with this remote's config, console notices and
    /// confirmation prompt.
    pub fn session_builder(&self, api: &HttpReviewApi) -> Result<SessionBuilder> {
        let prompt: Arc<dyn Prompt> = if self.assume_yes {
            Arc::new(AutoConfirm)
        } else {
            Arc::new(StdinPrompt)
        };
        Ok(
            ModeratorSession::builder(Arc::new(api.clone()), api.actor().clone())
                .config(self.coordinator_config()?)
                .notifier(Arc::new(ConsoleNotifier { quiet: self.json }))
                .prompt(prompt),
        )
    }
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start tokio runtime")
}

// ---------------------------------------------------------------------------
// Terminal notices and prompts
// ---------------------------------------------------------------------------

struct ConsoleNotifier {
    quiet: bool,
}

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        if !self.quiet {
            println!("{message}");
        }
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// Asks on the terminal; anything but `y`/`yes` dismisses.
struct StdinPrompt;

#[async_trait]
impl Prompt for StdinPrompt {
    async fn confirm(&self, message: &str) -> bool {
        let message = message.to_string();
        tokio::task::spawn_blocking(move || {
            eprint!("{message} [y/N] ");
            let _ = std::io::stderr().flush();
            let mut answer = String::new();
            if std::io::stdin().lock().read_line(&mut answer).is_err() {
                return false;
            }
            matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}
