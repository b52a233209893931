//! Keep-alive presentation capability.
//!
//! Platforms keep a background connection alive by presenting something to
//! the user (a foreground-service notification, a tray entry). The session
//! manager calls into a presenter but never implements one itself.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use fgws_core::config::Presentation;
use fgws_core::error::FwsResult;

/// Maximum characters of a message shown in a wake notification.
const WAKE_PREVIEW_CHARS: usize = 120;

/// Platform hook that keeps the host process reachable while a session runs.
pub trait KeepAlivePresenter: Send + Sync {
    /// Called by `start` before connecting. An error aborts the start.
    fn acquire(&self, presentation: &Presentation) -> FwsResult<()>;

    /// Called by `stop` and when a session is replaced.
    fn release(&self);

    /// Called for every text message received.
    fn wake(&self, _message: &str) {}
}

/// Presenter that does nothing. Used when the host needs no keep-alive.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPresenter;

impl KeepAlivePresenter for NoopPresenter {
    fn acquire(&self, _presentation: &Presentation) -> FwsResult<()> {
        Ok(())
    }

    fn release(&self) {}
}

/// Desktop notifications via the OS notification service.
///
/// Shows the session's title/description while it runs. With
/// `wake_on_message` every incoming message raises a notification too.
/// Failing to show a notification never prevents a session from starting.
pub struct DesktopNotifier {
    wake_on_message: bool,
    active: Mutex<Option<Presentation>>,
}

impl DesktopNotifier {
    pub fn new(wake_on_message: bool) -> Self {
        Self {
            wake_on_message,
            active: Mutex::new(None),
        }
    }

    /// Whether a session is currently being presented.
    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn show(&self, summary: &str, body: &str) -> FwsResult<()> {
        #[cfg(not(test))]
        {
            notify_rust::Notification::new()
                .summary(summary)
                .body(body)
                .appname(fgws_core::constants::APP_NAME)
                .show()
                .map_err(|e| fgws_core::error::FwsError::Notification(e.to_string()))?;
        }

        let _ = (summary, body);
        Ok(())
    }
}

impl KeepAlivePresenter for DesktopNotifier {
    fn acquire(&self, presentation: &Presentation) -> FwsResult<()> {
        if let Err(e) = self.show(&presentation.title, &presentation.description) {
            warn!("keep-alive notification not shown: {e}");
        }
        info!("presenting \"{}\"", presentation.title);
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(presentation.clone());
        Ok(())
    }

    fn release(&self) {
        if self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            debug!("keep-alive presentation released");
        }
    }

    fn wake(&self, message: &str) {
        if !self.wake_on_message {
            return;
        }
        let Some(title) = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|p| p.title.clone())
        else {
            return;
        };

        let preview: String = message.chars().take(WAKE_PREVIEW_CHARS).collect();
        if let Err(e) = self.show(&title, &preview) {
            warn!("wake notification not shown: {e}");
        }
    }
}
