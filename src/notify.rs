//! User-facing notification channel.
//!
//! Notices are fire-and-forget: a [`Notifier`] never fails and never blocks.
//! The UI layer decides how to present them (toast, status line, log).

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Visual style of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    /// Informational or success notice
    #[default]
    Default,
    /// Error-styled notice
    Destructive,
}

/// A single message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Short headline
    pub title: String,
    /// Detail line, e.g. the underlying error message
    pub description: String,
    /// Presentation style
    pub variant: NoticeVariant,
}

impl Notice {
    /// Success / informational notice.
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Default,
        }
    }

    /// Error notice.
    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }

    /// True for error notices.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        self.variant == NoticeVariant::Destructive
    }
}

/// Sink for notices.
pub trait Notifier: Send + Sync {
    /// Delivers a notice. Must not block.
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log. Used by the binary and whenever no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.variant {
            NoticeVariant::Default => info!("{}: {}", notice.title, notice.description),
            NoticeVariant::Destructive => error!("{}: {}", notice.title, notice.description),
        }
    }
}

/// Forwards notices to a channel so a UI task can render them.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    /// Creates the notifier and the receiving end for the UI.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        if let Err(e) = self.sender.send(notice) {
            warn!("Notice dropped, receiver is gone: {}", e.0.title);
        }
    }
}
