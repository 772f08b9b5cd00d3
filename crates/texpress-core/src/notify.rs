//! Compilation notifications
//!
//! The compiler reports each finished job to an injected
//! [`NotificationSink`]: one `Success` event per successful compilation,
//! one `Failure` event per failed pass. Delivery beyond that single call
//! is the sink's business.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Outcome carried by a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Failure,
}

/// What the caller was doing with the PDF
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Plain compilation
    #[default]
    Compile,
    /// Sent to the client as an attachment
    Download,
    /// Shown inline by the client
    Inline,
    /// Written to a destination path
    Save,
    /// Returned as raw or base64 content
    Content,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Compile => write!(f, "compile"),
            Action::Download => write!(f, "download"),
            Action::Inline => write!(f, "inline"),
            Action::Save => write!(f, "save"),
            Action::Content => write!(f, "content"),
        }
    }
}

/// A single compilation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// PDF file name on success, workspace name on failure
    pub identifier: String,
    pub action: Action,
    /// Opaque value supplied by the caller with the job
    pub metadata: serde_json::Value,
}

/// Receives compilation events
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Logs events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, n: &Notification) {
        match n.kind {
            NotificationKind::Success => info!(
                identifier = %n.identifier,
                action = %n.action,
                metadata = %n.metadata,
                "PDF generated"
            ),
            NotificationKind::Failure => error!(
                identifier = %n.identifier,
                action = %n.action,
                metadata = %n.metadata,
                "PDF generation failed"
            ),
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _notification: &Notification) {}
}
