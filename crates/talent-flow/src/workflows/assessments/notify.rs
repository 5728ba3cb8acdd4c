use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

impl NotificationLevel {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationLevel::Success => "success",
            NotificationLevel::Error => "error",
        }
    }
}

/// User-facing feedback raised by build and take sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn assessment_saved() -> Self {
        Self::success(
            "Assessment saved successfully!",
            "Your assessment has been saved.",
        )
    }

    pub fn assessment_save_failed(reason: impl Into<String>) -> Self {
        Self::error("Failed to save assessment.", reason)
    }

    pub fn assessment_submitted() -> Self {
        Self::success(
            "Assessment Submitted Successfully!",
            "Thank you for completing the assessment.",
        )
    }

    pub fn submission_failed(reason: impl Into<String>) -> Self {
        Self::error("Submission Failed", reason)
    }

    fn success(title: &str, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: title.to_string(),
            message: message.into(),
        }
    }

    fn error(title: &str, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// Outbound feedback channel (toast area, log, chat hook).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
}
