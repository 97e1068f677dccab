use std::time::Duration;
use thiserror::Error;

/// Failures raised by a browser-backed page.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Browser driver error: {0}")]
    Driver(String),

    #[error("Browser session lost: {0}")]
    SessionLost(String),
}

impl PageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PageError::NotFound(_))
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Everything that can end a single application attempt.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Question cannot be answered from the profile: {question}")]
    UnanswerableQuestion { question: String },

    #[error("Upload rejected: {0}")]
    UploadConstraint(String),

    #[error("Application submission confirmation is missing for job: {0}")]
    MissingConfirmation(String),

    #[error("No next or submit button found, discarding application {0}")]
    UnrecognizedForm(String),

    #[error("Form validation errors could not be cleared: {0}")]
    Validation(String),

    #[error("Failed to render document: {0}")]
    Render(String),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApplyError {
    /// Errors that make continuing with the next job pointless.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, ApplyError::Page(PageError::SessionLost(_)))
    }
}

/// Result of one application attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinguishable() {
        assert!(PageError::NotFound("#submit".into()).is_not_found());
        assert!(!PageError::Driver("session closed".into()).is_not_found());
    }

    #[test]
    fn test_only_session_loss_is_fatal_for_run() {
        assert!(ApplyError::from(PageError::SessionLost("closed".into())).is_fatal_for_run());
        assert!(!ApplyError::from(PageError::NotFound("#apply".into())).is_fatal_for_run());
        assert!(!ApplyError::MissingConfirmation("job".into()).is_fatal_for_run());
        assert!(!ApplyError::UnanswerableQuestion { question: "q".into() }.is_fatal_for_run());
    }
}
