//! Unified error type for scribeflow.
//!
//! Every failure that can reach a stage boundary is expressed as an [`Error`].
//! The retry loop only needs one question answered about an error, which is
//! [`Error::is_retryable`].

/// Unified error type covering all failure modes in scribeflow.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The credential pool is empty; nothing can be leased.
    #[error("No credentials available")]
    NoCredentialsAvailable,

    /// The remote service refused the credential (auth failure or quota).
    #[error("Credential rejected [{hint}]: {message}")]
    CredentialRejected {
        /// Redacted hint of the rejected credential.
        hint: String,
        /// Human-readable error description.
        message: String,
    },

    /// A remote call failed in a way that may succeed on another attempt.
    #[error("Transient remote failure: {0}")]
    TransientRemote(String),

    /// A stage used up all of its attempts.
    #[error("Stage [{stage}] failed after {attempts} attempts: {last_error}")]
    MaxAttemptsExceeded {
        /// Name of the stage that gave up.
        stage: String,
        /// Number of remote calls made.
        attempts: u32,
        /// The error from the final attempt.
        last_error: Box<Error>,
    },

    /// Writing durable state (cursor, outcome log) failed.
    #[error("Persistence error [{what}]: {message}")]
    Persistence {
        /// What was being persisted.
        what: String,
        /// Human-readable error description.
        message: String,
    },

    /// An external tool (ffmpeg) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Input or configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a retry loop may try again after this error.
    ///
    /// Only an empty credential pool is terminal: a rejected key is retried
    /// with the next key in the rotation.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::NoCredentialsAvailable)
    }

    /// Convenience constructor for [`Error::CredentialRejected`].
    pub fn rejected(hint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::CredentialRejected {
            hint: hint.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::TransientRemote`].
    pub fn transient(message: impl Into<String>) -> Self {
        Error::TransientRemote(message.into())
    }

    /// Convenience constructor for [`Error::Persistence`].
    pub fn persistence(what: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Persistence {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::MaxAttemptsExceeded`].
    pub fn max_attempts(stage: impl Into<String>, attempts: u32, last_error: Error) -> Self {
        Error::MaxAttemptsExceeded {
            stage: stage.into(),
            attempts,
            last_error: Box::new(last_error),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
