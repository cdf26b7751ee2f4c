//! The [`RemoteStage`] trait defines one unit of remote work.

use scribeflow_common::{Credential, Result};

/// A single blocking call to the inference service.
///
/// Implementations perform exactly one remote call per invocation and leave
/// retries to [`StageRunner`](crate::StageRunner). They are always invoked on
/// a blocking worker thread, so they may use blocking I/O freely.
pub trait RemoteStage<I>: Send + Sync {
    /// A short, human-readable name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Perform the call with the leased `credential`.
    ///
    /// Return [`Error::CredentialRejected`](scribeflow_common::Error::CredentialRejected)
    /// when the service refuses the key, and
    /// [`Error::TransientRemote`](scribeflow_common::Error::TransientRemote)
    /// for anything else worth retrying.
    fn call(&self, credential: &Credential, input: &I) -> Result<String>;
}
