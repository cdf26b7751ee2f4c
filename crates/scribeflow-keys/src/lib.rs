//! # scribeflow-keys
//!
//! Round-robin distribution of a pool of interchangeable API keys.
//!
//! - **[`CredentialRegistry`]** -- discovers and deduplicates keys from the
//!   environment once at startup.
//! - **[`RotationCursor`]** -- the last leased index, persisted between runs
//!   so successive invocations continue the rotation.
//! - **[`LeaseCoordinator`]** -- hands out one key per call in strict cyclic
//!   order, safe to call from any number of concurrent tasks.

pub mod coordinator;
pub mod cursor;
pub mod registry;

pub use coordinator::{Lease, LeaseCoordinator, LeaseSnapshot};
pub use cursor::{RotationCursor, DEFAULT_CURSOR_FILE};
pub use registry::{CredentialRegistry, DEFAULT_ENV_PREFIX};
