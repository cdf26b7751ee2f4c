//! Round-robin lease coordinator.
//!
//! Every remote call attempt leases exactly one key. The shared cursor is the
//! only mutable state: it is read, advanced and written under one lock, and
//! the lock is never held across I/O or an `.await`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use scribeflow_common::{Credential, Error, Result};

use crate::registry::CredentialRegistry;

/// A single grant of one key to one call attempt.
///
/// A lease is consumed when it is granted, whether or not the call that
/// uses it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Rotation index of the key.
    pub index: usize,
    /// The leased key.
    pub credential: Credential,
}

/// Read-only view of the coordinator for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseSnapshot {
    /// Index of the last leased key, `None` if nothing was leased yet.
    pub index: Option<usize>,
    /// Redacted hint of the last leased key.
    pub hint: Option<String>,
    /// Pool size.
    pub total: usize,
}

impl fmt::Display for LeaseSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.index, &self.hint) {
            (Some(index), Some(hint)) => {
                write!(f, "key {hint} (index {index} of {})", self.total)
            }
            _ => write!(f, "N/A (pool of {})", self.total),
        }
    }
}

/// Hands out keys in strict cyclic order to concurrent callers.
#[derive(Debug)]
pub struct LeaseCoordinator {
    registry: CredentialRegistry,
    last_index: Mutex<Option<usize>>,
    granted: AtomicU64,
}

impl LeaseCoordinator {
    /// Create a coordinator that continues after `cursor`.
    ///
    /// A cursor outside the pool is treated as unset.
    pub fn new(registry: CredentialRegistry, cursor: Option<usize>) -> Self {
        let cursor = cursor.filter(|&i| i < registry.len());
        Self {
            registry,
            last_index: Mutex::new(cursor),
            granted: AtomicU64::new(0),
        }
    }

    /// Lease the next key.
    ///
    /// `label` names the caller in the log line for this lease.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCredentialsAvailable`] if the pool is empty.
    pub fn acquire(&self, label: &str) -> Result<Lease> {
        let total = self.registry.len();
        if total == 0 {
            tracing::error!(caller = label, "No API keys available");
            return Err(Error::NoCredentialsAvailable);
        }

        let index = {
            let mut last = self.last_index.lock();
            let next = match *last {
                Some(i) => (i + 1) % total,
                None => 0,
            };
            *last = Some(next);
            next
        };
        self.granted.fetch_add(1, Ordering::Relaxed);

        let credential = self
            .registry
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("rotation index {index} out of range")))?;

        tracing::debug!(
            index,
            key = %credential,
            caller = label,
            "Leased API key"
        );

        Ok(Lease { index, credential })
    }

    /// The last leased index, for persisting with a
    /// [`RotationCursor`](crate::RotationCursor).
    pub fn cursor(&self) -> Option<usize> {
        *self.last_index.lock()
    }

    /// Diagnostics snapshot of the last lease.
    pub fn last_used(&self) -> LeaseSnapshot {
        let index = self.cursor();
        LeaseSnapshot {
            index,
            hint: index.and_then(|i| self.registry.get(i)).map(Credential::hint),
            total: self.registry.len(),
        }
    }

    /// Number of leases granted by this coordinator.
    pub fn leases_granted(&self) -> u64 {
        self.granted.load(Ordering::Relaxed)
    }

    /// Number of keys in the pool.
    pub fn pool_size(&self) -> usize {
        self.registry.len()
    }

    /// The underlying registry.
    pub fn registry(&self) -> &CredentialRegistry {
        &self.registry
    }
}
