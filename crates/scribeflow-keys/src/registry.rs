//! Credential discovery.
//!
//! Keys are read from a base variable and then numbered variants:
//! `GOOGLE_API_KEY`, `GOOGLE_API_KEY_1`, `GOOGLE_API_KEY_2`, ... The scan
//! stops at the first missing number, so a gap hides every key after it.

use std::collections::HashSet;

use scribeflow_common::Credential;

/// Environment variable prefix used when none is configured.
pub const DEFAULT_ENV_PREFIX: &str = "GOOGLE_API_KEY";

/// The immutable, deduplicated set of keys available to this process.
///
/// Order is discovery order (base key first, then ascending numbers) and is
/// the rotation order.
#[derive(Debug, Clone, Default)]
pub struct CredentialRegistry {
    credentials: Vec<Credential>,
}

impl CredentialRegistry {
    /// Discover keys using `lookup` to resolve variable names.
    ///
    /// Values are trimmed; empty values count as missing. An empty registry is
    /// returned (not an error) when nothing is configured.
    pub fn load<F>(prefix: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut found = Vec::new();
        if let Some(base) = read(prefix) {
            found.push(base);
        }

        let mut n = 1usize;
        while let Some(value) = read(&format!("{prefix}_{n}")) {
            found.push(value);
            n += 1;
        }

        let registry = Self::from_values(found);
        if registry.is_empty() {
            tracing::warn!("No API keys configured under {prefix}");
        } else {
            tracing::info!("Loaded {} API key(s) from {prefix}*", registry.len());
        }
        registry
    }

    /// Discover keys from the process environment.
    pub fn from_env(prefix: &str) -> Self {
        Self::load(prefix, |name| std::env::var(name).ok())
    }

    /// Build a registry from explicit values, dropping later duplicates.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let credentials = values
            .into_iter()
            .map(Credential::new)
            .filter(|c| seen.insert(c.clone()))
            .collect();
        Self { credentials }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether no key is configured.
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Key at a rotation index.
    pub fn get(&self, index: usize) -> Option<&Credential> {
        self.credentials.get(index)
    }

    /// Keys in rotation order.
    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }
}
