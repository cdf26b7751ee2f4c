//! API credential newtype.

use std::fmt;

/// Number of trailing characters of a secret that may be shown.
const HINT_CHARS: usize = 4;

/// An opaque API key.
///
/// Equality and hashing use the secret value. `Debug` and `Display` only ever
/// show the redacted [`hint`](Credential::hint), so a credential can be passed
/// to `tracing` fields without leaking it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret. Only the remote call should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Redacted form: an ellipsis followed by the last four characters.
    pub fn hint(&self) -> String {
        redact(&self.0)
    }
}

/// Redact a secret down to its last four characters.
pub fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    let tail: String = secret.chars().skip(count.saturating_sub(HINT_CHARS)).collect();
    format!("…{tail}")
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.hint()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_shows_last_four() {
        let key = Credential::new("AIzaSyExampleKey1234");
        assert_eq!(key.hint(), "…1234");
        assert_eq!(key.to_string(), "…1234");
    }

    #[test]
    fn debug_does_not_leak() {
        let key = Credential::new("super-secret-wxyz");
        let debug = format!("{key:?}");
        assert!(!debug.contains("super-secret"), "leaked: {debug}");
        assert!(debug.contains("wxyz"));
    }

    #[test]
    fn short_and_multibyte_secrets() {
        assert_eq!(redact("ab"), "…ab");
        assert_eq!(redact(""), "…");
        assert_eq!(redact("鍵鍵鍵鍵鍵"), "…鍵鍵鍵鍵");
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(Credential::new("k1"), Credential::new("k1"));
        assert_ne!(Credential::new("k1"), Credential::new("k2"));
        assert_eq!(Credential::new("k1").expose(), "k1");
    }
}
