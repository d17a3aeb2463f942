//! Session credentials and cache keys

use std::fmt;

/// Bearer token of the signed-in session.
///
/// The raw token never appears in `Debug` output or cache keys.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a bearer token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header only
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Cache key derived from the token
    pub fn key(&self) -> SessionKey {
        SessionKey(hash_token(&self.0))
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Cache key identifying a session without revealing its token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Key as a string, suitable for log fields
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash a token for use as a cache key.
///
/// Not cryptographic; it only keeps raw tokens out of keys and logs.
fn hash_token(token: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable_and_distinct() {
        let token = SessionToken::new("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.test");
        let key1 = token.key();
        let key2 = token.clone().key();

        assert_eq!(key1, key2);
        assert_eq!(key1.as_str().len(), 16);
        assert_ne!(key1, SessionToken::new("other-session").key());
    }

    #[test]
    fn test_token_redacted() {
        let token = SessionToken::new("super-secret-session");
        let debug = format!("{token:?}");

        assert!(!debug.contains("super-secret-session"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!token.key().to_string().contains("super-secret"));
    }
}
