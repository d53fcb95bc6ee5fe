//! NewType wrappers for strong typing throughout the authentication core.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing an authority label where a username is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Unique username that identifies an account.
    ///
    /// This is the `sub` claim embedded in issued tokens and the key used
    /// for identity lookups. It is immutable while a token referencing it
    /// is inside its validity window.
    Subject
);

newtype_string!(
    /// Role label granting elevated permissions (e.g., "admin").
    ///
    /// Authorities are carried on the identity record, copied into the
    /// per-request security context on successful authentication, and
    /// checked by authorization guards.
    Authority
);

/// A bcrypt password hash as stored on the credential record.
///
/// The wrapper exists so a hash is never confused with a plaintext
/// password, and so `Debug` output can never leak it into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap an already-computed hash.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordHash(<redacted>)")
    }
}

/// Numeric identifier for a stored user record.
///
/// Exposed to sibling services through the public lookup endpoints; the
/// username remains the authentication-time key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Create a new instance.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the inner numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for UserId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_creation() {
        let subject = Subject::new("alice");
        assert_eq!(subject.as_str(), "alice");
        assert_eq!(subject.to_string(), "alice");
    }

    #[test]
    fn test_subject_from_string() {
        let subject: Subject = "alice".into();
        assert_eq!(subject.as_str(), "alice");

        let subject: Subject = String::from("bob").into();
        assert_eq!(subject.as_str(), "bob");
    }

    #[test]
    fn test_subject_serde() {
        let subject = Subject::new("alice");
        let json = serde_json::to_string(&subject).unwrap();
        assert_eq!(json, "\"alice\"");

        let parsed: Subject = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, subject);
    }

    #[test]
    fn test_authority_hash_set_lookup() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(Authority::new("admin"));
        set.insert(Authority::new("auditor"));

        // Borrow<str> lets the set be probed with a plain &str.
        assert!(set.contains("admin"));
        assert!(!set.contains("student"));
    }

    #[test]
    fn test_password_hash_debug_redacted() {
        let hash = PasswordHash::new("$2b$12$abcdefghijklmnopqrstuv");
        let rendered = format!("{:?}", hash);
        assert!(!rendered.contains("$2b$"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_user_id_roundtrip() {
        let id = UserId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_type_equality() {
        assert_eq!(Subject::new("alice"), Subject::new("alice"));
        assert_ne!(Subject::new("alice"), Subject::new("bob"));
    }
}
