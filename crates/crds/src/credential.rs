//! Credential wrapper
//!
//! Passwords and data source names travel through the CRDs as plain strings
//! on the wire, but are wrapped so that `{:?}` never prints them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque secret string. Serializes transparently, debug-prints redacted.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw value, for building Secrets and environment variables only
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Blank or whitespace only
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let credential = Credential::new("hunter2");
        let printed = format!("{:?}", credential);
        assert!(!printed.contains("hunter2"));
        assert_eq!(credential.expose(), "hunter2");
    }

    #[test]
    fn serializes_as_plain_string() {
        let credential = Credential::new("s3cret");
        assert_eq!(serde_json::to_string(&credential).unwrap(), "\"s3cret\"");
        let back: Credential = serde_json::from_str("\"s3cret\"").unwrap();
        assert_eq!(back, credential);
    }

    #[test]
    fn whitespace_only_counts_as_empty() {
        assert!(Credential::new("  ").is_empty());
        assert!(!Credential::new("x").is_empty());
    }
}
