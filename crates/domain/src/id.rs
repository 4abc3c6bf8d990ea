//! Device identifier newtype.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, operator-chosen identifier for a device.
///
/// Identifiers come from configuration (e.g. `bedroom-light`) and must be
/// unique within one registry; they are echoed verbatim in every envelope
/// the assistant platform sees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap an identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Access the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_through_serde_json() {
        let id = DeviceId::new("bedroom-light");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"bedroom-light\"");
        let parsed: DeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn should_display_inner_string() {
        assert_eq!(DeviceId::from("kitchen-valve").to_string(), "kitchen-valve");
    }
}
