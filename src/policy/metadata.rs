//! Policy display metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which resource types the policy evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyMode {
    /// Resource groups, subscriptions and all resource types
    All,
    /// Only resource types that support tags and location
    Indexed,
}

impl Default for PolicyMode {
    fn default() -> Self {
        PolicyMode::All
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyMode::All => write!(f, "All"),
            PolicyMode::Indexed => write!(f, "Indexed"),
        }
    }
}

/// Metadata shown in the portal for a policy definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyMetadata {
    /// Human-readable name of the policy
    pub display_name: String,
    /// Optional description
    pub description: String,
    /// Portal category, e.g. `Tags` or `Storage`
    pub category: String,
    /// Evaluation mode
    pub mode: PolicyMode,
    /// Semantic version, if the author set one
    pub version: Option<String>,
}

impl PolicyMetadata {
    /// Create new metadata with the given display name.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the mode.
    pub fn with_mode(mut self, mode: PolicyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder_pattern() {
        let metadata = PolicyMetadata::new("Require a tag")
            .with_description("Enforces a tag on resources")
            .with_category("Tags")
            .with_mode(PolicyMode::Indexed)
            .with_version("1.0.0");

        assert_eq!(metadata.display_name, "Require a tag");
        assert_eq!(metadata.description, "Enforces a tag on resources");
        assert_eq!(metadata.category, "Tags");
        assert_eq!(metadata.mode, PolicyMode::Indexed);
        assert_eq!(metadata.version, Some("1.0.0".to_string()));
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&PolicyMode::Indexed).unwrap(), "\"Indexed\"");
        let parsed: PolicyMode = serde_json::from_str("\"All\"").unwrap();
        assert_eq!(parsed, PolicyMode::All);
    }
}
