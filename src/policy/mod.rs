//! Policy data structures and representations.
//!
//! This module defines the policy document model: the condition tree and its
//! edit operations, parameters, the effect and its details, and display
//! metadata.

mod action;
mod condition;
mod document;
mod metadata;
mod parameter;
mod tree;

pub use action::{
    ConflictEffect, Effect, ModifyDetails, ModifyOperation, OperationKind, PolicyAction,
};
pub use condition::{
    Condition, ConditionValue, CountComparator, CountCondition, GroupKind, Negatable,
    NestedGroup, OperatorKind, SimpleCondition,
};
pub use document::{PolicyDocument, EFFECT_REFERENCE};
pub use metadata::{PolicyMetadata, PolicyMode};
pub use parameter::{
    validate_name, ParameterDefinition, ParameterForm, ParameterMetadata, ParameterType,
    Parameters, EFFECT_PARAMETER,
};
pub use tree::{ConditionPath, ConditionTree, MoveDirection};

/// Builder for creating policy documents.
#[derive(Debug, Default)]
pub struct PolicyDocumentBuilder {
    metadata: PolicyMetadata,
    effect: Effect,
    parameters: Vec<(String, ParameterDefinition)>,
    condition: Option<Condition>,
}

impl PolicyDocumentBuilder {
    /// Create a new document builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.display_name = name.into();
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = description.into();
        self
    }

    /// Set the category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.metadata.category = category.into();
        self
    }

    /// Set the mode.
    pub fn mode(mut self, mode: PolicyMode) -> Self {
        self.metadata.mode = mode;
        self
    }

    /// Set the version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.metadata.version = Some(version.into());
        self
    }

    /// Set the initial effect.
    pub fn effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    /// Add a parameter after the effect parameter.
    pub fn parameter(mut self, name: impl Into<String>, definition: ParameterDefinition) -> Self {
        self.parameters.push((name.into(), definition));
        self
    }

    /// Set the root condition.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Build the document.
    pub fn build(self) -> crate::Result<PolicyDocument> {
        let mut document = PolicyDocument::from_template(self.metadata, self.effect);
        for (name, definition) in self.parameters {
            document.parameters.insert(name, definition)?;
        }
        if let Some(condition) = self.condition {
            document.condition = ConditionTree::new(condition)?;
        }
        document.validate()?;
        Ok(document)
    }
}

impl PolicyDocument {
    /// Create a document builder.
    pub fn builder() -> PolicyDocumentBuilder {
        PolicyDocumentBuilder::new()
    }
}
