//! Policy effect and `then` details.

use super::tree::{move_item, MoveDirection};
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The enforcement action of the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Record a non-compliance event
    #[default]
    Audit,
    /// Block the request
    Deny,
    /// Add, replace or remove properties on the resource
    Modify,
    /// Do not evaluate
    Disabled,
}

impl Effect {
    /// Values the effect parameter may take when this effect is selected.
    pub fn allowed_values(&self) -> &'static [Effect] {
        match self {
            Effect::Modify => &[Effect::Modify, Effect::Disabled],
            _ => &[Effect::Audit, Effect::Deny, Effect::Disabled],
        }
    }

    /// Whether this effect carries a `details` block.
    pub fn has_details(&self) -> bool {
        matches!(self, Effect::Modify)
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Audit => "Audit",
            Effect::Deny => "Deny",
            Effect::Modify => "Modify",
            Effect::Disabled => "Disabled",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Effect {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "audit" => Ok(Effect::Audit),
            "deny" => Ok(Effect::Deny),
            "modify" => Ok(Effect::Modify),
            "disabled" => Ok(Effect::Disabled),
            _ => Err(crate::Error::parse(format!("Unknown effect: {}", s))),
        }
    }
}

/// Effect applied when a modify conflicts with another assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictEffect {
    /// Report the conflict
    Audit,
    /// Block the request
    Deny,
    /// Skip the modification
    Disabled,
}

/// Kind of field mutation performed by a modify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    /// Set the field, overwriting any existing value
    AddOrReplace,
    /// Set the field only if absent
    Add,
    /// Remove the field
    Remove,
}

/// A single field mutation of a modify effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifyOperation {
    /// What to do
    pub operation: OperationKind,
    /// Field or tag to mutate (e.g. `tags['environment']`)
    pub field: String,
    /// New value, absent for `remove`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Template expression gating the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl ModifyOperation {
    /// Create an addOrReplace operation.
    pub fn add_or_replace(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            operation: OperationKind::AddOrReplace,
            field: field.into(),
            value: Some(value),
            condition: None,
        }
    }

    /// Create an add operation.
    pub fn add(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            operation: OperationKind::Add,
            field: field.into(),
            value: Some(value),
            condition: None,
        }
    }

    /// Create a remove operation.
    pub fn remove(field: impl Into<String>) -> Self {
        Self {
            operation: OperationKind::Remove,
            field: field.into(),
            value: None,
            condition: None,
        }
    }

    /// Gate the operation on a template expression.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Check that the value is present exactly when the operation needs one.
    pub fn validate(&self) -> Result<()> {
        match (self.operation, &self.value) {
            (OperationKind::Remove, Some(_)) => Err(Error::validation_field(
                format!("remove operation on '{}' cannot carry a value", self.field),
                "value",
            )),
            (OperationKind::Add | OperationKind::AddOrReplace, None) => {
                Err(Error::validation_field(
                    format!("operation on '{}' requires a value", self.field),
                    "value",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// The `details` block of a modify effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyDetails {
    /// Role definitions the remediation identity needs
    #[serde(default)]
    pub role_definition_ids: Vec<String>,
    /// Effect on conflicting assignments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_effect: Option<ConflictEffect>,
    /// Field mutations, applied in order
    #[serde(default)]
    pub operations: Vec<ModifyOperation>,
}

impl ModifyDetails {
    /// Add a role definition id.
    pub fn add_role_definition(&mut self, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::validation_field(
                "role definition id cannot be empty",
                "roleDefinitionIds",
            ));
        }
        if self.role_definition_ids.iter().any(|r| r.eq_ignore_ascii_case(&id)) {
            return Err(Error::validation_field(
                format!("role definition '{}' is already listed", id),
                "roleDefinitionIds",
            ));
        }
        self.role_definition_ids.push(id);
        Ok(())
    }

    /// Remove the role definition id at `index`.
    pub fn remove_role_definition(&mut self, index: usize) -> Result<String> {
        check_index(index, self.role_definition_ids.len(), "roleDefinitionIds")?;
        Ok(self.role_definition_ids.remove(index))
    }

    /// Append an operation.
    pub fn add_operation(&mut self, operation: ModifyOperation) -> Result<()> {
        operation.validate()?;
        self.operations.push(operation);
        Ok(())
    }

    /// Replace the operation at `index`.
    pub fn update_operation(&mut self, index: usize, operation: ModifyOperation) -> Result<()> {
        check_index(index, self.operations.len(), "operations")?;
        operation.validate()?;
        self.operations[index] = operation;
        Ok(())
    }

    /// Remove the operation at `index`.
    pub fn remove_operation(&mut self, index: usize) -> Result<ModifyOperation> {
        check_index(index, self.operations.len(), "operations")?;
        Ok(self.operations.remove(index))
    }

    /// Swap the operation at `index` with its neighbour; no-op at the ends.
    pub fn move_operation(&mut self, index: usize, direction: MoveDirection) -> Result<()> {
        check_index(index, self.operations.len(), "operations")?;
        move_item(&mut self.operations, index, direction);
        Ok(())
    }

    /// Validate every operation.
    pub fn validate(&self) -> Result<()> {
        for operation in &self.operations {
            operation.validate()?;
        }
        Ok(())
    }
}

fn check_index(index: usize, len: usize, field: &str) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::validation_field(
            format!("index {} out of bounds for {} entries", index, len),
            field,
        ))
    }
}

/// The `then` clause: the selected effect and, for Modify, its details.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyAction {
    /// Selected effect
    pub effect: Effect,
    /// Present exactly when `effect` is Modify
    pub details: Option<ModifyDetails>,
}

impl PolicyAction {
    /// An action for the given effect, with empty details for Modify.
    pub fn new(effect: Effect) -> Self {
        Self {
            effect,
            details: effect.has_details().then(ModifyDetails::default),
        }
    }

    /// Switch effect, creating or dropping the details block as needed.
    /// Existing details survive a switch from Modify to Modify.
    pub fn set_effect(&mut self, effect: Effect) {
        self.effect = effect;
        if !effect.has_details() {
            self.details = None;
        } else if self.details.is_none() {
            self.details = Some(ModifyDetails::default());
        }
    }

    /// Mutable details, or a user error when the effect is not Modify.
    pub fn details_mut(&mut self) -> Result<&mut ModifyDetails> {
        let effect = self.effect;
        self.details.as_mut().ok_or_else(|| {
            Error::validation_field(
                format!("the {} effect has no details", effect),
                "details",
            )
        })
    }
}

impl Default for PolicyAction {
    fn default() -> Self {
        Self::new(Effect::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_allowed_values_follow_effect() {
        assert_eq!(Effect::Modify.allowed_values(), &[Effect::Modify, Effect::Disabled]);
        assert_eq!(
            Effect::Deny.allowed_values(),
            &[Effect::Audit, Effect::Deny, Effect::Disabled]
        );
        assert_eq!(Effect::Disabled.allowed_values(), Effect::Audit.allowed_values());
    }

    #[test]
    fn test_default_effect_is_audit() {
        assert_eq!(Effect::default(), Effect::Audit);
        assert_eq!(PolicyAction::default().effect, Effect::Audit);
        assert!(PolicyAction::default().details.is_none());
    }

    #[test]
    fn test_effect_from_str() {
        assert_eq!("modify".parse::<Effect>().unwrap(), Effect::Modify);
        assert_eq!("DENY".parse::<Effect>().unwrap(), Effect::Deny);
        assert!("append".parse::<Effect>().is_err());
    }

    #[test]
    fn test_set_effect_manages_details() {
        let mut action = PolicyAction::new(Effect::Audit);
        assert!(action.details.is_none());
        assert!(action.details_mut().is_err());

        action.set_effect(Effect::Modify);
        action
            .details_mut()
            .unwrap()
            .add_operation(ModifyOperation::remove("tags['x']"))
            .unwrap();
        action.set_effect(Effect::Modify);
        assert_eq!(action.details.as_ref().unwrap().operations.len(), 1);

        action.set_effect(Effect::Deny);
        assert!(action.details.is_none());
    }

    #[test]
    fn test_details_shape() {
        let mut details = ModifyDetails::default();
        details
            .add_role_definition(
                "/providers/Microsoft.Authorization/roleDefinitions/b24988ac-6180-42a0-ab88-20f7382dd24c",
            )
            .unwrap();
        details.conflict_effect = Some(ConflictEffect::Audit);
        details
            .add_operation(ModifyOperation::add_or_replace("tags['env']", json!("prod")))
            .unwrap();
        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            json!({
                "roleDefinitionIds": [
                    "/providers/Microsoft.Authorization/roleDefinitions/b24988ac-6180-42a0-ab88-20f7382dd24c"
                ],
                "conflictEffect": "audit",
                "operations": [
                    { "operation": "addOrReplace", "field": "tags['env']", "value": "prod" }
                ]
            })
        );
    }

    #[test]
    fn test_operation_list_edits() {
        let mut details = ModifyDetails::default();
        details.add_operation(ModifyOperation::remove("a")).unwrap();
        details.add_operation(ModifyOperation::add("b", json!(1))).unwrap();
        assert!(details.add_operation(ModifyOperation {
            operation: OperationKind::Add,
            field: "c".into(),
            value: None,
            condition: None,
        })
        .is_err());

        details.move_operation(0, MoveDirection::Up).unwrap();
        assert_eq!(details.operations[0].field, "a");
        details.move_operation(0, MoveDirection::Down).unwrap();
        assert_eq!(details.operations[0].field, "b");
        assert!(details.move_operation(2, MoveDirection::Up).is_err());

        details.remove_operation(0).unwrap();
        assert_eq!(details.operations.len(), 1);
        assert!(details.remove_operation(3).is_err());
    }

    #[test]
    fn test_role_definitions_are_unique() {
        let mut details = ModifyDetails::default();
        details.add_role_definition("/roles/a").unwrap();
        assert!(details.add_role_definition("/ROLES/A").is_err());
        assert!(details.add_role_definition("  ").is_err());
        assert_eq!(details.remove_role_definition(0).unwrap(), "/roles/a");
        assert!(details.remove_role_definition(0).is_err());
    }
}
