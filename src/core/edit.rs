//! Edit commands issued by the form UI.

use crate::policy::{
    Condition, ConditionPath, ConflictEffect, CountComparator, Effect, ModifyOperation,
    MoveDirection, ParameterDefinition, PolicyMode,
};

use serde::{Deserialize, Serialize};

/// One discrete user edit. Tree edits carry the path of the group or node
/// they act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Edit {
    /// Insert an empty simple condition at the front of a group
    AddSimple {
        /// Target group
        path: ConditionPath,
    },
    /// Append an empty anyOf group
    AddNestedGroup {
        /// Target group
        path: ConditionPath,
    },
    /// Insert an empty count condition at the front of a group
    AddCount {
        /// Target group
        path: ConditionPath,
    },
    /// Replace a child of a group
    UpdateChild {
        /// Target group
        path: ConditionPath,
        /// Child index
        index: usize,
        /// Replacement node
        condition: Condition,
    },
    /// Remove a child of a group
    RemoveChild {
        /// Target group
        path: ConditionPath,
        /// Child index
        index: usize,
    },
    /// Swap a child with its neighbour
    MoveChild {
        /// Target group
        path: ConditionPath,
        /// Child index
        index: usize,
        /// Which neighbour
        direction: MoveDirection,
    },
    /// Flip a group between allOf and anyOf
    ToggleGroupKind {
        /// Target group
        path: ConditionPath,
    },
    /// Wrap or unwrap a node in `not`
    ToggleNegation {
        /// Target node
        path: ConditionPath,
    },
    /// Empty the root group
    ClearAll {
        /// Must be the root
        path: ConditionPath,
    },
    /// Change a count's comparator, keeping its threshold
    SetCountComparator {
        /// Target count
        path: ConditionPath,
        /// New comparator
        comparator: CountComparator,
    },
    /// Change a count's threshold
    SetCountThreshold {
        /// Target count
        path: ConditionPath,
        /// New threshold
        threshold: i64,
    },
    /// Set the display name
    SetDisplayName {
        /// New value
        value: String,
    },
    /// Set the description
    SetDescription {
        /// New value
        value: String,
    },
    /// Set the category
    SetCategory {
        /// New value
        value: String,
    },
    /// Set the evaluation mode
    SetMode {
        /// New mode
        mode: PolicyMode,
    },
    /// Select the effect
    SetEffect {
        /// New effect
        effect: Effect,
    },
    /// Add a parameter
    AddParameter {
        /// Parameter name
        name: String,
        /// Definition
        definition: ParameterDefinition,
    },
    /// Replace and possibly rename a parameter
    UpdateParameter {
        /// Current name
        name: String,
        /// New name (same as `name` to keep it)
        #[serde(rename = "newName")]
        new_name: String,
        /// New definition
        definition: ParameterDefinition,
    },
    /// Remove a parameter
    RemoveParameter {
        /// Parameter name
        name: String,
    },
    /// Add a role definition id to the modify details
    AddRoleDefinition {
        /// Full role definition resource id
        #[serde(rename = "roleDefinitionId")]
        role_definition_id: String,
    },
    /// Remove a role definition id
    RemoveRoleDefinition {
        /// Index in the list
        index: usize,
    },
    /// Set or clear the conflict effect
    SetConflictEffect {
        /// New conflict effect
        #[serde(rename = "conflictEffect", default)]
        conflict_effect: Option<ConflictEffect>,
    },
    /// Append a modify operation
    AddOperation {
        /// The operation
        operation: ModifyOperation,
    },
    /// Replace a modify operation
    UpdateOperation {
        /// Index in the list
        index: usize,
        /// The operation
        operation: ModifyOperation,
    },
    /// Remove a modify operation
    RemoveOperation {
        /// Index in the list
        index: usize,
    },
    /// Swap a modify operation with its neighbour
    MoveOperation {
        /// Index in the list
        index: usize,
        /// Which neighbour
        direction: MoveDirection,
    },
}

impl Edit {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Edit::AddSimple { .. } => "add_simple",
            Edit::AddNestedGroup { .. } => "add_nested_group",
            Edit::AddCount { .. } => "add_count",
            Edit::UpdateChild { .. } => "update_child",
            Edit::RemoveChild { .. } => "remove_child",
            Edit::MoveChild { .. } => "move_child",
            Edit::ToggleGroupKind { .. } => "toggle_group_kind",
            Edit::ToggleNegation { .. } => "toggle_negation",
            Edit::ClearAll { .. } => "clear_all",
            Edit::SetCountComparator { .. } => "set_count_comparator",
            Edit::SetCountThreshold { .. } => "set_count_threshold",
            Edit::SetDisplayName { .. } => "set_display_name",
            Edit::SetDescription { .. } => "set_description",
            Edit::SetCategory { .. } => "set_category",
            Edit::SetMode { .. } => "set_mode",
            Edit::SetEffect { .. } => "set_effect",
            Edit::AddParameter { .. } => "add_parameter",
            Edit::UpdateParameter { .. } => "update_parameter",
            Edit::RemoveParameter { .. } => "remove_parameter",
            Edit::AddRoleDefinition { .. } => "add_role_definition",
            Edit::RemoveRoleDefinition { .. } => "remove_role_definition",
            Edit::SetConflictEffect { .. } => "set_conflict_effect",
            Edit::AddOperation { .. } => "add_operation",
            Edit::UpdateOperation { .. } => "update_operation",
            Edit::RemoveOperation { .. } => "remove_operation",
            Edit::MoveOperation { .. } => "move_operation",
        }
    }

    /// The condition path this edit addresses, for tree edits.
    pub fn path(&self) -> Option<&ConditionPath> {
        match self {
            Edit::AddSimple { path }
            | Edit::AddNestedGroup { path }
            | Edit::AddCount { path }
            | Edit::UpdateChild { path, .. }
            | Edit::RemoveChild { path, .. }
            | Edit::MoveChild { path, .. }
            | Edit::ToggleGroupKind { path }
            | Edit::ToggleNegation { path }
            | Edit::ClearAll { path }
            | Edit::SetCountComparator { path, .. }
            | Edit::SetCountThreshold { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_edit_json_form() {
        let edit: Edit = serde_json::from_value(json!({
            "op": "moveChild",
            "path": [0, 1],
            "index": 2,
            "direction": "down"
        }))
        .unwrap();
        assert_eq!(
            edit,
            Edit::MoveChild {
                path: ConditionPath::from(vec![0, 1]),
                index: 2,
                direction: MoveDirection::Down,
            }
        );
        assert_eq!(edit.name(), "move_child");
    }

    #[test]
    fn test_update_child_carries_condition() {
        let edit: Edit = serde_json::from_value(json!({
            "op": "updateChild",
            "path": [],
            "index": 0,
            "condition": { "not": { "field": "location", "in": ["eastus"] } }
        }))
        .unwrap();
        match &edit {
            Edit::UpdateChild { condition, .. } => assert!(condition.is_negated()),
            other => panic!("unexpected edit {:?}", other),
        }
        assert_eq!(edit.path(), Some(&ConditionPath::root()));

        let back = serde_json::to_value(&edit).unwrap();
        assert_eq!(back["op"], "updateChild");
        assert_eq!(back["condition"]["not"]["in"], json!(["eastus"]));
    }

    #[test]
    fn test_document_edits_have_no_path() {
        let edit: Edit = serde_json::from_value(json!({ "op": "setEffect", "effect": "Modify" })).unwrap();
        assert_eq!(edit, Edit::SetEffect { effect: Effect::Modify });
        assert!(edit.path().is_none());

        let edit: Edit = serde_json::from_value(json!({ "op": "setConflictEffect" })).unwrap();
        assert_eq!(edit, Edit::SetConflictEffect { conflict_effect: None });
    }
}
