//! The pure document reducer.
//!
//! [`apply`] maps a document and one edit to a complete new document. The
//! input is never modified; on error nothing is produced.

use super::edit::Edit;
use crate::policy::{PolicyDocument, EFFECT_PARAMETER};
use crate::{Error, Result};

/// Apply one edit, returning the next document.
pub fn apply(document: &PolicyDocument, edit: &Edit) -> Result<PolicyDocument> {
    let mut next = document.clone();
    let tree = &document.condition;

    match edit {
        Edit::AddSimple { path } => next.condition = tree.add_simple(path)?,
        Edit::AddNestedGroup { path } => next.condition = tree.add_nested_group(path)?,
        Edit::AddCount { path } => next.condition = tree.add_count(path)?,
        Edit::UpdateChild {
            path,
            index,
            condition,
        } => next.condition = tree.update_child(path, *index, condition.clone())?,
        Edit::RemoveChild { path, index } => next.condition = tree.remove_child(path, *index)?,
        Edit::MoveChild {
            path,
            index,
            direction,
        } => next.condition = tree.move_child(path, *index, *direction)?,
        Edit::ToggleGroupKind { path } => next.condition = tree.toggle_group_kind(path)?,
        Edit::ToggleNegation { path } => next.condition = tree.toggle_negation(path)?,
        Edit::ClearAll { path } => next.condition = tree.clear_all(path)?,
        Edit::SetCountComparator { path, comparator } => {
            next.condition = tree.set_count_comparator(path, *comparator)?
        }
        Edit::SetCountThreshold { path, threshold } => {
            next.condition = tree.set_count_threshold(path, *threshold)?
        }

        Edit::SetDisplayName { value } => next.metadata.display_name = value.clone(),
        Edit::SetDescription { value } => next.metadata.description = value.clone(),
        Edit::SetCategory { value } => next.metadata.category = value.clone(),
        Edit::SetMode { mode } => next.metadata.mode = *mode,
        Edit::SetEffect { effect } => next.set_effect(*effect),

        Edit::AddParameter { name, definition } => {
            guard_reserved(name)?;
            next.parameters.insert(name.clone(), definition.clone())?;
        }
        Edit::UpdateParameter {
            name,
            new_name,
            definition,
        } => {
            guard_reserved(name)?;
            guard_reserved(new_name)?;
            next.parameters.update(name, new_name, definition.clone())?;
        }
        Edit::RemoveParameter { name } => {
            guard_reserved(name)?;
            next.parameters.remove(name)?;
        }

        Edit::AddRoleDefinition { role_definition_id } => next
            .action
            .details_mut()?
            .add_role_definition(role_definition_id.clone())?,
        Edit::RemoveRoleDefinition { index } => {
            next.action.details_mut()?.remove_role_definition(*index)?;
        }
        Edit::SetConflictEffect { conflict_effect } => {
            next.action.details_mut()?.conflict_effect = *conflict_effect
        }
        Edit::AddOperation { operation } => {
            next.action.details_mut()?.add_operation(operation.clone())?
        }
        Edit::UpdateOperation { index, operation } => next
            .action
            .details_mut()?
            .update_operation(*index, operation.clone())?,
        Edit::RemoveOperation { index } => {
            next.action.details_mut()?.remove_operation(*index)?;
        }
        Edit::MoveOperation { index, direction } => {
            next.action.details_mut()?.move_operation(*index, *direction)?
        }
    }

    Ok(next)
}

/// Apply edits in order. Either all apply or the result is an error.
pub fn apply_all<'a, I>(document: &PolicyDocument, edits: I) -> Result<PolicyDocument>
where
    I: IntoIterator<Item = &'a Edit>,
{
    let mut current = document.clone();
    for (i, edit) in edits.into_iter().enumerate() {
        current = apply(&current, edit).map_err(|e| match e {
            Error::Validation { message, field } => Error::Validation {
                message: format!("edit {} ({}): {}", i, edit.name(), message),
                field,
            },
            other => other,
        })?;
    }
    Ok(current)
}

fn guard_reserved(name: &str) -> Result<()> {
    if name.eq_ignore_ascii_case(EFFECT_PARAMETER) {
        return Err(Error::validation_field(
            "the 'effect' parameter is managed by the effect selector",
            "name",
        ));
    }
    Ok(())
}
