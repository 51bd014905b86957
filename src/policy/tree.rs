//! The condition tree and its edit operations.
//!
//! Every operation takes the tree by reference and returns a complete new
//! tree, or an error with the original left as it was. Nodes are addressed by
//! a [`ConditionPath`] of child indices from the root. Descent passes through
//! negations, and a count condition exposes its `where` group as its
//! children.

use super::condition::{Condition, CountComparator, CountCondition, NestedGroup, Negatable};
use crate::{Error, Result};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Location of a node as child indices from the root. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionPath(Vec<usize>);

impl ConditionPath {
    /// The root path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`-th child of this node.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Parent path and this node's index within it, or `None` at the root.
    pub fn parent(&self) -> Option<(ConditionPath, usize)> {
        let (last, rest) = self.0.split_last()?;
        Some((Self(rest.to_vec()), *last))
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw indices.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len].to_vec())
    }
}

impl From<Vec<usize>> for ConditionPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl From<&[usize]> for ConditionPath {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for ConditionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

/// Direction for reordering a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    /// Towards index 0
    Up,
    /// Towards the end
    Down,
}

/// Swap `items[index]` with its neighbour; a move past either end is a no-op.
pub(crate) fn move_item<T>(items: &mut [T], index: usize, direction: MoveDirection) {
    match direction {
        MoveDirection::Up if index > 0 => items.swap(index, index - 1),
        MoveDirection::Down if index + 1 < items.len() => items.swap(index, index + 1),
        _ => {}
    }
}

/// The `if` clause of a policy: a tree whose root is always a group,
/// possibly negated.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionTree {
    root: Condition,
}

impl ConditionTree {
    /// Wrap a root condition, which must be a group or a negated group.
    pub fn new(root: Condition) -> Result<Self> {
        if !root.is_group() {
            return Err(Error::validation_field(
                format!("the policy condition must be a group, found a {}", root.kind_name()),
                "if",
            ));
        }
        Ok(Self { root })
    }

    /// An empty allOf root.
    pub fn empty() -> Self {
        Self {
            root: Condition::Nested(NestedGroup::all_of(Vec::new())),
        }
    }

    /// The root node.
    pub fn root(&self) -> &Condition {
        &self.root
    }

    /// Consume the tree, returning the root node.
    pub fn into_root(self) -> Condition {
        self.root
    }

    /// The node at `path`.
    pub fn node(&self, path: &ConditionPath) -> Result<&Condition> {
        let mut current = &self.root;
        for (depth, &index) in path.indices().iter().enumerate() {
            let group = current.group().ok_or_else(|| {
                Error::invalid_path(
                    path.prefix(depth),
                    format!("a {} has no children", current.kind_name()),
                )
            })?;
            current = group.children.get(index).ok_or_else(|| {
                Error::invalid_path(
                    path.prefix(depth + 1),
                    format!("index {} out of bounds for {} children", index, group.children.len()),
                )
            })?;
        }
        Ok(current)
    }

    /// Every node with its path, parents before children.
    pub fn nodes(&self) -> Vec<(ConditionPath, &Condition)> {
        fn walk<'a>(
            path: ConditionPath,
            node: &'a Condition,
            out: &mut Vec<(ConditionPath, &'a Condition)>,
        ) {
            let children = node.group().map(|g| g.children.as_slice()).unwrap_or(&[]);
            out.push((path.clone(), node));
            for (i, child) in children.iter().enumerate() {
                walk(path.child(i), child, out);
            }
        }

        let mut out = Vec::new();
        walk(ConditionPath::root(), &self.root, &mut out);
        out
    }

    /// Insert an empty simple condition at the front of the group at `path`.
    pub fn add_simple(&self, path: &ConditionPath) -> Result<Self> {
        self.edit_group(path, |group| {
            group.children.insert(0, Condition::empty_simple());
            Ok(())
        })
    }

    /// Append an empty anyOf group to the group at `path`. When that group
    /// is itself negated the new child is negated too.
    pub fn add_nested_group(&self, path: &ConditionPath) -> Result<Self> {
        self.edit(path, |node| {
            let mut child = Condition::empty_group();
            if matches!(node, Condition::Negated(Negatable::Nested(_))) {
                child = child.toggled_negation();
            }
            group_of(node, path)?.children.push(child);
            Ok(())
        })
    }

    /// Insert an empty count condition at the front of the group at `path`.
    pub fn add_count(&self, path: &ConditionPath) -> Result<Self> {
        self.edit_group(path, |group| {
            group.children.insert(0, Condition::empty_count());
            Ok(())
        })
    }

    /// Replace child `index` of the group at `path`.
    pub fn update_child(
        &self,
        path: &ConditionPath,
        index: usize,
        condition: Condition,
    ) -> Result<Self> {
        self.edit_group(path, |group| {
            let slot = child_slot(group, path, index)?;
            *slot = condition;
            Ok(())
        })
    }

    /// Remove child `index` of the group at `path`. Removing the last
    /// remaining child leaves a fresh empty simple condition in its place.
    pub fn remove_child(&self, path: &ConditionPath, index: usize) -> Result<Self> {
        self.edit_group(path, |group| {
            child_slot(group, path, index)?;
            if group.children.len() == 1 {
                group.children[0] = Condition::empty_simple();
            } else {
                group.children.remove(index);
            }
            Ok(())
        })
    }

    /// Swap child `index` of the group at `path` with its neighbour.
    pub fn move_child(
        &self,
        path: &ConditionPath,
        index: usize,
        direction: MoveDirection,
    ) -> Result<Self> {
        self.edit_group(path, |group| {
            child_slot(group, path, index)?;
            move_item(&mut group.children, index, direction);
            Ok(())
        })
    }

    /// Flip the group at `path` between allOf and anyOf.
    pub fn toggle_group_kind(&self, path: &ConditionPath) -> Result<Self> {
        self.edit_group(path, |group| {
            group.kind = group.kind.toggled();
            Ok(())
        })
    }

    /// Wrap the node at `path` in a negation, or unwrap it.
    pub fn toggle_negation(&self, path: &ConditionPath) -> Result<Self> {
        self.edit(path, |node| {
            let current = std::mem::replace(node, Condition::empty_simple());
            *node = current.toggled_negation();
            Ok(())
        })
    }

    /// Drop every child of the root, keeping its kind and negation.
    pub fn clear_all(&self, path: &ConditionPath) -> Result<Self> {
        if !path.is_root() {
            return Err(Error::invalid_path(path, "only the root group can be cleared"));
        }
        self.edit_group(path, |group| {
            group.children.clear();
            Ok(())
        })
    }

    /// Change the comparator of the count at `path`, keeping its threshold.
    pub fn set_count_comparator(
        &self,
        path: &ConditionPath,
        comparator: CountComparator,
    ) -> Result<Self> {
        self.edit(path, |node| {
            count_of(node, path)?.comparator = comparator;
            Ok(())
        })
    }

    /// Change the threshold of the count at `path`.
    pub fn set_count_threshold(&self, path: &ConditionPath, threshold: i64) -> Result<Self> {
        self.edit(path, |node| {
            count_of(node, path)?.threshold = threshold;
            Ok(())
        })
    }

    fn edit<F>(&self, path: &ConditionPath, f: F) -> Result<Self>
    where
        F: FnOnce(&mut Condition) -> Result<()>,
    {
        let mut root = self.root.clone();
        f(node_mut(&mut root, path)?)?;
        Ok(Self { root })
    }

    fn edit_group<F>(&self, path: &ConditionPath, f: F) -> Result<Self>
    where
        F: FnOnce(&mut NestedGroup) -> Result<()>,
    {
        self.edit(path, |node| f(group_of(node, path)?))
    }
}

fn node_mut<'a>(root: &'a mut Condition, path: &ConditionPath) -> Result<&'a mut Condition> {
    let mut current = root;
    for (depth, &index) in path.indices().iter().enumerate() {
        let kind = current.kind_name();
        let group = match current.group_mut() {
            Some(group) => group,
            None => {
                return Err(Error::invalid_path(
                    path.prefix(depth),
                    format!("a {} has no children", kind),
                ))
            }
        };
        let len = group.children.len();
        current = group.children.get_mut(index).ok_or_else(|| {
            Error::invalid_path(
                path.prefix(depth + 1),
                format!("index {} out of bounds for {} children", index, len),
            )
        })?;
    }
    Ok(current)
}

fn group_of<'a>(node: &'a mut Condition, path: &ConditionPath) -> Result<&'a mut NestedGroup> {
    let kind = node.kind_name();
    node.group_mut()
        .ok_or_else(|| Error::invalid_path(path, format!("expected a group, found a {}", kind)))
}

fn count_of<'a>(
    node: &'a mut Condition,
    path: &ConditionPath,
) -> Result<&'a mut CountCondition> {
    let kind = node.kind_name();
    node.count_mut().ok_or_else(|| {
        Error::invalid_path(path, format!("expected a count condition, found a {}", kind))
    })
}

fn child_slot<'a>(
    group: &'a mut NestedGroup,
    path: &ConditionPath,
    index: usize,
) -> Result<&'a mut Condition> {
    let len = group.children.len();
    group.children.get_mut(index).ok_or_else(|| {
        Error::invalid_path(
            path.child(index),
            format!("index {} out of bounds for {} children", index, len),
        )
    })
}

impl Default for ConditionTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for ConditionTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConditionTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let root = Condition::deserialize(deserializer)?;
        ConditionTree::new(root).map_err(serde::de::Error::custom)
    }
}
