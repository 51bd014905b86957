//! Policy condition definitions.
//!
//! A [`Condition`] is one node of the `if` clause of a policy rule. The four
//! shapes are modelled as a closed sum type; negation wraps a [`Negatable`],
//! so a negated negation cannot be represented at all.
//!
//! On the wire every shape is an Azure Policy JSON object:
//!
//! ```json
//! { "field": "type", "equals": "Microsoft.Storage/storageAccounts" }
//! { "allOf": [ ... ] }
//! { "count": { "field": "tags[*]", "where": { "anyOf": [] } }, "greater": 5 }
//! { "not": { ... } }
//! ```

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A node of the condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Leaf predicate on a single field
    Simple(SimpleCondition),
    /// AllOf / AnyOf combinator
    Nested(NestedGroup),
    /// Cardinality check over an array field
    Count(CountCondition),
    /// Negation of exactly one non-negated node
    Negated(Negatable),
}

/// The shapes a negation may wrap.
#[derive(Debug, Clone, PartialEq)]
pub enum Negatable {
    /// Negated leaf
    Simple(SimpleCondition),
    /// Negated group
    Nested(NestedGroup),
    /// Negated count
    Count(CountCondition),
}

impl Condition {
    /// A fresh, empty `field equals ""` leaf.
    pub fn empty_simple() -> Self {
        Condition::Simple(SimpleCondition::empty())
    }

    /// A fresh, empty anyOf group.
    pub fn empty_group() -> Self {
        Condition::Nested(NestedGroup::any_of(Vec::new()))
    }

    /// A fresh count over an empty field with an empty anyOf filter.
    pub fn empty_count() -> Self {
        Condition::Count(CountCondition::empty())
    }

    /// Create a `field equals value` condition.
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::simple(field, OperatorKind::Equals, ConditionValue::Single(value.into()))
    }

    /// Create a `field notEquals value` condition.
    pub fn not_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::simple(field, OperatorKind::NotEquals, ConditionValue::Single(value.into()))
    }

    /// Create a `field like pattern` condition.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::simple(field, OperatorKind::Like, ConditionValue::Single(pattern.into()))
    }

    /// Create an `exists` condition.
    pub fn exists(field: impl Into<String>, exists: bool) -> Self {
        Self::simple(
            field,
            OperatorKind::Exists,
            ConditionValue::Single(exists.to_string()),
        )
    }

    /// Create an `in` condition (value in list).
    pub fn is_in<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::simple(
            field,
            OperatorKind::In,
            ConditionValue::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Create a leaf with an explicit operator.
    pub fn simple(
        field: impl Into<String>,
        operator: OperatorKind,
        value: ConditionValue,
    ) -> Self {
        Condition::Simple(SimpleCondition {
            field: field.into(),
            operator,
            value,
        })
    }

    /// Create an allOf group.
    pub fn all_of(children: Vec<Condition>) -> Self {
        Condition::Nested(NestedGroup::all_of(children))
    }

    /// Create an anyOf group.
    pub fn any_of(children: Vec<Condition>) -> Self {
        Condition::Nested(NestedGroup::any_of(children))
    }

    /// Create a count condition.
    pub fn count(
        field: impl Into<String>,
        filter: NestedGroup,
        comparator: CountComparator,
        threshold: i64,
    ) -> Self {
        Condition::Count(CountCondition {
            field: field.into(),
            filter,
            comparator,
            threshold,
        })
    }

    /// Wrap or unwrap this node in a negation.
    ///
    /// Applying this twice yields the original node.
    pub fn toggled_negation(self) -> Self {
        match self {
            Condition::Negated(inner) => inner.into_condition(),
            Condition::Simple(s) => Condition::Negated(Negatable::Simple(s)),
            Condition::Nested(g) => Condition::Negated(Negatable::Nested(g)),
            Condition::Count(c) => Condition::Negated(Negatable::Count(c)),
        }
    }

    /// Whether this node is wrapped in a negation.
    pub fn is_negated(&self) -> bool {
        matches!(self, Condition::Negated(_))
    }

    /// Whether this node is a group, negated or not.
    pub fn is_group(&self) -> bool {
        matches!(
            self,
            Condition::Nested(_) | Condition::Negated(Negatable::Nested(_))
        )
    }

    /// The group whose children this node exposes.
    ///
    /// Groups expose themselves and counts expose their `where` filter;
    /// leaves have no children.
    pub fn group(&self) -> Option<&NestedGroup> {
        match self {
            Condition::Nested(g) | Condition::Negated(Negatable::Nested(g)) => Some(g),
            Condition::Count(c) | Condition::Negated(Negatable::Count(c)) => Some(&c.filter),
            Condition::Simple(_) | Condition::Negated(Negatable::Simple(_)) => None,
        }
    }

    /// Mutable access to the group whose children this node exposes.
    pub fn group_mut(&mut self) -> Option<&mut NestedGroup> {
        match self {
            Condition::Nested(g) | Condition::Negated(Negatable::Nested(g)) => Some(g),
            Condition::Count(c) | Condition::Negated(Negatable::Count(c)) => {
                Some(&mut c.filter)
            }
            Condition::Simple(_) | Condition::Negated(Negatable::Simple(_)) => None,
        }
    }

    /// Mutable access to the count payload, negated or not.
    pub fn count_mut(&mut self) -> Option<&mut CountCondition> {
        match self {
            Condition::Count(c) | Condition::Negated(Negatable::Count(c)) => Some(c),
            _ => None,
        }
    }

    /// Short name of the node shape, for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Condition::Simple(_) => "simple condition",
            Condition::Nested(_) => "group",
            Condition::Count(_) => "count condition",
            Condition::Negated(Negatable::Simple(_)) => "negated simple condition",
            Condition::Negated(Negatable::Nested(_)) => "negated group",
            Condition::Negated(Negatable::Count(_)) => "negated count condition",
        }
    }

    /// Validate operator/value shapes in this node and everything below it.
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            Condition::Simple(s) | Condition::Negated(Negatable::Simple(s)) => s.validate(),
            Condition::Nested(g) | Condition::Negated(Negatable::Nested(g)) => g.validate(),
            Condition::Count(c) | Condition::Negated(Negatable::Count(c)) => c.validate(),
        }
    }

    /// Parse a condition from its JSON object form.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("condition must be an object, found {}", type_name(value)))?;

        if let Some(inner) = obj.get("not") {
            expect_single_key(obj, "not")?;
            return match Condition::from_value(inner)? {
                Condition::Negated(_) => Err("'not' cannot wrap another 'not'".to_string()),
                positive => Ok(positive.toggled_negation()),
            };
        }

        for kind in [GroupKind::AllOf, GroupKind::AnyOf] {
            if let Some(children) = obj.get(kind.key()) {
                expect_single_key(obj, kind.key())?;
                return Ok(Condition::Nested(NestedGroup::from_children(kind, children)?));
            }
        }

        if let Some(count) = obj.get("count") {
            return CountCondition::from_parts(count, obj).map(Condition::Count);
        }

        if obj.contains_key("field") {
            return SimpleCondition::from_object(obj).map(Condition::Simple);
        }

        Err(format!(
            "unrecognized condition with keys [{}]",
            obj.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
        ))
    }
}

impl Negatable {
    /// Unwrap back into an ordinary, non-negated condition.
    pub fn into_condition(self) -> Condition {
        match self {
            Negatable::Simple(s) => Condition::Simple(s),
            Negatable::Nested(g) => Condition::Nested(g),
            Negatable::Count(c) => Condition::Count(c),
        }
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Condition::Simple(s) => s.serialize(serializer),
            Condition::Nested(g) => g.serialize(serializer),
            Condition::Count(c) => c.serialize(serializer),
            Condition::Negated(inner) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("not", inner)?;
                map.end()
            }
        }
    }
}

impl Serialize for Negatable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Negatable::Simple(s) => s.serialize(serializer),
            Negatable::Nested(g) => g.serialize(serializer),
            Negatable::Count(c) => c.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Condition::from_value(&value).map_err(de::Error::custom)
    }
}

/// A leaf predicate: `field <operator> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCondition {
    /// Resource property path or alias (e.g. `Microsoft.Storage/storageAccounts/sku.name`)
    pub field: String,
    /// Comparison operator
    pub operator: OperatorKind,
    /// Operand; a list for `in`/`notIn`, a single string otherwise
    pub value: ConditionValue,
}

impl SimpleCondition {
    /// `"" equals ""`.
    pub fn empty() -> Self {
        Self {
            field: String::new(),
            operator: OperatorKind::Equals,
            value: ConditionValue::Single(String::new()),
        }
    }

    /// Change the operator, converting the value between single and list
    /// forms when the new operator needs the other one.
    pub fn set_operator(&mut self, operator: OperatorKind) {
        self.operator = operator;
        let value = std::mem::replace(&mut self.value, ConditionValue::Single(String::new()));
        self.value = match (operator.takes_list(), value) {
            (true, ConditionValue::Single(s)) if is_template_expression(&s) => {
                ConditionValue::Single(s)
            }
            (true, ConditionValue::Single(s)) if s.is_empty() => ConditionValue::List(Vec::new()),
            (true, ConditionValue::Single(s)) => ConditionValue::List(vec![s]),
            (false, ConditionValue::List(items)) => {
                ConditionValue::Single(items.into_iter().next().unwrap_or_default())
            }
            (_, unchanged) => unchanged,
        };
    }

    fn validate(&self) -> crate::Result<()> {
        match (&self.value, self.operator.takes_list()) {
            (ConditionValue::List(_), true) | (ConditionValue::Single(_), false) => Ok(()),
            (ConditionValue::Single(s), true) if is_template_expression(s) => Ok(()),
            (ConditionValue::Single(_), true) => Err(crate::Error::validation_field(
                format!("'{}' on '{}' requires a list of values", self.operator, self.field),
                "value",
            )),
            (ConditionValue::List(_), false) => Err(crate::Error::validation_field(
                format!("'{}' on '{}' requires a single value", self.operator, self.field),
                "value",
            )),
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Result<Self, String> {
        let field = obj
            .get("field")
            .and_then(Value::as_str)
            .ok_or("'field' must be a string")?
            .to_string();

        let mut operands = obj.iter().filter(|(k, _)| k.as_str() != "field");
        let (key, raw) = operands
            .next()
            .ok_or_else(|| format!("condition on '{}' has no operator", field))?;
        if operands.next().is_some() {
            return Err(format!("condition on '{}' has more than one operator", field));
        }

        let operator: OperatorKind = key.parse()?;
        let value = ConditionValue::from_json(raw)?;
        Ok(Self {
            field,
            operator,
            value,
        })
    }
}

/// `[parameters('x')]` and other ARM template expressions, which stand in for
/// a list that is only known at assignment time.
fn is_template_expression(value: &str) -> bool {
    let value = value.trim();
    value.len() > 2 && value.starts_with('[') && value.ends_with(']') && !value.starts_with("[[")
}

impl Serialize for SimpleCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("field", &self.field)?;
        map.serialize_entry(self.operator.as_str(), &self.value)?;
        map.end()
    }
}

/// Operators available to a simple condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperatorKind {
    /// Case-insensitive equality
    Equals,
    /// Case-insensitive inequality
    NotEquals,
    /// Wildcard match (`*`)
    Like,
    /// Negated wildcard match
    NotLike,
    /// Pattern match (`#` digit, `?` letter, `.` any)
    Match,
    /// Case-insensitive pattern match
    MatchInsensitively,
    /// Negated pattern match
    NotMatch,
    /// Negated case-insensitive pattern match
    NotMatchInsensitively,
    /// Substring / element containment
    Contains,
    /// Negated containment
    NotContains,
    /// Value is in a list
    In,
    /// Value is not in a list
    NotIn,
    /// Object has key
    ContainsKey,
    /// Object lacks key
    NotContainsKey,
    /// Less than
    Less,
    /// Less than or equal
    LessOrEquals,
    /// Greater than
    Greater,
    /// Greater than or equal
    GreaterOrEquals,
    /// Field presence (`"true"` / `"false"`)
    Exists,
}

impl OperatorKind {
    /// Every operator, in the order the operator dropdown lists them.
    pub const ALL: [OperatorKind; 19] = [
        OperatorKind::Equals,
        OperatorKind::NotEquals,
        OperatorKind::Like,
        OperatorKind::NotLike,
        OperatorKind::Match,
        OperatorKind::MatchInsensitively,
        OperatorKind::NotMatch,
        OperatorKind::NotMatchInsensitively,
        OperatorKind::Contains,
        OperatorKind::NotContains,
        OperatorKind::In,
        OperatorKind::NotIn,
        OperatorKind::ContainsKey,
        OperatorKind::NotContainsKey,
        OperatorKind::Less,
        OperatorKind::LessOrEquals,
        OperatorKind::Greater,
        OperatorKind::GreaterOrEquals,
        OperatorKind::Exists,
    ];

    /// The JSON key for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorKind::Equals => "equals",
            OperatorKind::NotEquals => "notEquals",
            OperatorKind::Like => "like",
            OperatorKind::NotLike => "notLike",
            OperatorKind::Match => "match",
            OperatorKind::MatchInsensitively => "matchInsensitively",
            OperatorKind::NotMatch => "notMatch",
            OperatorKind::NotMatchInsensitively => "notMatchInsensitively",
            OperatorKind::Contains => "contains",
            OperatorKind::NotContains => "notContains",
            OperatorKind::In => "in",
            OperatorKind::NotIn => "notIn",
            OperatorKind::ContainsKey => "containsKey",
            OperatorKind::NotContainsKey => "notContainsKey",
            OperatorKind::Less => "less",
            OperatorKind::LessOrEquals => "lessOrEquals",
            OperatorKind::Greater => "greater",
            OperatorKind::GreaterOrEquals => "greaterOrEquals",
            OperatorKind::Exists => "exists",
        }
    }

    /// Whether the operand is a list of strings.
    pub fn takes_list(&self) -> bool {
        matches!(self, OperatorKind::In | OperatorKind::NotIn)
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OperatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperatorKind::ALL
            .iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown operator '{}'", s))
    }
}

/// Operand of a simple condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConditionValue {
    /// Single string operand
    Single(String),
    /// List operand for `in` / `notIn`
    List(Vec<String>),
}

impl ConditionValue {
    /// Scalars are kept as their textual form, so `true` and `"true"` read the same.
    fn from_json(value: &Value) -> Result<Self, String> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(scalar_text)
                .collect::<Result<Vec<_>, _>>()
                .map(ConditionValue::List),
            other => scalar_text(other).map(ConditionValue::Single),
        }
    }
}

impl From<&str> for ConditionValue {
    fn from(s: &str) -> Self {
        ConditionValue::Single(s.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(s: String) -> Self {
        ConditionValue::Single(s)
    }
}

impl From<Vec<String>> for ConditionValue {
    fn from(v: Vec<String>) -> Self {
        ConditionValue::List(v)
    }
}

fn scalar_text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("expected a scalar value, found {}", type_name(other))),
    }
}

/// Logical combinator of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupKind {
    /// Every child must hold (AND)
    AllOf,
    /// At least one child must hold (OR)
    AnyOf,
}

impl GroupKind {
    /// The JSON key for this combinator.
    pub fn key(&self) -> &'static str {
        match self {
            GroupKind::AllOf => "allOf",
            GroupKind::AnyOf => "anyOf",
        }
    }

    /// The other combinator.
    pub fn toggled(self) -> Self {
        match self {
            GroupKind::AllOf => GroupKind::AnyOf,
            GroupKind::AnyOf => GroupKind::AllOf,
        }
    }
}

/// An allOf/anyOf group over an ordered list of children.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedGroup {
    /// AND or OR
    pub kind: GroupKind,
    /// Children, in display order
    pub children: Vec<Condition>,
}

impl NestedGroup {
    /// Create an allOf group.
    pub fn all_of(children: Vec<Condition>) -> Self {
        Self {
            kind: GroupKind::AllOf,
            children,
        }
    }

    /// Create an anyOf group.
    pub fn any_of(children: Vec<Condition>) -> Self {
        Self {
            kind: GroupKind::AnyOf,
            children,
        }
    }

    fn validate(&self) -> crate::Result<()> {
        for child in &self.children {
            child.validate()?;
        }
        Ok(())
    }

    fn from_children(kind: GroupKind, children: &Value) -> Result<Self, String> {
        let items = children
            .as_array()
            .ok_or_else(|| format!("'{}' must be an array", kind.key()))?;
        let children = items
            .iter()
            .map(Condition::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { kind, children })
    }
}

impl Serialize for NestedGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.kind.key(), &self.children)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for NestedGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Condition::deserialize(deserializer)? {
            Condition::Nested(group) => Ok(group),
            other => Err(de::Error::custom(format!(
                "expected an allOf/anyOf group, found a {}",
                other.kind_name()
            ))),
        }
    }
}

/// Comparison applied to the number of matching array elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CountComparator {
    /// Count > threshold
    Greater,
    /// Count < threshold
    Less,
    /// Count == threshold
    Equals,
}

impl CountComparator {
    /// Every comparator.
    pub const ALL: [CountComparator; 3] = [
        CountComparator::Greater,
        CountComparator::Less,
        CountComparator::Equals,
    ];

    /// The JSON key for this comparator.
    pub fn key(&self) -> &'static str {
        match self {
            CountComparator::Greater => "greater",
            CountComparator::Less => "less",
            CountComparator::Equals => "equals",
        }
    }
}

/// Counts elements of an array field matching `filter`, then compares the
/// count to `threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct CountCondition {
    /// Array alias, e.g. `Microsoft.Network/networkSecurityGroups/securityRules[*]`
    pub field: String,
    /// The `where` clause
    pub filter: NestedGroup,
    /// How the count is compared
    pub comparator: CountComparator,
    /// Value the count is compared against
    pub threshold: i64,
}

#[derive(Serialize)]
struct CountClause<'a> {
    field: &'a str,
    #[serde(rename = "where")]
    filter: &'a NestedGroup,
}

impl CountCondition {
    /// Count over an empty field, empty anyOf filter, `greater 0`.
    pub fn empty() -> Self {
        Self {
            field: String::new(),
            filter: NestedGroup::any_of(Vec::new()),
            comparator: CountComparator::Greater,
            threshold: 0,
        }
    }

    fn validate(&self) -> crate::Result<()> {
        self.filter.validate()
    }

    fn from_parts(count: &Value, obj: &Map<String, Value>) -> Result<Self, String> {
        let count = count.as_object().ok_or("'count' must be an object")?;
        let field = count
            .get("field")
            .and_then(Value::as_str)
            .ok_or("'count.field' must be a string")?
            .to_string();
        let filter = match count.get("where") {
            Some(clause) => match Condition::from_value(clause)? {
                Condition::Nested(group) => group,
                other => {
                    return Err(format!(
                        "'count.where' must be an allOf/anyOf group, found a {}",
                        other.kind_name()
                    ))
                }
            },
            None => NestedGroup::any_of(Vec::new()),
        };

        let mut comparisons = obj.iter().filter(|(k, _)| k.as_str() != "count");
        let (key, raw) = comparisons
            .next()
            .ok_or("count condition has no comparator")?;
        if comparisons.next().is_some() {
            return Err("count condition has more than one comparator".to_string());
        }
        let comparator = CountComparator::ALL
            .iter()
            .find(|c| c.key().eq_ignore_ascii_case(key))
            .copied()
            .ok_or_else(|| format!("unsupported count comparator '{}'", key))?;
        let threshold = raw
            .as_i64()
            .ok_or_else(|| format!("count threshold for '{}' must be an integer", key))?;

        Ok(Self {
            field,
            filter,
            comparator,
            threshold,
        })
    }
}

impl Serialize for CountCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(
            "count",
            &CountClause {
                field: &self.field,
                filter: &self.filter,
            },
        )?;
        map.serialize_entry(self.comparator.key(), &self.threshold)?;
        map.end()
    }
}

fn expect_single_key(obj: &Map<String, Value>, key: &str) -> Result<(), String> {
    if obj.len() == 1 {
        Ok(())
    } else {
        Err(format!("'{}' must be the only key of its object", key))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_condition_shape() {
        let cond = Condition::equals("type", "Microsoft.Storage/storageAccounts");
        assert_eq!(
            serde_json::to_value(&cond).unwrap(),
            json!({ "field": "type", "equals": "Microsoft.Storage/storageAccounts" })
        );
    }

    #[test]
    fn test_in_operator_carries_list() {
        let cond = Condition::is_in("location", ["eastus", "westus"]);
        assert_eq!(
            serde_json::to_value(&cond).unwrap(),
            json!({ "field": "location", "in": ["eastus", "westus"] })
        );
        assert!(cond.validate().is_ok());
    }

    #[test]
    fn test_value_shape_validation() {
        let bad = Condition::simple("location", OperatorKind::In, "eastus".into());
        assert!(bad.validate().is_err());

        let bad = Condition::simple(
            "location",
            OperatorKind::Equals,
            ConditionValue::List(vec!["eastus".into()]),
        );
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_set_operator_converts_value() {
        let mut simple = SimpleCondition::empty();
        simple.value = "eastus".into();
        simple.set_operator(OperatorKind::NotIn);
        assert_eq!(simple.value, ConditionValue::List(vec!["eastus".to_string()]));

        simple.set_operator(OperatorKind::Like);
        assert_eq!(simple.value, ConditionValue::Single("eastus".to_string()));

        let mut empty = SimpleCondition::empty();
        empty.set_operator(OperatorKind::In);
        assert_eq!(empty.value, ConditionValue::List(Vec::new()));

        let mut bound = SimpleCondition::empty();
        bound.value = "[parameters('allowedLocations')]".into();
        bound.set_operator(OperatorKind::In);
        assert_eq!(bound.value, ConditionValue::Single("[parameters('allowedLocations')]".into()));
    }

    #[test]
    fn test_negation_toggle_is_involution() {
        let original = Condition::any_of(vec![Condition::exists("tags", true)]);
        let negated = original.clone().toggled_negation();
        assert!(negated.is_negated());
        assert_eq!(
            serde_json::to_value(&negated).unwrap(),
            json!({ "not": { "anyOf": [{ "field": "tags", "exists": "true" }] } })
        );
        assert_eq!(negated.toggled_negation(), original);
    }

    #[test]
    fn test_count_shape() {
        let cond = Condition::count("f", NestedGroup::any_of(vec![]), CountComparator::Greater, 5);
        assert_eq!(
            serde_json::to_value(&cond).unwrap(),
            json!({ "count": { "field": "f", "where": { "anyOf": [] } }, "greater": 5 })
        );
    }

    #[test]
    fn test_parse_nested_tree() {
        let value = json!({
            "allOf": [
                { "field": "type", "equals": "Microsoft.Compute/virtualMachines" },
                { "not": { "field": "location", "in": ["eastus", "westus"] } },
                {
                    "count": {
                        "field": "Microsoft.Network/networkSecurityGroups/securityRules[*]",
                        "where": { "allOf": [{ "field": "x", "like": "*" }] }
                    },
                    "less": 2
                }
            ]
        });
        let cond = Condition::from_value(&value).unwrap();
        let group = cond.group().unwrap();
        assert_eq!(group.kind, GroupKind::AllOf);
        assert_eq!(group.children.len(), 3);
        assert!(group.children[1].is_negated());
        assert_eq!(serde_json::to_value(&cond).unwrap(), value);
    }

    #[test]
    fn test_parse_scalars_as_text() {
        let cond = Condition::from_value(&json!({ "field": "tags", "exists": true })).unwrap();
        assert_eq!(cond, Condition::exists("tags", true));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Condition::from_value(&json!("field")).is_err());
        assert!(Condition::from_value(&json!({ "not": { "not": { "allOf": [] } } })).is_err());
        assert!(Condition::from_value(&json!({ "allOf": [], "anyOf": [] })).is_err());
        assert!(Condition::from_value(&json!({ "field": "a" })).is_err());
        assert!(Condition::from_value(&json!({ "field": "a", "equals": "b", "like": "c" })).is_err());
        assert!(Condition::from_value(&json!({ "field": "a", "between": "b" })).is_err());
        assert!(Condition::from_value(&json!({ "count": { "field": "f" }, "greaterOrEquals": 1 })).is_err());
        assert!(Condition::from_value(&json!({ "count": { "field": "f", "where": { "field": "a", "equals": "b" } }, "less": 1 })).is_err());
        assert!(Condition::from_value(&json!({ "source": "action" })).is_err());
    }

    #[test]
    fn test_count_without_where_gets_empty_filter() {
        let cond = Condition::from_value(&json!({ "count": { "field": "f" }, "equals": 0 })).unwrap();
        match cond {
            Condition::Count(c) => {
                assert_eq!(c.filter, NestedGroup::any_of(vec![]));
                assert_eq!(c.comparator, CountComparator::Equals);
            }
            other => panic!("expected count, got {:?}", other),
        }
    }

    #[test]
    fn test_list_operator_accepts_parameter_reference() {
        let cond = Condition::from_value(&json!({
            "allOf": [{ "field": "location", "notIn": "[parameters('allowedLocations')]" }]
        }))
        .unwrap();
        assert!(cond.validate().is_ok());

        let literal = Condition::simple(
            "location",
            OperatorKind::In,
            ConditionValue::Single("eastus".into()),
        );
        assert!(literal.validate().is_err());

        // `[[` escapes a literal leading bracket.
        let escaped = Condition::simple(
            "location",
            OperatorKind::In,
            ConditionValue::Single("[[eastus]".into()),
        );
        assert!(escaped.validate().is_err());
    }

    #[test]
    fn test_count_comparator_key_is_case_insensitive() {
        let cond = Condition::from_value(&json!({ "count": { "field": "f" }, "Greater": 2 })).unwrap();
        match cond {
            Condition::Count(c) => {
                assert_eq!(c.comparator, CountComparator::Greater);
                assert_eq!(c.threshold, 2);
            }
            other => panic!("expected count, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_from_str() {
        assert_eq!("notIn".parse::<OperatorKind>().unwrap(), OperatorKind::NotIn);
        assert_eq!("EQUALS".parse::<OperatorKind>().unwrap(), OperatorKind::Equals);
        assert!("between".parse::<OperatorKind>().is_err());
    }
}
