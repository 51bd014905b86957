//! Policy parameter definitions.

use super::action::Effect;
use crate::error::ErrorContext;
use crate::{Error, Result};

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

/// Name of the parameter the policy effect is bound to.
pub const EFFECT_PARAMETER: &str = "effect";

/// Data type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    /// Free text
    String,
    /// JSON array
    Array,
    /// JSON object
    Object,
    /// `true` / `false`
    Boolean,
    /// Whole number
    Integer,
    /// Floating point number
    Float,
    /// RFC 3339 timestamp
    DateTime,
}

impl ParameterType {
    /// Convert form text into a value of this type.
    pub fn parse_value(&self, text: &str) -> Result<Value> {
        let trimmed = text.trim();
        match self {
            ParameterType::String => Ok(Value::String(text.to_string())),
            ParameterType::Integer => trimmed
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| Error::validation(format!("'{}' is not an integer", trimmed))),
            ParameterType::Float => trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| Error::validation(format!("'{}' is not a number", trimmed))),
            ParameterType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(Error::validation(format!(
                    "'{}' is not true or false",
                    trimmed
                ))),
            },
            ParameterType::DateTime => chrono::DateTime::parse_from_rfc3339(trimmed)
                .map(|_| Value::String(trimmed.to_string()))
                .map_err(|e| {
                    Error::validation(format!("'{}' is not an RFC 3339 date-time: {}", trimmed, e))
                }),
            ParameterType::Array => match serde_json::from_str::<Value>(trimmed) {
                Ok(value @ Value::Array(_)) => Ok(value),
                _ => Err(Error::validation(format!("'{}' is not a JSON array", trimmed))),
            },
            ParameterType::Object => match serde_json::from_str::<Value>(trimmed) {
                Ok(value @ Value::Object(_)) => Ok(value),
                _ => Err(Error::validation(format!("'{}' is not a JSON object", trimmed))),
            },
        }
    }

    /// Convert allowed-values form text into a list.
    ///
    /// Accepts a JSON array whose items have this type, or a `;`-separated
    /// list of items in this type's text form.
    pub fn parse_allowed_values(&self, text: &str) -> Result<Vec<Value>> {
        let trimmed = text.trim();
        let values = if trimmed.starts_with('[') && *self != ParameterType::Array {
            let items: Vec<Value> = serde_json::from_str(trimmed)
                .map_err(|e| Error::validation(format!("invalid JSON list: {}", e)))?;
            for item in &items {
                self.check_value(item)?;
            }
            items
        } else {
            trimmed
                .split(';')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| self.parse_value(item))
                .collect::<Result<Vec<_>>>()?
        };

        if values.is_empty() {
            return Err(Error::validation("allowed values list is empty"));
        }
        Ok(values)
    }

    /// Check that an already-parsed JSON value has this type.
    pub fn check_value(&self, value: &Value) -> Result<()> {
        let ok = match self {
            ParameterType::String => value.is_string(),
            ParameterType::Array => value.is_array(),
            ParameterType::Object => value.is_object(),
            ParameterType::Boolean => value.is_boolean(),
            ParameterType::Integer => value.is_i64() || value.is_u64(),
            ParameterType::Float => value.is_number(),
            ParameterType::DateTime => value
                .as_str()
                .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::validation(format!("{} is not a valid {:?} value", value, self)))
        }
    }
}

/// Display metadata of a parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMetadata {
    /// Label shown at assignment time
    #[serde(default)]
    pub display_name: String,
    /// Help text
    #[serde(default)]
    pub description: String,
}

/// A single parameter of the policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    /// Data type
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    /// Display metadata
    #[serde(default)]
    pub metadata: ParameterMetadata,
    /// Values the assignment may pick from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
    /// Value used when the assignment does not provide one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl ParameterDefinition {
    /// A string parameter with no allowed or default values.
    pub fn new(parameter_type: ParameterType, display_name: impl Into<String>) -> Self {
        Self {
            parameter_type,
            metadata: ParameterMetadata {
                display_name: display_name.into(),
                description: String::new(),
            },
            allowed_values: None,
            default_value: None,
        }
    }

    /// The reserved effect parameter for the given selected effect.
    pub fn effect(effect: Effect) -> Self {
        Self {
            parameter_type: ParameterType::String,
            metadata: ParameterMetadata {
                display_name: "Effect".to_string(),
                description: "Enable or disable the execution of the policy".to_string(),
            },
            allowed_values: Some(
                effect
                    .allowed_values()
                    .iter()
                    .map(|e| Value::String(e.as_str().to_string()))
                    .collect(),
            ),
            default_value: Some(Value::String(effect.as_str().to_string())),
        }
    }

    /// Build a definition from the text of the parameter form.
    pub fn from_form(form: &ParameterForm) -> Result<Self> {
        let allowed_values = match form.allowed_values.trim() {
            "" => None,
            text => Some(
                form.parameter_type
                    .parse_allowed_values(text)
                    .with_field("allowedValues")?,
            ),
        };
        let default_value = match form.default_value.trim() {
            "" => None,
            _ => Some(
                form.parameter_type
                    .parse_value(&form.default_value)
                    .with_field("defaultValue")?,
            ),
        };

        let definition = Self {
            parameter_type: form.parameter_type,
            metadata: ParameterMetadata {
                display_name: form.display_name.clone(),
                description: form.description.clone(),
            },
            allowed_values,
            default_value,
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Builder-style description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = description.into();
        self
    }

    /// Builder-style allowed values.
    pub fn with_allowed_values(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    /// Builder-style default value.
    pub fn with_default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Check value types and that the default is one of the allowed values.
    pub fn validate(&self) -> Result<()> {
        if let Some(allowed) = &self.allowed_values {
            if allowed.is_empty() {
                return Err(Error::validation_field(
                    "allowed values list is empty",
                    "allowedValues",
                ));
            }
            for value in allowed {
                self.parameter_type
                    .check_value(value)
                    .with_field("allowedValues")?;
            }
        }
        if let Some(default) = &self.default_value {
            self.parameter_type
                .check_value(default)
                .with_field("defaultValue")?;
            if let Some(allowed) = &self.allowed_values {
                if !allowed.contains(default) {
                    return Err(Error::validation_field(
                        format!("default value {} is not one of the allowed values", default),
                        "defaultValue",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Raw text of the parameter form, as typed by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterForm {
    /// Selected data type
    pub parameter_type: ParameterType,
    /// Display name field
    #[serde(default)]
    pub display_name: String,
    /// Description field
    #[serde(default)]
    pub description: String,
    /// Allowed values field (JSON array or `;`-separated)
    #[serde(default)]
    pub allowed_values: String,
    /// Default value field
    #[serde(default)]
    pub default_value: String,
}

/// Check a parameter name typed into the form.
pub fn validate_name(name: &str) -> Result<()> {
    static NAME: OnceLock<Regex> = OnceLock::new();
    let pattern = NAME.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("parameter name pattern is valid")
    });

    if name.is_empty() {
        return Err(Error::validation_field("parameter name cannot be empty", "name"));
    }
    if !pattern.is_match(name) {
        return Err(Error::validation_field(
            format!(
                "parameter name '{}' must start with a letter and contain only letters, digits and underscores",
                name
            ),
            "name",
        ));
    }
    Ok(())
}

/// Parameters of a policy, in insertion order.
///
/// Names are compared case-insensitively, as Azure does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(String, ParameterDefinition)>,
}

impl Parameters {
    /// An empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only the effect parameter.
    pub fn with_effect(effect: Effect) -> Self {
        Self {
            entries: vec![(EFFECT_PARAMETER.to_string(), ParameterDefinition::effect(effect))],
        }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParameterDefinition> {
        self.position(name).map(|i| &self.entries[i].1)
    }

    /// Whether a parameter with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// The effect parameter, if present.
    pub fn effect(&self) -> Option<&ParameterDefinition> {
        self.get(EFFECT_PARAMETER)
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate over `(name, definition)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterDefinition)> {
        self.entries.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Add a new parameter at the end.
    pub fn insert(&mut self, name: impl Into<String>, definition: ParameterDefinition) -> Result<()> {
        let name = name.into();
        validate_name(&name)?;
        if self.contains(&name) {
            return Err(Error::validation_field(
                format!("a parameter named '{}' already exists", name),
                "name",
            ));
        }
        definition.validate()?;
        self.entries.push((name, definition));
        Ok(())
    }

    /// Replace a parameter, optionally renaming it in place.
    pub fn update(
        &mut self,
        name: &str,
        new_name: &str,
        definition: ParameterDefinition,
    ) -> Result<()> {
        let index = self.require(name)?;
        validate_name(new_name)?;
        if let Some(other) = self.position(new_name) {
            if other != index {
                return Err(Error::validation_field(
                    format!("a parameter named '{}' already exists", new_name),
                    "name",
                ));
            }
        }
        definition.validate()?;
        self.entries[index] = (new_name.to_string(), definition);
        Ok(())
    }

    /// Remove a parameter.
    pub fn remove(&mut self, name: &str) -> Result<ParameterDefinition> {
        let index = self.require(name)?;
        Ok(self.entries.remove(index).1)
    }

    /// Set a parameter, inserting it at the end if it does not exist. No
    /// name checks; used for the reserved effect parameter.
    pub(crate) fn set(&mut self, name: &str, definition: ParameterDefinition) {
        match self.position(name) {
            Some(index) => self.entries[index].1 = definition,
            None => self.entries.push((name.to_string(), definition)),
        }
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.position(name).ok_or_else(|| {
            Error::validation_field(format!("no parameter named '{}'", name), "name")
        })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, definition) in &self.entries {
            map.serialize_entry(name, definition)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Parameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ParametersVisitor;

        impl<'de> Visitor<'de> for ParametersVisitor {
            type Value = Parameters;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter names to definitions")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Parameters, A::Error> {
                let mut parameters = Parameters::new();
                while let Some((name, definition)) =
                    access.next_entry::<String, ParameterDefinition>()?
                {
                    if parameters.contains(&name) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate parameter '{}'",
                            name
                        )));
                    }
                    parameters.entries.push((name, definition));
                }
                Ok(parameters)
            }
        }

        deserializer.deserialize_map(ParametersVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(parameter_type: ParameterType, allowed: &str, default: &str) -> ParameterForm {
        ParameterForm {
            parameter_type,
            display_name: "Test".to_string(),
            description: String::new(),
            allowed_values: allowed.to_string(),
            default_value: default.to_string(),
        }
    }

    #[test]
    fn test_effect_parameter_shape() {
        let def = ParameterDefinition::effect(Effect::Modify);
        assert_eq!(
            serde_json::to_value(&def).unwrap(),
            json!({
                "type": "String",
                "metadata": {
                    "displayName": "Effect",
                    "description": "Enable or disable the execution of the policy"
                },
                "allowedValues": ["Modify", "Disabled"],
                "defaultValue": "Modify"
            })
        );
    }

    #[test]
    fn test_parse_typed_values() {
        assert_eq!(ParameterType::Integer.parse_value(" 42 ").unwrap(), json!(42));
        assert_eq!(ParameterType::Float.parse_value("1.5").unwrap(), json!(1.5));
        assert_eq!(ParameterType::Boolean.parse_value("True").unwrap(), json!(true));
        assert_eq!(ParameterType::Array.parse_value("[1, 2]").unwrap(), json!([1, 2]));
        assert_eq!(
            ParameterType::DateTime.parse_value("2024-01-15T10:30:00Z").unwrap(),
            json!("2024-01-15T10:30:00Z")
        );
        assert!(ParameterType::Integer.parse_value("4.2").is_err());
        assert!(ParameterType::Boolean.parse_value("yes").is_err());
        assert!(ParameterType::Object.parse_value("[1]").is_err());
        assert!(ParameterType::DateTime.parse_value("yesterday").is_err());
    }

    #[test]
    fn test_parse_allowed_values() {
        assert_eq!(
            ParameterType::String.parse_allowed_values("eastus; westus").unwrap(),
            vec![json!("eastus"), json!("westus")]
        );
        assert_eq!(
            ParameterType::Integer.parse_allowed_values("[1, 2, 3]").unwrap(),
            vec![json!(1), json!(2), json!(3)]
        );
        assert!(ParameterType::Integer.parse_allowed_values("[1, \"x\"]").is_err());
        assert!(ParameterType::String.parse_allowed_values(" ; ").is_err());
    }

    #[test]
    fn test_from_form_reports_field() {
        let err = ParameterDefinition::from_form(&form(ParameterType::Integer, "1;x", "")).unwrap_err();
        assert_eq!(err.field(), Some("allowedValues"));

        let err = ParameterDefinition::from_form(&form(ParameterType::Integer, "", "x")).unwrap_err();
        assert_eq!(err.field(), Some("defaultValue"));

        let err = ParameterDefinition::from_form(&form(ParameterType::String, "a;b", "c")).unwrap_err();
        assert_eq!(err.field(), Some("defaultValue"));

        let def = ParameterDefinition::from_form(&form(ParameterType::String, "a;b", "b")).unwrap();
        assert_eq!(def.default_value, Some(json!("b")));
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("allowedLocations").is_ok());
        assert!(validate_name("tag_name2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("2fast").is_err());
        assert!(validate_name("has space").is_err());
    }

    #[test]
    fn test_parameters_keep_order_and_reject_duplicates() {
        let mut params = Parameters::with_effect(Effect::Audit);
        params
            .insert("tagName", ParameterDefinition::new(ParameterType::String, "Tag"))
            .unwrap();
        params
            .insert("allowed", ParameterDefinition::new(ParameterType::Array, "Allowed"))
            .unwrap();
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["effect", "tagName", "allowed"]);

        assert!(params
            .insert("TAGNAME", ParameterDefinition::new(ParameterType::String, "Tag"))
            .is_err());

        params
            .update("tagName", "tag", ParameterDefinition::new(ParameterType::String, "Tag"))
            .unwrap();
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["effect", "tag", "allowed"]);
        assert!(params
            .update("tag", "allowed", ParameterDefinition::new(ParameterType::String, "Tag"))
            .is_err());
    }

    #[test]
    fn test_parameters_serde_preserves_order() {
        let text = r#"{"zeta":{"type":"String","metadata":{"displayName":"Z","description":""}},"alpha":{"type":"Integer","metadata":{"displayName":"A","description":""},"defaultValue":1}}"#;
        let params: Parameters = serde_json::from_str(text).unwrap();
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(serde_json::to_string(&params).unwrap(), text);

        let dup = r#"{"a":{"type":"String"},"A":{"type":"String"}}"#;
        assert!(serde_json::from_str::<Parameters>(dup).is_err());
    }
}
