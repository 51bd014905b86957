//! Policy document parsing and management.

use super::action::{Effect, ModifyDetails, PolicyAction};
use super::metadata::{PolicyMetadata, PolicyMode};
use super::parameter::{validate_name, ParameterDefinition, Parameters, EFFECT_PARAMETER};
use super::tree::ConditionTree;
use crate::error::ErrorContext;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Template expression binding `then.effect` to the effect parameter.
pub const EFFECT_REFERENCE: &str = "[parameters('effect')]";

/// A complete custom policy definition.
///
/// Serializes to the Azure Policy definition format, with `then.effect`
/// bound to the reserved `effect` parameter whose `defaultValue` records the
/// selected effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DocumentWire", into = "DocumentWire")]
pub struct PolicyDocument {
    /// Display metadata
    pub metadata: PolicyMetadata,
    /// Parameters, always including `effect`
    pub parameters: Parameters,
    /// The `if` clause
    pub condition: ConditionTree,
    /// The `then` clause
    pub action: PolicyAction,
}

impl PolicyDocument {
    /// The session-start template: empty allOf root, Audit, only the effect parameter.
    pub fn new() -> Self {
        Self::from_template(PolicyMetadata::default(), Effect::Audit)
    }

    /// A template document with the given metadata and initial effect.
    pub fn from_template(metadata: PolicyMetadata, effect: Effect) -> Self {
        Self {
            metadata,
            parameters: Parameters::with_effect(effect),
            condition: ConditionTree::empty(),
            action: PolicyAction::new(effect),
        }
    }

    /// The selected effect.
    pub fn effect(&self) -> Effect {
        self.action.effect
    }

    /// Select an effect, keeping the effect parameter and details block in step.
    pub fn set_effect(&mut self, effect: Effect) {
        self.action.set_effect(effect);

        let mut definition = self
            .parameters
            .effect()
            .cloned()
            .unwrap_or_else(|| ParameterDefinition::effect(effect));
        let template = ParameterDefinition::effect(effect);
        definition.allowed_values = template.allowed_values;
        definition.default_value = template.default_value;
        self.parameters.set(EFFECT_PARAMETER, definition);
    }

    /// Parse a policy document from JSON and check its invariants.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    /// Load a policy document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Convert the document to pretty JSON with 2-space indentation.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::from)
    }

    /// Superficial consistency checks; not a validation against the Azure schema.
    pub fn validate(&self) -> Result<()> {
        self.condition.root().validate().with_field("if")?;

        let effect = self.effect();
        let definition = self.parameters.effect().ok_or_else(|| {
            Error::validation_field("the 'effect' parameter is missing", "parameters")
        })?;
        let expected = ParameterDefinition::effect(effect);
        if definition.allowed_values != expected.allowed_values {
            return Err(Error::validation_field(
                format!(
                    "the 'effect' parameter's allowed values do not match the {} effect",
                    effect
                ),
                "parameters.effect.allowedValues",
            ));
        }
        if definition.default_value != expected.default_value {
            return Err(Error::validation_field(
                format!("the 'effect' parameter's default value must be {}", effect),
                "parameters.effect.defaultValue",
            ));
        }

        for (name, definition) in self.parameters.iter() {
            if !name.eq_ignore_ascii_case(EFFECT_PARAMETER) {
                validate_name(name)?;
            }
            definition.validate()?;
        }

        match (&self.action.details, effect.has_details()) {
            (Some(details), true) => details.validate()?,
            (None, false) => {}
            (Some(_), false) => {
                return Err(Error::validation_field(
                    format!("the {} effect cannot have details", effect),
                    "details",
                ))
            }
            (None, true) => {
                return Err(Error::validation_field(
                    "the Modify effect requires details",
                    "details",
                ))
            }
        }

        Ok(())
    }
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Deserialize)]
struct DocumentWire {
    properties: PropertiesWire,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertiesWire {
    #[serde(default)]
    display_name: String,
    #[serde(default = "custom_policy_type")]
    policy_type: String,
    #[serde(default)]
    mode: PolicyMode,
    #[serde(default)]
    description: String,
    #[serde(default)]
    metadata: MetadataWire,
    #[serde(default)]
    parameters: Parameters,
    policy_rule: RuleWire,
}

fn custom_policy_type() -> String {
    "Custom".to_string()
}

#[derive(Default, Serialize, Deserialize)]
struct MetadataWire {
    #[serde(default)]
    category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RuleWire {
    #[serde(rename = "if")]
    condition: ConditionTree,
    then: ThenWire,
}

#[derive(Serialize, Deserialize)]
struct ThenWire {
    effect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<ModifyDetails>,
}

impl From<PolicyDocument> for DocumentWire {
    fn from(document: PolicyDocument) -> Self {
        let PolicyDocument {
            metadata,
            parameters,
            condition,
            action,
        } = document;

        DocumentWire {
            properties: PropertiesWire {
                display_name: metadata.display_name,
                policy_type: custom_policy_type(),
                mode: metadata.mode,
                description: metadata.description,
                metadata: MetadataWire {
                    category: metadata.category,
                    version: metadata.version,
                },
                parameters,
                policy_rule: RuleWire {
                    condition,
                    then: ThenWire {
                        effect: EFFECT_REFERENCE.to_string(),
                        details: action.details,
                    },
                },
            },
        }
    }
}

impl TryFrom<DocumentWire> for PolicyDocument {
    type Error = Error;

    fn try_from(wire: DocumentWire) -> Result<Self> {
        let properties = wire.properties;
        let then = properties.policy_rule.then;

        let effect = if then.effect.replace(' ', "") == EFFECT_REFERENCE {
            let default = properties
                .parameters
                .effect()
                .ok_or_else(|| Error::parse("then.effect refers to a missing 'effect' parameter"))?
                .default_value
                .as_ref()
                .and_then(Value::as_str)
                .ok_or_else(|| Error::parse("the 'effect' parameter has no string default value"))?;
            default.parse::<Effect>()?
        } else {
            then.effect.parse::<Effect>()?
        };

        if !properties.parameters.contains(EFFECT_PARAMETER) {
            return Err(Error::parse("the 'effect' parameter is missing"));
        }

        Ok(PolicyDocument {
            metadata: PolicyMetadata {
                display_name: properties.display_name,
                description: properties.description,
                category: properties.metadata.category,
                mode: properties.mode,
                version: properties.metadata.version,
            },
            parameters: properties.parameters,
            condition: properties.policy_rule.condition,
            action: PolicyAction {
                effect,
                details: then.details,
            },
        })
    }
}
