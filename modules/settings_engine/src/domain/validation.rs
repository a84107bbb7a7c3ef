//! Definition and value validation
//!
//! Definitions are checked once when a configuration is assembled or
//! initialized; values are checked on every write.

use crate::contract::{Configuration, Definition, SettingValue, SettingsError, Validator};
use jsonschema::Validator as SchemaValidator;
use std::collections::BTreeSet;

/// Validate a setting key
///
/// Keys only need to be non-blank; the dotted namespace is a convention.
pub fn validate_key(key: &str) -> Result<(), SettingsError> {
    if key.trim().is_empty() {
        return Err(SettingsError::IncompleteDefinition {
            key: key.to_string(),
            missing: "key".to_string(),
        });
    }
    Ok(())
}

/// Validate a complete definition
///
/// The default must have the declared type and satisfy the validator.
/// `schema_validation` gates the JSON Schema check of the default, as it does
/// for `validate_value`.
pub fn validate_definition(
    definition: &Definition,
    schema_validation: bool,
) -> Result<(), SettingsError> {
    validate_key(&definition.key)?;

    validate_value(definition, &definition.default_value, schema_validation).map_err(|e| {
        SettingsError::InvalidDefinition {
            key: definition.key.clone(),
            reason: format!("default value {} is invalid: {e}", definition.default_value),
        }
    })
}

/// Validate a candidate value against its definition
///
/// `schema_validation` gates `Validator::JsonSchema` checks.
pub fn validate_value(
    definition: &Definition,
    value: &SettingValue,
    schema_validation: bool,
) -> Result<(), SettingsError> {
    let key = &definition.key;
    if value.value_type() != definition.value_type {
        return Err(SettingsError::TypeMismatch {
            key: key.clone(),
            expected: definition.value_type,
            actual: value.value_type(),
        });
    }

    // Non-finite numbers have no JSON encoding and could never be persisted
    if value.as_f64().is_some_and(|n| !n.is_finite()) {
        return Err(SettingsError::Validation {
            key: key.clone(),
            message: "value must be a finite number".to_string(),
        });
    }

    let Some(validator) = &definition.validator else {
        return Ok(());
    };

    let invalid = |message: String| SettingsError::Validation {
        key: key.clone(),
        message,
    };

    match validator {
        Validator::Range { min, max } => {
            let n = value
                .as_f64()
                .ok_or_else(|| invalid("range validator requires a number".to_string()))?;
            if let Some(min) = min {
                if n < *min {
                    return Err(invalid(format!("{n} is below the minimum {min}")));
                }
            }
            if let Some(max) = max {
                if n > *max {
                    return Err(invalid(format!("{n} is above the maximum {max}")));
                }
            }
        }
        Validator::Length { min, max } => {
            let len = value
                .as_str()
                .ok_or_else(|| invalid("length validator requires text".to_string()))?
                .chars()
                .count();
            if let Some(min) = min {
                if len < *min {
                    return Err(invalid(format!("length {len} is below the minimum {min}")));
                }
            }
            if let Some(max) = max {
                if len > *max {
                    return Err(invalid(format!("length {len} is above the maximum {max}")));
                }
            }
        }
        Validator::OneOf(allowed) => {
            if !allowed.contains(value) {
                let allowed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                return Err(invalid(format!(
                    "{value} is not one of [{}]",
                    allowed.join(", ")
                )));
            }
        }
        Validator::Pattern(re) => {
            let text = value
                .as_str()
                .ok_or_else(|| invalid("pattern validator requires text".to_string()))?;
            if !re.is_match(text) {
                return Err(invalid(format!("{value} does not match /{}/", re.as_str())));
            }
        }
        Validator::JsonSchema(schema) => {
            if schema_validation {
                let instance = serde_json::to_value(value)
                    .map_err(|e| SettingsError::Internal(e.to_string()))?;
                validate_against_schema(key, &instance, schema)?;
            }
        }
        Validator::Custom { id, check } => {
            check(value).map_err(|message| invalid(format!("{message} ({id})")))?;
        }
    }

    Ok(())
}

/// Validate a JSON instance against a JSON Schema
pub fn validate_against_schema(
    key: &str,
    data: &serde_json::Value,
    schema: &serde_json::Value,
) -> Result<(), SettingsError> {
    let validator = SchemaValidator::new(schema).map_err(|e| SettingsError::InvalidDefinition {
        key: key.to_string(),
        reason: format!("Invalid JSON Schema: {e}"),
    })?;

    if let Err(error) = validator.validate(data) {
        return Err(SettingsError::SchemaValidation {
            key: key.to_string(),
            errors: vec![error.to_string()],
        });
    }

    Ok(())
}

/// Referential integrity diagnostics of a configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Keys referenced by the structure without a definition
    pub missing: BTreeSet<String>,
    /// Definitions not referenced by any structure item
    pub unused: BTreeSet<String>,
    /// Keys defined more than once
    pub duplicates: BTreeSet<String>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unused.is_empty() && self.duplicates.is_empty()
    }

    /// Emit one warning per diagnostic; never fails
    pub fn log(&self) {
        for key in &self.missing {
            tracing::warn!(%key, "structure references a setting without a definition");
        }
        for key in &self.unused {
            tracing::warn!(%key, "definition is not referenced by the structure");
        }
        for key in &self.duplicates {
            tracing::warn!(%key, "setting is defined more than once; the last definition wins");
        }
    }
}

/// Compare the definitions of a configuration with its structure
pub fn check_consistency(configuration: &Configuration) -> ConsistencyReport {
    let mut defined = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for definition in &configuration.definitions {
        if !defined.insert(definition.key.clone()) {
            duplicates.insert(definition.key.clone());
        }
    }

    let referenced: BTreeSet<String> = configuration
        .structure
        .items()
        .into_iter()
        .map(|item| item.key.clone())
        .collect();

    ConsistencyReport {
        missing: referenced.difference(&defined).cloned().collect(),
        unused: defined.difference(&referenced).cloned().collect(),
        duplicates,
    }
}
