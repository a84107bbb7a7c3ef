//! Configuration builder
//!
//! A closed set of builder states, each exposing only the operations valid in
//! that state:
//!
//! ```text
//! ConfigBuilder --tab()--> TabBuilder --group()--> GroupBuilder
//!       ^                  |    ^                  |
//!       +------end()-------+    +------end()-------+
//! TabBuilder / GroupBuilder --setting()--> SettingBuilder --done()?--> parent
//! ```
//!
//! `SettingBuilder::done` fails fast with `IncompleteDefinition` or
//! `InvalidDefinition` naming the offending key. The builder has no engine
//! `Config`, so defaults are always checked against JSON Schema validators
//! here; `Store::initialize` re-checks them honoring `enable_schema_validation`.

use super::validation::{check_consistency, validate_definition};
use crate::contract::{
    Configuration, Definition, Grouping, Relevance, SettingKey, SettingValue, SettingsError,
    Structure, StructureItem, Validator, ValueType,
};

impl Configuration {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Root builder state
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    definitions: Vec<Definition>,
    groupings: Vec<Grouping>,
}

impl ConfigBuilder {
    /// Open a top-level grouping
    pub fn tab(self, id: impl Into<String>, label: impl Into<String>) -> TabBuilder {
        TabBuilder {
            parent: self,
            grouping: Grouping::new(id, label),
        }
    }

    /// Add a definition without a presentation entry
    pub fn definition(mut self, definition: Definition) -> Result<Self, SettingsError> {
        validate_definition(&definition, true)?;
        self.definitions.push(definition);
        Ok(self)
    }

    /// Finish the configuration; consistency problems are logged, not returned
    pub fn build(self) -> Configuration {
        let configuration = Configuration::new(self.definitions, Structure::new(self.groupings));
        check_consistency(&configuration).log();
        configuration
    }
}

/// Top-level grouping state
#[derive(Debug)]
pub struct TabBuilder {
    parent: ConfigBuilder,
    grouping: Grouping,
}

impl TabBuilder {
    /// Open a nested grouping
    pub fn group(self, id: impl Into<String>, label: impl Into<String>) -> GroupBuilder {
        GroupBuilder {
            parent: self,
            grouping: Grouping::new(id, label),
        }
    }

    pub fn setting(self, key: impl Into<SettingKey>) -> SettingBuilder<Self> {
        SettingBuilder::new(self, key.into())
    }

    /// Close the grouping and return to the root
    pub fn end(mut self) -> ConfigBuilder {
        self.parent.groupings.push(self.grouping);
        self.parent
    }
}

/// Nested grouping state
#[derive(Debug)]
pub struct GroupBuilder {
    parent: TabBuilder,
    grouping: Grouping,
}

impl GroupBuilder {
    pub fn setting(self, key: impl Into<SettingKey>) -> SettingBuilder<Self> {
        SettingBuilder::new(self, key.into())
    }

    /// Close the group and return to its tab
    pub fn end(mut self) -> TabBuilder {
        self.parent.grouping.groupings.push(self.grouping);
        self.parent
    }
}

/// Builder states that can own settings
pub trait SettingParent: Sized {
    #[doc(hidden)]
    fn attach(self, definition: Definition, item: StructureItem) -> Self;
}

impl SettingParent for TabBuilder {
    fn attach(mut self, definition: Definition, item: StructureItem) -> Self {
        self.parent.definitions.push(definition);
        self.grouping.items.push(item);
        self
    }
}

impl SettingParent for GroupBuilder {
    fn attach(mut self, definition: Definition, item: StructureItem) -> Self {
        self.parent.parent.definitions.push(definition);
        self.grouping.items.push(item);
        self
    }
}

/// Setting state; `done` returns to the owning grouping
#[derive(Debug)]
pub struct SettingBuilder<P> {
    parent: P,
    key: SettingKey,
    value_type: Option<ValueType>,
    default_value: Option<SettingValue>,
    validator: Option<Validator>,
    relevance: Option<Relevance>,
    visible_when: Option<Relevance>,
    label: Option<String>,
    description: Option<String>,
    version: Option<String>,
}

impl<P: SettingParent> SettingBuilder<P> {
    fn new(parent: P, key: SettingKey) -> Self {
        Self {
            parent,
            key,
            value_type: None,
            default_value: None,
            validator: None,
            relevance: None,
            visible_when: None,
            label: None,
            description: None,
            version: None,
        }
    }

    /// Boolean setting with a default
    pub fn boolean(self, default: bool) -> Self {
        self.typed(ValueType::Boolean, default.into())
    }

    /// Number setting with a default
    pub fn number(self, default: f64) -> Self {
        self.typed(ValueType::Number, default.into())
    }

    /// Text setting with a default
    pub fn text(self, default: impl Into<String>) -> Self {
        self.typed(ValueType::Text, SettingValue::Text(default.into()))
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn default_value(mut self, value: impl Into<SettingValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Definition-level relevance
    pub fn relevant_when(mut self, relevance: Relevance) -> Self {
        self.relevance = Some(relevance);
        self
    }

    /// Structure-level relevance of this presentation entry
    pub fn visible_when(mut self, relevance: Relevance) -> Self {
        self.visible_when = Some(relevance);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Complete the setting and return to the owning grouping
    pub fn done(self) -> Result<P, SettingsError> {
        let mut missing = Vec::new();
        if self.key.trim().is_empty() {
            missing.push("key");
        }
        if self.value_type.is_none() {
            missing.push("type");
        }
        if self.default_value.is_none() {
            missing.push("default value");
        }

        let (Some(value_type), Some(default_value), true) =
            (self.value_type, self.default_value, missing.is_empty())
        else {
            return Err(SettingsError::IncompleteDefinition {
                key: self.key,
                missing: missing.join(", "),
            });
        };

        let definition = Definition {
            key: self.key.clone(),
            value_type,
            default_value,
            validator: self.validator,
            relevance: self.relevance,
            label: self.label.clone(),
            description: self.description.clone(),
            version: self.version,
        };
        validate_definition(&definition, true)?;

        let item = StructureItem {
            key: self.key,
            label: self.label,
            description: self.description,
            relevance: self.visible_when,
        };
        Ok(self.parent.attach(definition, item))
    }

    fn typed(mut self, value_type: ValueType, default: SettingValue) -> Self {
        self.value_type = Some(value_type);
        self.default_value = Some(default);
        self
    }
}
