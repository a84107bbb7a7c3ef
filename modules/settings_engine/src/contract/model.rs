//! Contract models for the settings engine
//!
//! These models are transport-agnostic and shared by the store, the relevance
//! engine and storage adapters. Only `SettingValue` and `ValueType` carry serde
//! derives, since they are the only types that cross the persistence boundary.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Setting identifier, namespaced by convention (e.g. `"graphics.quality"`)
pub type SettingKey = String;

/// Current `key -> value` map of the store
///
/// Ordered so that iteration (and therefore every derived result) is deterministic.
pub type Snapshot = BTreeMap<SettingKey, SettingValue>;

/// A stored setting value
///
/// There is no null variant: absence is always represented by key absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Declared type of a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Number,
    Boolean,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

impl SettingValue {
    /// Type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Boolean,
            Self::Number(_) => ValueType::Number,
            Self::Text(_) => ValueType::Text,
        }
    }

    /// Truthiness used by `Relevance::DependsOn`
    ///
    /// `false`, `0`, `NaN` and the empty string are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Caller-supplied value check used by `Validator::Custom`
pub type ValueCheck = Arc<dyn Fn(&SettingValue) -> Result<(), String> + Send + Sync>;

/// Caller-supplied relevance predicate used by `Relevance::Custom`
///
/// Must be a pure function of the snapshot.
pub type SnapshotPredicate = Arc<dyn Fn(&Snapshot) -> bool + Send + Sync>;

/// Value validator attached to a definition
#[derive(Clone)]
pub enum Validator {
    /// Inclusive numeric range; either bound may be open
    Range { min: Option<f64>, max: Option<f64> },
    /// Text length bounds in characters
    Length { min: Option<usize>, max: Option<usize> },
    /// Value must equal one of the listed values
    OneOf(Vec<SettingValue>),
    /// Text must match the regular expression, compiled once up front
    Pattern(Regex),
    /// Value is checked as a JSON instance against this JSON Schema
    JsonSchema(serde_json::Value),
    /// Opaque check identified by `id` in diagnostics
    Custom { id: String, check: ValueCheck },
}

impl Validator {
    pub fn range(min: f64, max: f64) -> Self {
        Self::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Compile a pattern validator; fails on an invalid regular expression
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    pub fn custom<F>(id: impl Into<String>, check: F) -> Self
    where
        F: Fn(&SettingValue) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::Custom {
            id: id.into(),
            check: Arc::new(check),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range { min, max } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .finish(),
            Self::Length { min, max } => f
                .debug_struct("Length")
                .field("min", min)
                .field("max", max)
                .finish(),
            Self::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
            Self::Pattern(pattern) => f.debug_tuple("Pattern").field(&pattern.as_str()).finish(),
            Self::JsonSchema(schema) => f.debug_tuple("JsonSchema").field(schema).finish(),
            Self::Custom { id, .. } => f.debug_struct("Custom").field("id", id).finish(),
        }
    }
}

/// Relevance condition expressed as a small expression tree
///
/// Every variant except `Custom` names the keys it reads, so dependency
/// discovery walks the tree exactly. `Custom` predicates are opaque and are
/// never reported as dependencies.
#[derive(Clone)]
pub enum Relevance {
    /// The referenced value is present and truthy
    DependsOn(SettingKey),
    /// The referenced value is present and equal to the given value
    Equals(SettingKey, SettingValue),
    /// All children pass (true when empty)
    AllOf(Vec<Relevance>),
    /// At least one child passes (false when empty)
    AnyOf(Vec<Relevance>),
    Not(Box<Relevance>),
    Custom {
        id: String,
        predicate: SnapshotPredicate,
    },
}

impl Relevance {
    pub fn depends_on(key: impl Into<SettingKey>) -> Self {
        Self::DependsOn(key.into())
    }

    pub fn equals(key: impl Into<SettingKey>, value: impl Into<SettingValue>) -> Self {
        Self::Equals(key.into(), value.into())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Relevance) -> Self {
        Self::Not(Box::new(inner))
    }

    pub fn custom<F>(id: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Snapshot) -> bool + Send + Sync + 'static,
    {
        Self::Custom {
            id: id.into(),
            predicate: Arc::new(predicate),
        }
    }
}

impl fmt::Debug for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DependsOn(key) => f.debug_tuple("DependsOn").field(key).finish(),
            Self::Equals(key, value) => f.debug_tuple("Equals").field(key).field(value).finish(),
            Self::AllOf(children) => f.debug_tuple("AllOf").field(children).finish(),
            Self::AnyOf(children) => f.debug_tuple("AnyOf").field(children).finish(),
            Self::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Self::Custom { id, .. } => f.debug_struct("Custom").field("id", id).finish(),
        }
    }
}

/// Immutable declaration of a setting
#[derive(Debug, Clone)]
pub struct Definition {
    pub key: SettingKey,
    pub value_type: ValueType,
    pub default_value: SettingValue,
    pub validator: Option<Validator>,
    /// Definition-level relevance
    pub relevance: Option<Relevance>,
    pub label: Option<String>,
    pub description: Option<String>,
    /// Carried for future migrations, not interpreted
    pub version: Option<String>,
}

impl Definition {
    /// Create a definition whose type is taken from the default value
    pub fn new(key: impl Into<SettingKey>, default_value: impl Into<SettingValue>) -> Self {
        let default_value = default_value.into();
        Self {
            key: key.into(),
            value_type: default_value.value_type(),
            default_value,
            validator: None,
            relevance: None,
            label: None,
            description: None,
            version: None,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_relevance(mut self, relevance: Relevance) -> Self {
        self.relevance = Some(relevance);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Reference to a definition inside a presentation grouping
#[derive(Debug, Clone)]
pub struct StructureItem {
    pub key: SettingKey,
    pub label: Option<String>,
    pub description: Option<String>,
    /// Structure-level relevance, ANDed with the definition's own
    pub relevance: Option<Relevance>,
}

impl StructureItem {
    pub fn new(key: impl Into<SettingKey>) -> Self {
        Self {
            key: key.into(),
            label: None,
            description: None,
            relevance: None,
        }
    }

    pub fn with_relevance(mut self, relevance: Relevance) -> Self {
        self.relevance = Some(relevance);
        self
    }
}

/// Presentation grouping (tab, group); groupings nest
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    pub id: String,
    pub label: String,
    pub items: Vec<StructureItem>,
    pub groupings: Vec<Grouping>,
}

impl Grouping {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            items: Vec::new(),
            groupings: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: StructureItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.groupings.push(grouping);
        self
    }
}

/// Presentation structure of a configuration
#[derive(Debug, Clone, Default)]
pub struct Structure {
    pub groupings: Vec<Grouping>,
}

impl Structure {
    pub fn new(groupings: Vec<Grouping>) -> Self {
        Self { groupings }
    }

    /// Visit every structure item depth-first, in declaration order, together
    /// with the grouping ids leading to it
    pub fn for_each_item<'a>(&'a self, mut visit: impl FnMut(&'a StructureItem, &[String])) {
        fn walk<'a>(
            grouping: &'a Grouping,
            path: &mut Vec<String>,
            visit: &mut dyn FnMut(&'a StructureItem, &[String]),
        ) {
            path.push(grouping.id.clone());
            for item in &grouping.items {
                visit(item, path);
            }
            for child in &grouping.groupings {
                walk(child, path, visit);
            }
            path.pop();
        }

        let mut path = Vec::new();
        for grouping in &self.groupings {
            walk(grouping, &mut path, &mut visit);
        }
    }

    /// All structure items in declaration order
    pub fn items(&self) -> Vec<&StructureItem> {
        let mut out = Vec::new();
        self.for_each_item(|item, _| out.push(item));
        out
    }

    /// All structure items referencing `key`
    pub fn items_for<'a>(&'a self, key: &str) -> Vec<&'a StructureItem> {
        self.items().into_iter().filter(|item| item.key == key).collect()
    }
}

/// Runtime record of a setting inside the store
#[derive(Debug, Clone)]
pub struct Controller {
    pub definition: Definition,
    /// Resolved display label (definition, then structure item, then key)
    pub label: String,
    pub description: Option<String>,
    /// Grouping ids from the root of the structure to the item
    pub path: Vec<String>,
}

impl Controller {
    /// Build a controller from a definition alone
    pub fn from_definition(definition: Definition) -> Self {
        let label = definition
            .label
            .clone()
            .unwrap_or_else(|| definition.key.clone());
        let description = definition.description.clone();
        Self {
            definition,
            label,
            description,
            path: Vec::new(),
        }
    }

    /// Build a controller resolving display metadata from the structure
    pub fn resolve(definition: Definition, structure: &Structure) -> Self {
        let mut controller = Self::from_definition(definition);
        let mut located = None;
        structure.for_each_item(|item, path| {
            if located.is_none() && item.key == controller.definition.key {
                located = Some((item.clone(), path.to_vec()));
            }
        });
        if let Some((item, path)) = located {
            if controller.definition.label.is_none() {
                if let Some(label) = item.label {
                    controller.label = label;
                }
            }
            if controller.description.is_none() {
                controller.description = item.description;
            }
            controller.path = path;
        }
        controller
    }

    pub fn key(&self) -> &str {
        &self.definition.key
    }

    pub fn default_value(&self) -> &SettingValue {
        &self.definition.default_value
    }
}

/// Definitions plus their presentation structure, as produced by an assembler
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub definitions: Vec<Definition>,
    pub structure: Structure,
}

impl Configuration {
    pub fn new(definitions: Vec<Definition>, structure: Structure) -> Self {
        Self {
            definitions,
            structure,
        }
    }

    pub fn definition(&self, key: &str) -> Option<&Definition> {
        self.definitions.iter().find(|d| d.key == key)
    }
}
