//! Computed style output of the cascade.

use css::{PropertyId, PropertyRegistry, Value};
use rustc_hash::FxHashMap;

// ─────────────────────────────────────────────────────────────────────────────
// ComputedStyle
// ─────────────────────────────────────────────────────────────────────────────

/// Final property values for one element.
///
/// Every registered property has an entry once the cascade has run: the
/// winning declaration's value after substitution, the parent's computed
/// value for inherited properties without a winner, or the registry initial.
/// Custom properties are kept as raw substituted text, since `var()` splices
/// text rather than typed values; the table already includes inherited
/// entries from the parent chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    values: FxHashMap<PropertyId, Value>,
    custom: FxHashMap<String, String>,
}

impl ComputedStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computed value of a property. `None` only before the cascade has
    /// filled the record.
    pub fn get(&self, property: PropertyId) -> Option<&Value> {
        self.values.get(&property)
    }

    pub fn set(&mut self, property: PropertyId, value: Value) {
        self.values.insert(property, value);
    }

    /// Computed value of a custom property (raw text), own or inherited.
    pub fn get_custom(&self, name: &str) -> Option<&str> {
        self.custom.get(name).map(String::as_str)
    }

    pub fn set_custom(&mut self, name: String, raw: String) {
        self.custom.insert(name, raw);
    }

    pub(crate) fn custom_table(&self) -> &FxHashMap<String, String> {
        &self.custom
    }

    pub(crate) fn set_custom_table(&mut self, table: FxHashMap<String, String>) {
        self.custom = table;
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &Value)> {
        self.values.iter().map(|(id, value)| (*id, value))
    }

    pub fn custom_properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.custom
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Serialise as declaration text, properties in registry order. Intended
    /// for debugging and tests.
    pub fn to_css_text(&self, registry: &PropertyRegistry) -> String {
        let mut out = String::new();
        let mut ids: Vec<PropertyId> = self.values.keys().copied().collect();
        ids.sort();
        for id in ids {
            if let Some(value) = self.values.get(&id) {
                out.push_str(registry.name(id));
                out.push_str(": ");
                out.push_str(&value.to_string());
                out.push_str(";\n");
            }
        }
        let mut names: Vec<&String> = self.custom.keys().collect();
        names.sort();
        for name in names {
            if let Some(value) = self.custom.get(name) {
                out.push_str(name);
                out.push_str(": ");
                out.push_str(value);
                out.push_str(";\n");
            }
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
