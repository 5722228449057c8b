use indexmap::IndexMap;
use serde::Serialize;
use strum::{Display, EnumString};

use super::catalog;
use super::coerce::Coercion;
use super::path::FieldPath;
use crate::config::ModuleVariant;

/// Hardware module a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FieldModule {
    Base,
    H1,
    Sec,
}

/// Unit of measurement reported with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum Unit {
    #[strum(to_string = "W")]
    #[serde(rename = "W")]
    Watt,
    #[strum(to_string = "kWh")]
    #[serde(rename = "kWh")]
    KilowattHour,
    #[strum(to_string = "%")]
    #[serde(rename = "%")]
    Percent,
    #[strum(to_string = "A⋅h")]
    #[serde(rename = "A⋅h")]
    AmpereHour,
}

/// Where a field lives in the aggregate document and how to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub key: String,
    pub path: FieldPath,
    pub coercion: Coercion,
    pub module: FieldModule,
    pub unit: Option<Unit>,
}

impl FieldSpec {
    pub fn new(key: impl Into<String>, path: FieldPath, coercion: Coercion, module: FieldModule) -> Self {
        Self {
            key: key.into(),
            path,
            coercion,
            module,
            unit: None,
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// The ordered set of fields one snapshot carries, at most one spec per key.
#[derive(Debug, Clone, Default)]
pub struct FieldSchema {
    fields: IndexMap<String, FieldSpec>,
}

impl FieldSchema {
    /// Build a schema from specs. A later spec replaces an earlier one with
    /// the same key but keeps its position.
    pub fn new(specs: impl IntoIterator<Item = FieldSpec>) -> Self {
        let mut fields = IndexMap::new();
        for spec in specs {
            fields.insert(spec.key.clone(), spec);
        }
        Self { fields }
    }

    /// Every built-in field a plant of `variant` reports.
    ///
    /// Module fields override base fields of the same name: an SEC plant
    /// reads `selfUseRate` from the meter detail, not the plant detail.
    pub fn for_variant(variant: ModuleVariant, plant_index: usize) -> Self {
        let modules = variant.modules();
        Self::new(
            modules
                .iter()
                .flat_map(|module| catalog::fields(*module, plant_index)),
        )
    }

    /// Keep only `keys`, in schema order. Returns the keys that matched no
    /// field so the caller can report them.
    pub fn retain_keys(&mut self, keys: &[String]) -> Vec<String> {
        let unknown = keys
            .iter()
            .filter(|k| !self.fields.contains_key(k.as_str()))
            .cloned()
            .collect();
        self.fields.retain(|key, _| keys.iter().any(|k| k == key));
        unknown
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
