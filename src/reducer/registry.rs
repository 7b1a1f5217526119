//! Reducer registry
//!
//! Deal types are resolved through an explicit table built once at startup
//! and handed by reference to whatever receives reduce messages. The set of
//! supported deal names is therefore enumerable and testable on its own.

use std::collections::BTreeMap;

use serde_json::Value;

use super::deal::{DealSpec, SortDeal, UNLIMITED};
use super::errors::{ReduceError, ReduceResult};

/// Builds a deal from its JSON descriptor
pub type DealFactory = fn(&Value) -> ReduceResult<DealSpec>;

const BUILTIN_DEALS: &[(&str, DealFactory)] = &[
    ("and", build_and),
    ("average", build_average),
    ("or", build_or),
    ("sort", build_sort),
    ("sum", build_sum),
];

fn build_and(_: &Value) -> ReduceResult<DealSpec> {
    Ok(DealSpec::And)
}

fn build_or(_: &Value) -> ReduceResult<DealSpec> {
    Ok(DealSpec::Or)
}

fn build_average(_: &Value) -> ReduceResult<DealSpec> {
    Ok(DealSpec::Average)
}

fn build_sum(descriptor: &Value) -> ReduceResult<DealSpec> {
    let limit = match descriptor.get("limit") {
        None | Some(Value::Null) => UNLIMITED,
        Some(value) => value
            .as_i64()
            .ok_or_else(|| ReduceError::InvalidDeal(format!("sum: limit {} is not an integer", value)))?,
    };
    Ok(DealSpec::Sum { limit })
}

fn build_sort(descriptor: &Value) -> ReduceResult<DealSpec> {
    let sort: SortDeal = serde_json::from_value(descriptor.clone())
        .map_err(|e| ReduceError::InvalidDeal(format!("sort: {}", e)))?;
    Ok(DealSpec::Sort(sort))
}

/// Table of deal factories keyed by type name
#[derive(Debug, Clone)]
pub struct ReducerRegistry {
    factories: BTreeMap<&'static str, DealFactory>,
}

impl ReducerRegistry {
    /// Creates a registry with no deal types
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Creates a registry with the built-in deal types
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (name, factory) in BUILTIN_DEALS {
            registry.register(*name, *factory);
        }
        registry
    }

    /// Registers a factory, replacing any previous one with the same name
    pub fn register(&mut self, name: &'static str, factory: DealFactory) {
        self.factories.insert(name, factory);
    }

    /// Returns the registered type names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Resolves a `{"type": ..., ...}` descriptor into a deal
    pub fn resolve(&self, descriptor: &Value) -> ReduceResult<DealSpec> {
        let type_name = descriptor
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ReduceError::InvalidDeal(format!("{} has no \"type\"", descriptor)))?;
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| ReduceError::UnknownReduceType(type_name.to_string()))?;
        factory(descriptor)
    }
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
