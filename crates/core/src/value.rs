// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Algebraic value type for rule evidence and conditions.
//!
//! Replaces the source system's `any`-typed evidence/condition fields (see
//! REDESIGN FLAGS) with a closed, serializable value domain over which
//! field-path resolution is total: every path either resolves to a `Value`
//! or resolves to nothing, never panics.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A bounded, recursively-nested value.
///
/// `Null | Bool | Int | Float | Str | List | Map`, matching the domain
/// scanners extract CM data into and rules compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Substring match for strings, membership match for lists/maps.
    ///
    /// A `Map` is searched by value, not by key, matching the spec's
    /// "membership for sequences/sets" wording.
    pub fn contains(&self, needle: &Value) -> bool {
        match self {
            Value::Str(haystack) => match needle.as_str() {
                Some(n) => haystack.contains(n),
                None => false,
            },
            Value::List(items) => items.contains(needle),
            Value::Map(entries) => entries.values().any(|v| v == needle),
            _ => false,
        }
    }

    /// Resolve a dotted field path against this value.
    ///
    /// Path segments address map keys; an all-digit segment also indexes
    /// into a `List`. Resolution never panics and returns `None` on any
    /// missing segment or type mismatch — this is the total function the
    /// Rule Engine's `exists`/`not-exists` operators depend on.
    pub fn resolve_path(&self, path: &str) -> Option<&Value> {
        let mut cur = self;
        for segment in path.split('.') {
            cur = match cur {
                Value::Map(m) => m.get(segment)?,
                Value::List(items) => {
                    let idx: usize = segment.parse().ok()?;
                    items.get(idx)?
                }
                _ => return None,
            };
        }
        Some(cur)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(_) | Value::Map(_) => {
                write!(f, "{}", serde_json::to_string(self).unwrap_or_default())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

/// Build a `Value::Map` from a list of dotted paths the way scanners emit
/// extraction data (`"performance.cpu_percent" -> Value::Float(92.0)`).
pub fn map_from_paths(entries: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Value {
    let mut root = IndexMap::new();
    for (path, value) in entries {
        insert_path(&mut root, &path.into(), value);
    }
    Value::Map(root)
}

fn insert_path(root: &mut IndexMap<String, Value>, path: &str, value: Value) {
    let mut parts = path.splitn(2, '.');
    let head = parts.next().unwrap_or(path);
    match parts.next() {
        None => {
            root.insert(head.to_string(), value);
        }
        Some(rest) => {
            let entry = root
                .entry(head.to_string())
                .or_insert_with(|| Value::Map(IndexMap::new()));
            if let Value::Map(m) = entry {
                insert_path(m, rest, value);
            } else {
                *entry = Value::Map(IndexMap::new());
                if let Value::Map(m) = entry {
                    insert_path(m, rest, value);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
