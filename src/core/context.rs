//! Ordered ambient context merged into every request.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::error::LlmError;
use super::types::Message;

/// A single context value: plain text or a structured JSON record.
///
/// Text values reach the model as JSON strings; records keep their canonical
/// JSON representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Text(String),
    Record(Value),
}

impl ContextValue {
    pub fn text(text: impl Into<String>) -> Self {
        ContextValue::Text(text.into())
    }

    /// Build a record value from anything serializable.
    pub fn record(value: impl Serialize) -> Result<Self, LlmError> {
        let value = serde_json::to_value(value).map_err(|e| LlmError::Parse {
            message: "Failed to serialize context record".to_string(),
            source: Box::new(e),
        })?;
        Ok(ContextValue::Record(value))
    }

    /// Null-equivalent values are dropped when applied as per-call overrides.
    fn is_null_or_empty(&self) -> bool {
        match self {
            ContextValue::Text(text) => text.is_empty(),
            ContextValue::Record(record) => record.is_null(),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(text: &str) -> Self {
        ContextValue::Text(text.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(text: String) -> Self {
        ContextValue::Text(text)
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        ContextValue::Record(value)
    }
}

/// Ordered key/value store presented to the model as background information.
///
/// Insertion order is preserved and is exactly the presentation order in the
/// system message. Re-inserting an existing key updates its value in place
/// without moving it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    entries: Vec<(String, ContextValue)>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable insert, for building contexts in one expression.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or update an entry. Existing keys keep their position; new keys
    /// are appended.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove an entry if present. Absent keys are a no-op.
    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into `self`: repeated keys update in place, new keys
    /// append, untouched keys keep their order.
    pub fn merge(&mut self, other: &Context) {
        for (key, value) in &other.entries {
            self.insert(key.clone(), value.clone());
        }
    }

    /// Merged view of this context with per-call overrides applied. Overrides
    /// with empty text or null values are dropped rather than serialized as
    /// empty context.
    pub(crate) fn merged_with(&self, overrides: &Context) -> Context {
        let mut merged = self.clone();
        for (key, value) in &overrides.entries {
            if value.is_null_or_empty() {
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Pretty-printed JSON in entry order.
    pub(crate) fn to_pretty_json(&self) -> Result<String, LlmError> {
        serde_json::to_string_pretty(self).map_err(|e| LlmError::Parse {
            message: "Failed to serialize context".to_string(),
            source: Box::new(e),
        })
    }
}

// Serializes as a JSON map in entry order. The serializer streams entries, so
// ordering survives without a map type that tracks insertion order.
impl Serialize for Context {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            match value {
                ContextValue::Text(text) => map.serialize_entry(key, text)?,
                ContextValue::Record(record) => map.serialize_entry(key, record)?,
            }
        }
        map.end()
    }
}

/// Assemble the message payload for one request: an optional system message
/// carrying the merged context as pretty JSON, followed by the caller's
/// message parts in the order given.
pub(crate) fn build_messages(
    ambient: &Context,
    overrides: &Context,
    parts: &[Message],
) -> Result<Vec<Message>, LlmError> {
    let merged = ambient.merged_with(overrides);

    let mut messages = Vec::with_capacity(parts.len() + 1);
    if !merged.is_empty() {
        messages.push(Message::system(merged.to_pretty_json()?));
    }
    messages.extend(parts.iter().cloned());
    Ok(messages)
}
