//! Schema projection for structured-output requests.
//!
//! A target shape is either [`Single<T>`] or [`ListOf<T>`], chosen explicitly
//! by the caller. The wire schema is always a single top-level JSON object:
//! the list case is projected onto a synthetic `{"items": [...]}` wrapper
//! before transmission and unwrapped after receipt, because the structured-
//! output contract never accepts a bare array.

use std::marker::PhantomData;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::chat::request::ResponseFormat;
use crate::constants;
use crate::core::error::LlmError;

/// Which structured-output request shape the backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaDialect {
    /// `{"type": "json_schema", "json_schema": {"name": ..., "schema": ...}}`
    JsonSchema,
    /// `{"type": "json_object", "schema": ...}`
    JsonObject,
}

impl SchemaDialect {
    /// Default dialect for a base URL: the known alternate backends take the
    /// embedded form, everything else the named form. Callers can bypass this
    /// detection entirely by configuring the dialect explicitly.
    pub fn for_base_url(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        if constants::JSON_OBJECT_BASE_URLS.contains(&base_url) {
            SchemaDialect::JsonObject
        } else {
            SchemaDialect::JsonSchema
        }
    }
}

/// A structured-output target shape with its schema and decoding routine.
pub trait StructuredTarget {
    type Output;

    /// Response-format payload announcing the target schema.
    fn response_format(dialect: SchemaDialect) -> Result<ResponseFormat, LlmError>;

    /// Decode the raw JSON text the endpoint returned.
    fn decode(raw: &str) -> Result<Self::Output, LlmError>;
}

/// Marker for "one record of type `T`".
pub struct Single<T>(PhantomData<T>);

/// Marker for "an ordered list of records of type `T`".
pub struct ListOf<T>(PhantomData<T>);

impl<T> StructuredTarget for Single<T>
where
    T: JsonSchema + DeserializeOwned,
{
    type Output = T;

    fn response_format(dialect: SchemaDialect) -> Result<ResponseFormat, LlmError> {
        let (name, schema) = named_schema_for::<T>()?;
        Ok(format_from_parts(dialect, name, schema))
    }

    fn decode(raw: &str) -> Result<T, LlmError> {
        serde_json::from_str(raw).map_err(|e| LlmError::Parse {
            message: "Failed to decode structured output".to_string(),
            source: Box::new(e),
        })
    }
}

#[derive(Deserialize)]
struct ItemsEnvelope<T> {
    items: Vec<T>,
}

impl<T> StructuredTarget for ListOf<T>
where
    T: JsonSchema + DeserializeOwned,
{
    type Output = Vec<T>;

    fn response_format(dialect: SchemaDialect) -> Result<ResponseFormat, LlmError> {
        let (name, item_schema) = named_schema_for::<T>()?;
        let wrapper_name = format!("{name}Array");
        let schema = serde_json::json!({
            "type": "object",
            "title": wrapper_name,
            "properties": {
                "items": { "type": "array", "items": item_schema }
            },
            "required": ["items"],
            "additionalProperties": false
        });
        Ok(format_from_parts(dialect, wrapper_name, schema))
    }

    fn decode(raw: &str) -> Result<Vec<T>, LlmError> {
        let envelope: ItemsEnvelope<T> =
            serde_json::from_str(raw).map_err(|e| LlmError::Parse {
                message: "Failed to decode structured output list".to_string(),
                source: Box::new(e),
            })?;
        Ok(envelope.items)
    }
}

/// Build the response-format payload for an already-assembled schema.
pub(crate) fn format_from_parts(
    dialect: SchemaDialect,
    name: impl Into<String>,
    schema: Value,
) -> ResponseFormat {
    match dialect {
        SchemaDialect::JsonSchema => ResponseFormat::json_schema(name, schema),
        SchemaDialect::JsonObject => ResponseFormat::json_object(schema),
    }
}

fn named_schema_for<T: JsonSchema>() -> Result<(String, Value), LlmError> {
    let schema = schema_for!(T);
    let value = serde_json::to_value(&schema)
        .map_err(|e| LlmError::Schema(format!("schema is not valid JSON: {e}")))?;

    let name = value
        .get("title")
        .and_then(|title| title.as_str())
        .map(str::to_owned)
        .ok_or_else(|| LlmError::Schema("missing schema name".to_string()))?;

    Ok((name, value))
}
