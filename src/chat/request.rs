use serde::Serialize;
use serde_json::Value;

use crate::core::types::{ChatRole, GenerationParams, Message};

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,

    pub messages: Vec<WireMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolPayload>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Alter this or temperature but not both.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Used to boost cache hit rates by better bucketing similar requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages: messages.iter().map(WireMessage::from).collect(),
            response_format: None,
            tools: None,
            tool_choice: None,
            stream: None,
            temperature: None,
            max_tokens: None,
            top_p: None,
            seed: None,
            stop: None,
            user: None,
        }
    }

    pub fn apply_params(&mut self, params: &GenerationParams) {
        self.temperature = params.temperature;
        self.max_tokens = params.max_tokens;
        self.top_p = params.top_p;
        self.seed = params.seed;
        self.stop = params.stop.clone();
        self.user = params.user.clone();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WireRole {
    System,
    User,
    Assistant,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: match message.role {
                ChatRole::System => WireRole::System,
                ChatRole::User => WireRole::User,
                ChatRole::Assistant => WireRole::Assistant,
            },
            content: message.content.clone(),
        }
    }
}

/// Structured-output request shape.
///
/// The default backend takes a named schema under `json_schema`; two known
/// alternates take the schema embedded directly next to a `json_object` tag.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseFormat {
    JsonSchema(JsonSchemaFormat),
    JsonObject(JsonObjectFormat),
}

impl ResponseFormat {
    pub fn json_schema(name: impl Into<String>, schema: Value) -> Self {
        ResponseFormat::JsonSchema(JsonSchemaFormat {
            r#type: JsonSchemaType::JsonSchema,
            json_schema: NamedSchema {
                name: name.into(),
                schema,
            },
        })
    }

    pub fn json_object(schema: Value) -> Self {
        ResponseFormat::JsonObject(JsonObjectFormat {
            r#type: JsonObjectType::JsonObject,
            schema,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonSchemaFormat {
    #[serde(rename = "type")]
    pub r#type: JsonSchemaType,

    pub json_schema: NamedSchema,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonSchemaType {
    JsonSchema,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedSchema {
    pub name: String,
    pub schema: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonObjectFormat {
    #[serde(rename = "type")]
    pub r#type: JsonObjectType,

    pub schema: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonObjectType {
    JsonObject,
}

/// Tool description in the chat tools envelope:
/// `{"type": "function", "function": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolPayload {
    #[serde(rename = "type")]
    pub r#type: FunctionType,

    pub function: FunctionPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionPayload {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub parameters: Value,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionType {
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    None,
    Auto,
    Required,
}
