use serde::Deserialize;

/// Batch completion response. Only the fields this crate reads are modelled;
/// everything else in the payload is ignored.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallPayload>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallPayload {
    #[serde(default)]
    pub id: Option<String>,

    pub function: FunctionCallPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCallPayload {
    pub name: String,

    /// JSON-encoded argument object, exactly as the API returns it.
    pub arguments: String,
}

impl ChatResponse {
    /// Text content of the first choice, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }

    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
    }

    /// Tool invocations of the first choice; empty when the model answered
    /// with plain text.
    pub fn tool_calls(&self) -> &[ToolCallPayload] {
        self.choices
            .first()
            .and_then(|choice| choice.message.tool_calls.as_deref())
            .unwrap_or(&[])
    }
}

/// One streamed completion chunk.
#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    pub delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatChunk {
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_choice_content() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "hello" },
                "finish_reason": "stop"
            }]
        }))
        .unwrap();

        assert_eq!(response.content(), Some("hello"));
        assert!(response.tool_calls().is_empty());
    }

    #[test]
    fn reads_tool_calls_with_string_arguments() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "lookup", "arguments": "{\"query\": \"rust\"}" }
                    }]
                }
            }]
        }))
        .unwrap();

        let calls = response.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "lookup");
        assert!(calls[0].function.arguments.contains("rust"));
    }

    #[test]
    fn chunk_without_content_yields_none() {
        let chunk: ChatChunk = serde_json::from_value(serde_json::json!({
            "choices": [{ "delta": { "role": "assistant" } }]
        }))
        .unwrap();

        assert!(chunk.into_content().is_none());
    }
}
