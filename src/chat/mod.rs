//! Typed wire layer for the OpenAI-style `/chat/completions` endpoint.

pub mod request;
pub mod response;
pub mod stream;

pub use request::{ChatRequest, ResponseFormat, ToolChoice, ToolPayload};
pub use response::{ChatChunk, ChatResponse, ToolCallPayload};
pub use stream::TextStream;
