//! # flatchat
//!
//! A flat, no-framework convenience layer over chat-completion LLM APIs:
//! ambient context management, bounded retry, typed structured output, and
//! function-call resolution, with nothing in between you and the endpoint.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flatchat::{CallOptions, ChatClient, ChatConfig, Context, Single};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, JsonSchema)]
//! struct Analysis {
//!     sentiment: String,
//!     confidence: f32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = ChatClient::new(ChatConfig::new().with_model("gpt-4o-mini"))?;
//!     client.add_context(Context::new().with("review", "This library is amazing!"));
//!
//!     let analysis = client
//!         .generate::<Single<Analysis>>(CallOptions::new())
//!         .await?;
//!     println!("{analysis:?}");
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod client;
pub mod constants;
pub mod core;
pub mod functions;
pub mod schema;

pub use chat::stream::TextStream;
pub use client::{CallOptions, ChatClient, ChatConfig};
pub use core::context::{Context, ContextValue};
pub use core::error::LlmError;
pub use core::retry::RetryPolicy;
pub use core::types::{ChatRole, GenerationParams, Message};
pub use functions::{
    CallableFunction, FunctionCandidate, FunctionDescriptor, FunctionSet, ResolvedCall,
};
pub use schema::{ListOf, SchemaDialect, Single, StructuredTarget};
