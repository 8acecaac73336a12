pub mod context;
pub mod error;
pub mod http;
pub mod retry;
pub mod types;

pub use context::{Context, ContextValue};
pub use error::LlmError;
pub use http::{HttpClient, HttpConfig};
pub use retry::RetryPolicy;
pub use types::{BoxFuture, ChatRole, GenerationParams, Message};
