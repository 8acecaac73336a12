use thiserror::Error;

/// Errors produced anywhere in the crate.
///
/// Variants fall into three groups: transport/parse failures (retried by
/// [`RetryPolicy`](crate::core::retry::RetryPolicy)), contract violations
/// (caller mistakes, surfaced immediately), and model-behavior failures
/// (`NoToolCalls`, retried like any transient failure).
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to build JSON Schema: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Classification options cannot be empty")]
    EmptyOptions,

    #[error("A function named '{0}' is already present in this set")]
    DuplicateFunction(String),

    #[error("No candidate function named '{0}'")]
    NoSuchFunction(String),

    #[error("No tools found: the model returned text content instead of a tool call")]
    NoToolCalls,

    #[error("Function '{name}' failed: {message}")]
    FunctionExecution { name: String, message: String },

    #[error("Operation failed after {attempts} attempts. Last error: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<LlmError>,
    },
}

impl LlmError {
    /// Contract violations indicate caller bugs, not API flakiness, and are
    /// never retried.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            LlmError::Schema(_)
                | LlmError::Configuration(_)
                | LlmError::EmptyOptions
                | LlmError::DuplicateFunction(_)
                | LlmError::NoSuchFunction(_)
        )
    }
}
