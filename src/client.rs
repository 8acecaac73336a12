//! The public client surface: configuration, ambient context, and the
//! high-level operations.

use std::time::Duration;

use futures::StreamExt;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::chat::request::ChatRequest;
use crate::chat::response::ChatResponse;
use crate::chat::stream::{TextStream, text_fragments};
use crate::constants::openai;
use crate::core::context::{Context, ContextValue, build_messages};
use crate::core::error::LlmError;
use crate::core::http::{HttpClient, HttpConfig};
use crate::core::retry::RetryPolicy;
use crate::core::types::{GenerationParams, Message};
use crate::functions::{FunctionCandidate, FunctionSet, ResolvedCall, resolve_tool_calls};
use crate::schema::{SchemaDialect, Single, StructuredTarget, format_from_parts};

const GENERATE_OBJECT_INSTRUCTION: &str = "Based on the provided context and information, \
    generate a complete and accurate object that precisely matches the schema. Use all \
    relevant details to populate the fields with meaningful, appropriate values that best \
    represent the data.";

const PICK_FUNCTIONS_INSTRUCTION: &str = "Based on all the provided context and information, \
    analyze and select the most appropriate functions from the available options. Then, \
    determine and specify the optimal parameters for each function to achieve the intended \
    outcome.";

const PICK_FUNCTION_INSTRUCTION: &str = "Based on all the provided context and information, \
    analyze and select the most appropriate function from the available options. Then, \
    determine and specify the optimal parameters for that function to achieve the intended \
    outcome.";

/// Client configuration.
#[derive(Clone)]
pub struct ChatConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub timeout: Duration,
    pub extra_headers: Vec<(String, String)>,
    /// Explicit structured-output dialect. When unset it is derived from the
    /// base URL (`SchemaDialect::for_base_url`).
    pub schema_dialect: Option<SchemaDialect>,
    http_client: Option<reqwest::Client>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: openai::DEFAULT_MODEL.to_string(),
            base_url: openai::API_BASE.to_string(),
            api_key: None,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
            extra_headers: Vec::new(),
            schema_dialect: None,
            http_client: None,
        }
    }
}

impl ChatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_extra_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_schema_dialect(mut self, dialect: SchemaDialect) -> Self {
        self.schema_dialect = Some(dialect);
        self
    }

    /// Use a pre-built reqwest client instead of constructing one. The caller
    /// is then responsible for timeouts and any default headers, including
    /// authentication if no API key is configured.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

/// Per-call options: typed transport parameters plus ambient context
/// overrides. Everything not in the fixed parameter set travels as context.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub model: Option<String>,
    pub params: GenerationParams,
    overrides: Context,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.params.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.params.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.params.top_p = Some(top_p);
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.params.seed = Some(seed);
        self
    }

    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.params.stop = Some(stop);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.params.user = Some(user.into());
        self
    }

    /// Add an ambient-context override for this call only.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.overrides.insert(key, value);
        self
    }

    pub(crate) fn overrides(&self) -> &Context {
        &self.overrides
    }
}

/// A flat convenience client for a chat-completion endpoint.
#[derive(Debug)]
pub struct ChatClient {
    model: String,
    base_url: String,
    api_key: Option<String>,
    extra_headers: Vec<(String, String)>,
    dialect: SchemaDialect,
    http: HttpClient,
    retry: RetryPolicy,
    context: Context,
}

impl ChatClient {
    /// Build a client. Requires an API key (explicit or via `OPENAI_API_KEY`)
    /// or a pre-built HTTP client that carries its own authentication.
    pub fn new(config: ChatConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(openai::API_KEY_ENV_VAR).ok());

        if api_key.is_none() && config.http_client.is_none() {
            return Err(LlmError::Configuration(format!(
                "Provide an API key (explicitly or via {}) or a pre-built HTTP client",
                openai::API_KEY_ENV_VAR
            )));
        }

        let http = match config.http_client {
            Some(client) => HttpClient::from_client(client),
            None => HttpClient::new(HttpConfig {
                timeout: config.timeout,
                user_agent: None,
            })?,
        };

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let dialect = config
            .schema_dialect
            .unwrap_or_else(|| SchemaDialect::for_base_url(&base_url));

        Ok(Self {
            model: config.model,
            base_url,
            api_key,
            extra_headers: config.extra_headers,
            dialect,
            http,
            retry: RetryPolicy::new(config.max_retries, config.retry_base_delay),
            context: Context::new(),
        })
    }

    // --- Ambient context ---

    /// Replace the entire ambient context.
    pub fn set_context(&mut self, entries: Context) {
        self.context = entries;
    }

    /// Merge entries into the ambient context: repeated keys update in place,
    /// new keys append.
    pub fn add_context(&mut self, entries: Context) {
        self.context.merge(&entries);
    }

    pub fn clear_context(&mut self) {
        self.context.clear();
    }

    /// Remove named entries. Absent keys are a no-op.
    pub fn delete_from_context<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            self.context.remove(key.as_ref());
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    // --- Structured output ---

    /// Generate an object (or ordered list of objects) matching the target
    /// shape, e.g. `generate::<Single<Recipe>>` or `generate::<ListOf<Recipe>>`.
    pub async fn generate<S: StructuredTarget>(
        &self,
        opts: CallOptions,
    ) -> Result<S::Output, LlmError> {
        let format = S::response_format(self.dialect)?;
        let messages = self.assemble(&[Message::user(GENERATE_OBJECT_INSTRUCTION)], &opts)?;

        let mut request = self.base_request(&opts, messages);
        request.response_format = Some(format);

        self.retry
            .run(|| {
                let request = request.clone();
                async move {
                    let response = self.complete(&request).await?;
                    let content = response.into_content().ok_or_else(no_content)?;
                    S::decode(&content)
                }
            })
            .await
    }

    /// Ask a yes/no question about the current context.
    pub async fn is_true(&self, question: &str, opts: CallOptions) -> Result<bool, LlmError> {
        #[derive(Deserialize, JsonSchema)]
        struct IsItTrue {
            is_it_true: bool,
        }

        let opts = opts.context("question", question);
        let answer = self.generate::<Single<IsItTrue>>(opts).await?;
        Ok(answer.is_it_true)
    }

    /// Pick exactly one key from `options` (key, human-readable description)
    /// based on the current context.
    pub async fn classify(
        &self,
        options: &[(&str, &str)],
        opts: CallOptions,
    ) -> Result<String, LlmError> {
        #[derive(Deserialize)]
        struct Classification {
            choice: String,
        }

        if options.is_empty() {
            return Err(LlmError::EmptyOptions);
        }

        let keys: Vec<&str> = options.iter().map(|(key, _)| *key).collect();
        let schema = serde_json::json!({
            "type": "object",
            "title": "Classification",
            "properties": {
                "choice": {
                    "type": "string",
                    "description": "Select exactly one of the provided classification keys.",
                    "enum": keys,
                }
            },
            "required": ["choice"],
            "additionalProperties": false
        });
        let format = format_from_parts(self.dialect, "Classification", schema);

        let mut options_context = Context::new();
        for (key, description) in options {
            options_context.insert(*key, *description);
        }
        let rendered_options = options_context.to_pretty_json()?;
        let prompt = format!(
            "You are given a set of labeled options, each key having a descriptive meaning. \
             Please analyze the context and choose exactly one of these keys:\n\n{rendered_options}\n\n\
             Return your final choice of classification key in the 'choice' field."
        );

        let opts = opts.context(
            "classification_options",
            ContextValue::record(&options_context)?,
        );
        let messages = self.assemble(&[Message::user(prompt)], &opts)?;

        let mut request = self.base_request(&opts, messages);
        request.response_format = Some(format);

        self.retry
            .run(|| {
                let request = request.clone();
                async move {
                    let response = self.complete(&request).await?;
                    let content = response.into_content().ok_or_else(no_content)?;
                    let classification: Classification = serde_json::from_str(&content)
                        .map_err(|e| LlmError::Parse {
                            message: "Failed to decode classification choice".to_string(),
                            source: Box::new(e),
                        })?;
                    Ok(classification.choice)
                }
            })
            .await
    }

    // --- Function resolution ---

    /// Let the model pick any number of candidates and bind their arguments.
    pub async fn pick_functions(
        &self,
        set: &FunctionSet,
        opts: CallOptions,
    ) -> Result<Vec<ResolvedCall>, LlmError> {
        self.resolve(set, true, opts).await
    }

    /// Let the model pick a single candidate. Returns `None` when declining
    /// is allowed and the model declined.
    pub async fn pick_function(
        &self,
        set: &FunctionSet,
        opts: CallOptions,
    ) -> Result<Option<ResolvedCall>, LlmError> {
        Ok(self.resolve(set, false, opts).await?.into_iter().next())
    }

    /// Have the model determine arguments for `candidate` and invoke it.
    pub async fn call_function(
        &self,
        candidate: &FunctionCandidate,
        opts: CallOptions,
    ) -> Result<Value, LlmError> {
        let set = FunctionSet::new().with(candidate.clone())?;
        let resolved = self
            .resolve(&set, false, opts)
            .await?
            .into_iter()
            .next()
            .ok_or(LlmError::NoToolCalls)?;
        resolved.invoke().await
    }

    async fn resolve(
        &self,
        set: &FunctionSet,
        multiple: bool,
        opts: CallOptions,
    ) -> Result<Vec<ResolvedCall>, LlmError> {
        let policy = set.policy();
        let instruction = if multiple {
            PICK_FUNCTIONS_INSTRUCTION
        } else {
            PICK_FUNCTION_INSTRUCTION
        };
        let messages = self.assemble(&[Message::user(instruction)], &opts)?;

        let mut request = self.base_request(&opts, messages);
        request.tools = Some(set.tool_payloads());
        request.tool_choice = Some(policy);

        self.retry
            .run(|| {
                let request = request.clone();
                async move {
                    let response = self.complete(&request).await?;

                    let calls = response.tool_calls();
                    if calls.is_empty()
                        && policy == crate::chat::request::ToolChoice::Required
                        && response.content().is_some_and(|content| !content.is_empty())
                    {
                        return Err(LlmError::NoToolCalls);
                    }

                    if !calls.is_empty() {
                        info!(count = calls.len(), "model selected tool calls");
                    }

                    resolve_tool_calls(set, calls, multiple)
                }
            })
            .await
    }

    // --- Plain text / streaming ---

    /// Return the completion text verbatim.
    pub async fn get_string(&self, prompt: &str, opts: CallOptions) -> Result<String, LlmError> {
        let messages = self.assemble(&[Message::user(prompt)], &opts)?;
        let request = self.base_request(&opts, messages);

        self.retry
            .run(|| {
                let request = request.clone();
                async move {
                    let response = self.complete(&request).await?;
                    response.into_content().ok_or_else(no_content)
                }
            })
            .await
    }

    /// Stream the completion as text fragments. Only stream initiation is
    /// retried; the returned stream is forward-only and non-restartable.
    pub async fn get_stream(&self, prompt: &str, opts: CallOptions) -> Result<TextStream, LlmError> {
        let messages = self.assemble(&[Message::user(prompt)], &opts)?;
        let mut request = self.base_request(&opts, messages);
        request.stream = Some(true);

        let response = self
            .retry
            .run(|| {
                let request = request.clone();
                async move {
                    self.http
                        .post_stream(&self.endpoint_url(), &self.request_headers(), &request)
                        .await
                }
            })
            .await?;

        Ok(text_fragments(response.bytes_stream().boxed()))
    }

    // --- Internals ---

    fn assemble(&self, parts: &[Message], opts: &CallOptions) -> Result<Vec<Message>, LlmError> {
        build_messages(&self.context, opts.overrides(), parts)
    }

    fn base_request(&self, opts: &CallOptions, messages: Vec<Message>) -> ChatRequest {
        let model = opts.model.clone().unwrap_or_else(|| self.model.clone());
        let mut request = ChatRequest::new(model, messages);
        request.apply_params(&opts.params);
        request
    }

    fn endpoint_url(&self) -> String {
        format!("{}{}", self.base_url, openai::CHAT_COMPLETIONS_ENDPOINT)
    }

    fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(self.extra_headers.len() + 1);
        if let Some(api_key) = &self.api_key {
            headers.push(("Authorization".to_string(), format!("Bearer {api_key}")));
        }
        headers.extend(self.extra_headers.iter().cloned());
        headers
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.http
            .post_json(&self.endpoint_url(), &self.request_headers(), request)
            .await
    }
}

fn no_content() -> LlmError {
    LlmError::Api {
        message: "Response contained no message content".to_string(),
        status_code: None,
    }
}
