//! Function candidates and tool-call resolution.
//!
//! Candidates are registered explicitly: each carries its name, an optional
//! description, a parameter JSON Schema, and an async invocation thunk. The
//! resolver maps the tool calls a completion returned back onto candidates by
//! exact name match and binds the decoded arguments.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use serde_json::{Map, Value};
use tracing::debug;

use crate::chat::request::{FunctionPayload, FunctionType, ToolChoice, ToolPayload};
use crate::chat::response::ToolCallPayload;
use crate::core::error::LlmError;
use crate::core::types::BoxFuture;

/// Wire-facing description of a candidate: name, description, parameter
/// schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Value,
}

/// An invocable function that can be offered to the model.
///
/// Implement this directly for reusable tools, or build one-off candidates
/// with [`FunctionCandidate::builder`].
#[async_trait]
pub trait CallableFunction: Send + Sync {
    fn descriptor(&self) -> FunctionDescriptor;

    async fn invoke(&self, arguments: Value) -> Result<Value, LlmError>;
}

/// A named candidate offered in one resolution call.
#[derive(Clone)]
pub struct FunctionCandidate {
    descriptor: FunctionDescriptor,
    callable: Arc<dyn CallableFunction>,
}

impl FunctionCandidate {
    pub fn from_callable(callable: Arc<dyn CallableFunction>) -> Self {
        let descriptor = callable.descriptor();
        Self {
            descriptor,
            callable,
        }
    }

    pub fn builder(name: impl Into<String>) -> FunctionBuilder {
        FunctionBuilder {
            name: name.into(),
            description: None,
            parameters: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    pub async fn invoke(&self, arguments: Value) -> Result<Value, LlmError> {
        self.callable.invoke(arguments).await
    }

    pub(crate) fn tool_payload(&self) -> ToolPayload {
        ToolPayload {
            r#type: FunctionType::Function,
            function: FunctionPayload {
                name: self.descriptor.name.clone(),
                description: self.descriptor.description.clone(),
                parameters: self.descriptor.parameters.clone(),
            },
        }
    }
}

impl fmt::Debug for FunctionCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCandidate")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Builder for closure-backed candidates.
pub struct FunctionBuilder {
    name: String,
    description: Option<String>,
    parameters: Option<Value>,
}

impl FunctionBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Derive the parameter schema from a type.
    pub fn parameters_for<P: JsonSchema>(mut self) -> Self {
        let schema = schema_for!(P);
        self.parameters = serde_json::to_value(&schema).ok();
        self
    }

    /// Supply a raw parameter schema.
    pub fn parameters(mut self, schema: Value) -> Self {
        self.parameters = Some(schema);
        self
    }

    /// Attach the invocation thunk and finish the candidate.
    pub fn handler<F, Fut>(self, handler: F) -> FunctionCandidate
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, LlmError>> + Send + 'static,
    {
        let descriptor = FunctionDescriptor {
            name: self.name,
            description: self.description,
            parameters: self.parameters.unwrap_or_else(empty_parameters),
        };
        let run: HandlerFn = Box::new(move |arguments| Box::pin(handler(arguments)));
        FunctionCandidate {
            descriptor: descriptor.clone(),
            callable: Arc::new(ClosureFunction { descriptor, run }),
        }
    }
}

type HandlerFn = Box<dyn Fn(Value) -> BoxFuture<'static, Result<Value, LlmError>> + Send + Sync>;

struct ClosureFunction {
    descriptor: FunctionDescriptor,
    run: HandlerFn,
}

#[async_trait]
impl CallableFunction for ClosureFunction {
    fn descriptor(&self) -> FunctionDescriptor {
        self.descriptor.clone()
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, LlmError> {
        (self.run)(arguments).await
    }
}

fn empty_parameters() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}

/// Ordered, name-unique set of candidates offered in one resolution call.
///
/// `allow_none` marks that declining is acceptable: the tool-choice policy
/// becomes `auto` instead of `required`, and a returned call named `"None"`
/// is skipped rather than resolved.
#[derive(Debug, Clone, Default)]
pub struct FunctionSet {
    candidates: Vec<FunctionCandidate>,
    allow_none: bool,
}

impl FunctionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate. Names must be unique within the set.
    pub fn with(mut self, candidate: FunctionCandidate) -> Result<Self, LlmError> {
        if self.candidates.iter().any(|c| c.name() == candidate.name()) {
            return Err(LlmError::DuplicateFunction(candidate.name().to_string()));
        }
        self.candidates.push(candidate);
        Ok(self)
    }

    /// Permit the model to decline picking any function.
    pub fn allow_none(mut self) -> Self {
        self.allow_none = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn candidates(&self) -> &[FunctionCandidate] {
        &self.candidates
    }

    pub(crate) fn policy(&self) -> ToolChoice {
        if self.allow_none {
            ToolChoice::Auto
        } else {
            ToolChoice::Required
        }
    }

    pub(crate) fn find(&self, name: &str) -> Option<&FunctionCandidate> {
        self.candidates.iter().find(|c| c.name() == name)
    }

    pub(crate) fn tool_payloads(&self) -> Vec<ToolPayload> {
        self.candidates.iter().map(|c| c.tool_payload()).collect()
    }
}

/// A candidate bound to the argument mapping the model chose.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    candidate: FunctionCandidate,
    arguments: Map<String, Value>,
}

impl ResolvedCall {
    pub fn name(&self) -> &str {
        self.candidate.name()
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// Invoke the bound candidate with its resolved arguments.
    pub async fn invoke(&self) -> Result<Value, LlmError> {
        self.candidate
            .invoke(Value::Object(self.arguments.clone()))
            .await
    }
}

/// Map returned tool calls back onto candidates.
///
/// When `multiple` is false only the first call is processed. Under the
/// `auto` policy a call named `"None"` is skipped. A call whose name matches
/// no candidate is a contract error.
pub(crate) fn resolve_tool_calls(
    set: &FunctionSet,
    calls: &[ToolCallPayload],
    multiple: bool,
) -> Result<Vec<ResolvedCall>, LlmError> {
    let limit = if multiple { calls.len() } else { 1 };
    let mut resolved = Vec::new();

    for call in calls.iter().take(limit) {
        if set.policy() == ToolChoice::Auto && call.function.name == "None" {
            continue;
        }

        let candidate = set
            .find(&call.function.name)
            .ok_or_else(|| LlmError::NoSuchFunction(call.function.name.clone()))?;

        debug!(
            name = %call.function.name,
            id = call.id.as_deref().unwrap_or(""),
            "resolved tool call"
        );

        let mut arguments = parse_arguments(&call.function.arguments)?;
        repair_stringified_lists(&mut arguments);

        resolved.push(ResolvedCall {
            candidate: candidate.clone(),
            arguments,
        });
    }

    Ok(resolved)
}

fn parse_arguments(raw: &str) -> Result<Map<String, Value>, LlmError> {
    serde_json::from_str(raw).map_err(|e| LlmError::Parse {
        message: format!("Failed to parse tool arguments: {raw}"),
        source: Box::new(e),
    })
}

/// Re-parse argument values that look like JSON-encoded lists.
///
/// Some models emit array values as strings (`"[1,2,3]"`). A string with a
/// leading `[` and trailing `]` is re-parsed and substituted on success; on
/// failure the original string stays bound.
fn repair_stringified_lists(arguments: &mut Map<String, Value>) {
    for value in arguments.values_mut() {
        let Some(text) = value.as_str() else { continue };
        if text.starts_with('[') && text.ends_with(']') {
            if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                *value = parsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(name: &str, arguments: &str) -> ToolCallPayload {
        serde_json::from_value(json!({
            "id": "call_test",
            "function": { "name": name, "arguments": arguments }
        }))
        .unwrap()
    }

    fn echo_candidate(name: &str) -> FunctionCandidate {
        FunctionCandidate::builder(name)
            .description("Echo the arguments back")
            .handler(|arguments| async move { Ok(arguments) })
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let error = FunctionSet::new()
            .with(echo_candidate("foo"))
            .unwrap()
            .with(echo_candidate("foo"))
            .unwrap_err();
        assert!(matches!(error, LlmError::DuplicateFunction(name) if name == "foo"));
    }

    #[test]
    fn policy_follows_allow_none() {
        let set = FunctionSet::new().with(echo_candidate("foo")).unwrap();
        assert_eq!(set.policy(), ToolChoice::Required);
        assert_eq!(set.allow_none().policy(), ToolChoice::Auto);
    }

    #[test]
    fn stringified_list_arguments_are_reparsed() {
        let set = FunctionSet::new().with(echo_candidate("bar")).unwrap();
        let calls = vec![payload("bar", r#"{"x": "[1,2,3]"}"#)];

        let resolved = resolve_tool_calls(&set, &calls, true).unwrap();
        assert_eq!(resolved[0].arguments()["x"], json!([1, 2, 3]));
    }

    #[test]
    fn unparseable_list_lookalikes_stay_strings() {
        let set = FunctionSet::new().with(echo_candidate("bar")).unwrap();
        let calls = vec![payload("bar", r#"{"x": "[not json]"}"#)];

        let resolved = resolve_tool_calls(&set, &calls, true).unwrap();
        assert_eq!(resolved[0].arguments()["x"], json!("[not json]"));
    }

    #[test]
    fn unknown_function_name_is_a_contract_error() {
        let set = FunctionSet::new().with(echo_candidate("foo")).unwrap();
        let calls = vec![payload("baz", "{}")];

        let error = resolve_tool_calls(&set, &calls, true).unwrap_err();
        assert!(matches!(error, LlmError::NoSuchFunction(ref name) if name == "baz"));
        assert!(error.is_contract_violation());
    }

    #[test]
    fn single_selection_keeps_only_the_first_call() {
        let set = FunctionSet::new()
            .with(echo_candidate("foo"))
            .unwrap()
            .with(echo_candidate("bar"))
            .unwrap();
        let calls = vec![payload("foo", "{}"), payload("bar", "{}")];

        let resolved = resolve_tool_calls(&set, &calls, false).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name(), "foo");
    }

    #[test]
    fn none_sentinel_is_skipped_under_auto_policy() {
        let set = FunctionSet::new()
            .with(echo_candidate("foo"))
            .unwrap()
            .allow_none();
        let calls = vec![payload("None", "{}"), payload("foo", "{}")];

        let resolved = resolve_tool_calls(&set, &calls, true).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name(), "foo");
    }

    #[tokio::test]
    async fn resolved_call_invokes_with_bound_arguments() {
        let set = FunctionSet::new().with(echo_candidate("echo")).unwrap();
        let calls = vec![payload("echo", r#"{"word": "hi"}"#)];

        let resolved = resolve_tool_calls(&set, &calls, true).unwrap();
        let result = resolved[0].invoke().await.unwrap();
        assert_eq!(result["word"], "hi");
    }
}
