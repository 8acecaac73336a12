use std::time::Duration;

use flatchat::{CallOptions, ChatClient, ChatConfig, FunctionCandidate, FunctionSet, LlmError};
use schemars::JsonSchema;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ChatConfig {
    ChatConfig::new()
        .with_base_url(server.uri())
        .with_api_key("test-key")
        .with_max_retries(3)
        .with_retry_base_delay(Duration::from_millis(5))
}

fn client_for(server: &MockServer) -> ChatClient {
    ChatClient::new(config_for(server)).expect("client")
}

fn tool_call_response(calls: &[(&str, &str)]) -> ResponseTemplate {
    let tool_calls: Vec<Value> = calls
        .iter()
        .enumerate()
        .map(|(index, (name, arguments))| {
            json!({
                "id": format!("call_{index}"),
                "type": "function",
                "function": { "name": name, "arguments": arguments }
            })
        })
        .collect();

    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": null, "tool_calls": tool_calls },
            "finish_reason": "tool_calls"
        }]
    }))
}

fn text_response(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    }))
}

#[derive(JsonSchema)]
#[allow(dead_code)]
struct SumArgs {
    a: i64,
    b: i64,
}

fn sum_candidate() -> FunctionCandidate {
    FunctionCandidate::builder("calculate_sum")
        .description("Add two integers and return the sum.")
        .parameters_for::<SumArgs>()
        .handler(|arguments| async move {
            let a = arguments["a"].as_i64().unwrap_or(0);
            let b = arguments["b"].as_i64().unwrap_or(0);
            Ok(json!(a + b))
        })
}

fn tally_candidate() -> FunctionCandidate {
    FunctionCandidate::builder("tally_values")
        .description("Count the entries in a list of values.")
        .parameters(json!({
            "type": "object",
            "properties": { "x": { "type": "array", "items": { "type": "integer" } } },
            "required": ["x"]
        }))
        .handler(|arguments| async move {
            let count = arguments["x"].as_array().map(Vec::len).unwrap_or(0);
            Ok(json!(count))
        })
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("recorded requests")
        .iter()
        .map(|request| serde_json::from_slice(&request.body).expect("JSON body"))
        .collect()
}

#[tokio::test]
async fn picked_function_binds_reparsed_list_arguments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(tool_call_response(&[("tally_values", r#"{"x": "[1,2,3]"}"#)]))
        .mount(&server)
        .await;

    let set = FunctionSet::new()
        .with(sum_candidate())
        .unwrap()
        .with(tally_candidate())
        .unwrap();

    let client = client_for(&server);
    let resolved = client
        .pick_function(&set, CallOptions::new())
        .await
        .expect("resolution")
        .expect("one call");

    assert_eq!(resolved.name(), "tally_values");
    assert_eq!(resolved.arguments()["x"], json!([1, 2, 3]));
    assert_eq!(resolved.invoke().await.unwrap(), json!(3));

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["tool_choice"], "required");
    let tools = bodies[0]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["type"], "function");
    assert_eq!(tools[0]["function"]["name"], "calculate_sum");
    assert_eq!(tools[1]["function"]["name"], "tally_values");
}

#[tokio::test]
async fn allow_none_switches_the_policy_to_auto() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(tool_call_response(&[("None", "{}")]))
        .mount(&server)
        .await;

    let set = FunctionSet::new()
        .with(sum_candidate())
        .unwrap()
        .allow_none();

    let client = client_for(&server);
    let resolved = client
        .pick_function(&set, CallOptions::new())
        .await
        .expect("resolution");

    assert!(resolved.is_none(), "model declined, nothing to resolve");

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["tool_choice"], "auto");
}

#[tokio::test]
async fn text_instead_of_required_tool_calls_is_retried_then_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(text_response("I would rather chat about the weather."))
        .mount(&server)
        .await;

    let set = FunctionSet::new().with(sum_candidate()).unwrap();

    let client = client_for(&server);
    let error = client
        .pick_functions(&set, CallOptions::new())
        .await
        .expect_err("no tools found");

    // The failure is retried like any transient error before surfacing.
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    match error {
        LlmError::RetriesExhausted { attempts, source } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*source, LlmError::NoToolCalls));
        }
        other => panic!("Expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_function_name_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(tool_call_response(&[("launch_missiles", "{}")]))
        .mount(&server)
        .await;

    let set = FunctionSet::new().with(sum_candidate()).unwrap();

    let client = client_for(&server);
    let error = client
        .pick_functions(&set, CallOptions::new())
        .await
        .expect_err("contract error");

    assert!(matches!(error, LlmError::NoSuchFunction(name) if name == "launch_missiles"));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn single_selection_discards_extra_tool_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(tool_call_response(&[
            ("calculate_sum", r#"{"a": 1, "b": 2}"#),
            ("tally_values", r#"{"x": [1]}"#),
        ]))
        .mount(&server)
        .await;

    let set = FunctionSet::new()
        .with(sum_candidate())
        .unwrap()
        .with(tally_candidate())
        .unwrap();

    let client = client_for(&server);
    let resolved = client
        .pick_function(&set, CallOptions::new())
        .await
        .expect("resolution")
        .expect("one call");

    assert_eq!(resolved.name(), "calculate_sum");
}

#[tokio::test]
async fn multiple_selection_resolves_every_tool_call_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(tool_call_response(&[
            ("calculate_sum", r#"{"a": 1, "b": 2}"#),
            ("tally_values", r#"{"x": [4, 5]}"#),
        ]))
        .mount(&server)
        .await;

    let set = FunctionSet::new()
        .with(sum_candidate())
        .unwrap()
        .with(tally_candidate())
        .unwrap();

    let client = client_for(&server);
    let resolved = client
        .pick_functions(&set, CallOptions::new())
        .await
        .expect("resolution");

    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].name(), "calculate_sum");
    assert_eq!(resolved[1].name(), "tally_values");
    assert_eq!(resolved[0].invoke().await.unwrap(), json!(3));
    assert_eq!(resolved[1].invoke().await.unwrap(), json!(2));
}

#[tokio::test]
async fn call_function_resolves_and_invokes_in_one_step() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(tool_call_response(&[("calculate_sum", r#"{"a": 20, "b": 22}"#)]))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .call_function(&sum_candidate(), CallOptions::new())
        .await
        .expect("result");

    assert_eq!(result, json!(42));
}

#[tokio::test]
async fn candidate_schemas_reach_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(tool_call_response(&[("calculate_sum", r#"{"a": 0, "b": 0}"#)]))
        .mount(&server)
        .await;

    let set = FunctionSet::new().with(sum_candidate()).unwrap();
    let client = client_for(&server);
    client
        .pick_functions(&set, CallOptions::new())
        .await
        .expect("resolution");

    let bodies = request_bodies(&server).await;
    let function = &bodies[0]["tools"][0]["function"];
    assert_eq!(function["description"], "Add two integers and return the sum.");
    assert_eq!(function["parameters"]["properties"]["a"]["type"], "integer");
    assert_eq!(function["parameters"]["properties"]["b"]["type"], "integer");
}
