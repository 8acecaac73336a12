use std::time::Duration;

use flatchat::{CallOptions, ChatClient, ChatConfig};
use serde_json::json;
use tokio_stream::StreamExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ChatClient {
    let config = ChatConfig::new()
        .with_base_url(server.uri())
        .with_api_key("test-key")
        .with_max_retries(3)
        .with_retry_base_delay(Duration::from_millis(5));
    ChatClient::new(config).expect("client")
}

fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "text/event-stream")
        .set_body_string(body)
}

#[tokio::test]
async fn stream_yields_fragments_and_skips_contentless_chunks() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let stream = client
        .get_stream("Say hello.", CallOptions::new())
        .await
        .expect("stream");

    let fragments: Vec<String> = stream
        .map(|fragment| fragment.expect("fragment"))
        .collect()
        .await;

    assert_eq!(fragments, vec!["Hel".to_string(), "lo".to_string()]);
}

#[tokio::test]
async fn stream_stops_at_the_done_marker() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"only\"}}]}\n\n",
        "data: [DONE]\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ghost\"}}]}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let stream = client
        .get_stream("Short answer.", CallOptions::new())
        .await
        .expect("stream");

    let fragments: Vec<String> = stream
        .map(|fragment| fragment.expect("fragment"))
        .collect()
        .await;

    assert_eq!(fragments, vec!["only".to_string()]);
}

#[tokio::test]
async fn stream_initiation_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response(
            "data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\ndata: [DONE]\n\n",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let stream = client
        .get_stream("Hello again.", CallOptions::new())
        .await
        .expect("stream after retry");

    let fragments: Vec<String> = stream
        .map(|fragment| fragment.expect("fragment"))
        .collect()
        .await;

    assert_eq!(fragments, vec!["late".to_string()]);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn partial_consumption_is_allowed() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"first\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"second\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut stream = client
        .get_stream("Two words.", CallOptions::new())
        .await
        .expect("stream");

    let first = stream.next().await.expect("item").expect("fragment");
    assert_eq!(first, "first");
    drop(stream);
}
