//! Full turns through the OpenRouter adapter against mocked HTTP endpoints.

mod common;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{content_text, kinds};
use toolturn::config::TurnConfig;
use toolturn::events::OutboundEvent;
use toolturn::turn::TurnRequest;

fn sse(chunks: &[Value]) -> String {
    let mut body: String = chunks.iter().map(|c| format!("data: {c}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn sse_response(chunks: &[Value]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(sse(chunks))
}

fn config(server: &MockServer) -> TurnConfig {
    let mut config = TurnConfig::default()
        .with_api_key("sk-or-test")
        .with_base_url(server.uri());
    config.search.duckduckgo_base_url = server.uri();
    config.upstream.max_attempts = 1;
    config
}

fn request(prompt: &str) -> TurnRequest {
    TurnRequest::builder()
        .model("openai/gpt-4o-mini")
        .prompt(prompt)
        .build()
}

#[tokio::test]
async fn streams_a_search_round_and_the_final_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-or-test"))
        .respond_with(sse_response(&[
            json!({"choices":[{"delta":{"reasoning":"Searching first."}}]}),
            json!({"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_abc","type":"function","function":{"name":"search_web","arguments":""}}]}}]}),
            json!({"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"query\":"}}]}}]}),
            json!({"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"tokio\"}"}}]}}]}),
            json!({"choices":[{"delta":{},"finish_reason":"tool_calls"}]}),
        ]))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response(&[
            json!({"choices":[{"delta":{"content":"Tokio is "}}]}),
            json!({"choices":[{"delta":{"content":"an async runtime."}}]}),
            json!({"choices":[{"delta":{},"finish_reason":"stop"}]}),
        ]))
        .with_priority(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "tokio"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Heading": "Tokio",
            "AbstractText": "Tokio is an asynchronous runtime for Rust.",
            "AbstractURL": "https://tokio.rs/",
            "AbstractSource": "tokio.rs",
            "RelatedTopics": []
        })))
        .mount(&server)
        .await;

    let controller = config(&server).build_controller().unwrap();
    let (events, turn) = controller.start(request("What is tokio?")).collect().await.unwrap();

    assert_eq!(
        kinds(&events),
        vec!["reasoning", "tool_calls", "tool_executing", "tool_result", "content", "content", "done"]
    );
    let OutboundEvent::ToolCalls { calls, round } = &events[1] else {
        panic!("expected tool_calls");
    };
    assert_eq!(*round, 0);
    assert_eq!(calls[0].id, "call_abc");
    assert_eq!(calls[0].arguments, r#"{"query":"tokio"}"#);

    let OutboundEvent::ToolResult { result, .. } = &events[3] else {
        panic!("expected tool_result");
    };
    assert_eq!(result["success"], true);
    assert_eq!(result["result"]["results"][0]["url"], "https://tokio.rs/");

    assert_eq!(content_text(&events), "Tokio is an async runtime.");
    assert_eq!(turn.round, 2);

    let upstream: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/chat/completions")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(upstream.len(), 2);
    let roles: Vec<&str> = upstream[1]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["role"].as_str())
        .collect();
    assert_eq!(roles, vec!["user", "assistant", "tool"]);
    assert_eq!(upstream[1]["messages"][2]["tool_call_id"], "call_abc");
    assert_eq!(upstream[1]["messages"][1]["tool_calls"][0]["id"], "call_abc");
}

#[tokio::test]
async fn first_request_body_advertises_tools() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "anthropic/claude-3.5-sonnet",
            "stream": true,
            "tool_choice": "auto",
            "parallel_tool_calls": false
        })))
        .respond_with(sse_response(&[
            json!({"choices":[{"delta":{"content":"Hi!"},"finish_reason":"stop"}]}),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let controller = config(&server).build_controller().unwrap();
    let req = TurnRequest::builder()
        .model("anthropic/claude-3.5-sonnet")
        .prompt("hello")
        .build();
    let (events, _) = controller.start(req).collect().await.unwrap();

    assert_eq!(kinds(&events), vec!["content", "done"]);
    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    let names: Vec<&str> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["function"]["name"].as_str())
        .collect();
    assert_eq!(names, vec!["search_web", "get_current_time", "calculate"]);
}

#[tokio::test]
async fn unauthorized_upstream_is_a_terminal_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error":{"message":"No auth credentials found"}})),
        )
        .mount(&server)
        .await;

    let controller = config(&server).build_controller().unwrap();
    let (events, _) = controller.start(request("hi")).collect().await.unwrap();

    assert_eq!(kinds(&events), vec!["error"]);
    let OutboundEvent::Error { error } = &events[0] else {
        panic!("expected error");
    };
    assert!(error.contains("No auth credentials found"), "{error}");
}

#[tokio::test]
async fn in_stream_error_chunk_ends_the_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response(&[
            json!({"choices":[{"delta":{"content":"Part"}}]}),
            json!({"error":{"message":"Provider returned error","code":502}}),
        ]))
        .mount(&server)
        .await;

    let controller = config(&server).build_controller().unwrap();
    let (events, _) = controller.start(request("hi")).collect().await.unwrap();

    assert_eq!(kinds(&events), vec!["content", "error"]);
}

#[tokio::test]
async fn calls_without_upstream_ids_stay_unique_across_rounds() {
    let server = MockServer::start().await;
    let id_less_call = sse_response(&[
        json!({"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"name":"calculate","arguments":"{\"expression\":\"2+2\"}"}}]}}]}),
        json!({"choices":[{"delta":{},"finish_reason":"tool_calls"}]}),
    ]);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(id_less_call)
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response(&[
            json!({"choices":[{"delta":{"content":"4 both times."},"finish_reason":"stop"}]}),
        ]))
        .with_priority(2)
        .mount(&server)
        .await;

    let controller = config(&server).build_controller().unwrap();
    let (events, turn) = controller.start(request("2+2 twice")).collect().await.unwrap();

    let result_ids: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            OutboundEvent::ToolResult { id, .. } => Some(id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(result_ids.len(), 2);
    assert_ne!(result_ids[0], result_ids[1]);
    assert_eq!(turn.tool_results.len(), 2);
    assert_eq!(kinds(&events).last(), Some(&"done"));

    let upstream: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    let tool_call_ids: Vec<&str> = upstream[2]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["tool_call_id"].as_str())
        .collect();
    assert_eq!(tool_call_ids, result_ids);
}
