//! OpenRouter (OpenAI-compatible Chat Completions) streaming adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{bearer_headers, parse_sse_line, shared_client, status_to_error, SseLine};
use super::quirks::ProviderQuirks;
use super::{CompletionProvider, CompletionRequest};
use crate::error::ToolturnError;
use crate::types::{
    ContentPart, Delta, DeltaStream, FinishReason, ModelMessage, Role, ToolCallFragment,
};
use crate::util::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenRouterProvider {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            client: shared_client(),
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Chat Completions request body, with provider quirks applied.
    pub fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let quirks = ProviderQuirks::for_model(&request.model);
        let settings = &request.settings;

        let mut body = serde_json::Map::new();
        body.insert("model".into(), json!(request.model));
        body.insert(
            "messages".into(),
            request.messages.iter().map(message_to_openai).collect(),
        );
        body.insert("stream".into(), json!(true));

        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                body.insert(key.to_string(), value);
            }
        };
        put("temperature", settings.temperature.map(Value::from));
        put("top_p", settings.top_p.map(Value::from));
        put("max_tokens", settings.max_tokens.map(Value::from));
        put("top_k", settings.top_k.map(Value::from));
        put("frequency_penalty", settings.frequency_penalty.map(Value::from));
        put("presence_penalty", settings.presence_penalty.map(Value::from));
        put("repetition_penalty", settings.repetition_penalty.map(Value::from));
        put("min_p", settings.min_p.map(Value::from));
        put("top_a", settings.top_a.map(Value::from));
        put("seed", settings.seed.map(Value::from));
        put("stop", settings.stop_sequences.as_ref().map(|s| json!(s)));
        put(
            "reasoning",
            settings
                .reasoning_effort
                .map(|effort| json!({ "effort": effort.to_string() })),
        );
        if quirks.supports_response_format {
            put(
                "response_format",
                settings.response_format.as_ref().map(|f| f.to_json()),
            );
        }

        if !request.tools.is_empty() {
            put(
                "tools",
                Some(request.tools.iter().map(|t| t.to_openai_json()).collect()),
            );
            put("tool_choice", Some(quirks.tool_choice_json(&request.tool_choice)));
            if quirks.serial_tool_calls {
                put("parallel_tool_calls", Some(json!(false)));
            }
        }

        Value::Object(body)
    }

    async fn open(&self, body: &Value) -> Result<reqwest::Response, ToolturnError> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }
        Ok(resp)
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn provider_name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<DeltaStream, ToolturnError> {
        let body = self.build_request_body(request);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            tool_choice = ?request.tool_choice,
            "opening upstream stream"
        );

        let resp = self.retry.execute(|| self.open(&body)).await?;
        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut normalizer = ChunkNormalizer::default();
            futures::pin_mut!(byte_stream);

            let mut done_marker = false;

            'read: while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(ToolturnError::Network(e));
                        return;
                    }
                };
                buffer.extend_from_slice(&chunk);

                while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                    let line_bytes: Vec<u8> = buffer.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&line_bytes);
                    match parse_sse_line(line.trim_end_matches('\n')) {
                        SseLine::Ignored => continue,
                        SseLine::Done => {
                            done_marker = true;
                            break 'read;
                        }
                        SseLine::Data(data) => {
                            for item in normalizer.on_data(data) {
                                let terminal = !matches!(item, Ok(ref d) if !matches!(d, Delta::TurnEnd { .. }));
                                yield item;
                                if terminal {
                                    return;
                                }
                            }
                        }
                    }
                }
            }

            yield normalizer.on_close(done_marker);
        };

        Ok(Box::pin(stream))
    }
}

/// Turns OpenAI-style stream chunks into [`Delta`]s.
///
/// Incremental tool calls are keyed by `index`; the first id seen for an
/// index sticks, and calls without an id get a fresh `call_<uuid>` so ids
/// stay unique across every upstream call of a turn. Calls delivered
/// whole (a `message.tool_calls` block) are emitted as complete fragments.
#[derive(Debug, Default)]
struct ChunkNormalizer {
    ids: HashMap<u32, String>,
    saw_tool_calls: bool,
}

impl ChunkNormalizer {
    fn on_data(&mut self, data: &str) -> Vec<Result<Delta, ToolturnError>> {
        let chunk: StreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!(error = %e, "skipping unparseable stream chunk");
                return Vec::new();
            }
        };
        if let Some(err) = chunk.error {
            return vec![Err(ToolturnError::Upstream(err.describe()))];
        }

        let mut out = Vec::new();
        for choice in chunk.choices {
            if let Some(delta) = choice.delta {
                self.push_message(delta, false, &mut out);
            }
            if let Some(message) = choice.message {
                self.push_message(message, true, &mut out);
            }
            if let Some(reason) = choice.finish_reason {
                out.push(self.finish(&reason));
                // Nothing after the finish reason belongs to this call.
                break;
            }
        }
        out
    }

    fn push_message(&mut self, msg: StreamMessage, atomic: bool, out: &mut Vec<Result<Delta, ToolturnError>>) {
        let reasoning = msg
            .reasoning
            .or(msg.reasoning_content)
            .filter(|r| !r.is_empty())
            .or_else(|| {
                let joined: String = msg
                    .reasoning_details
                    .iter()
                    .filter_map(|d| d.text.as_deref())
                    .collect();
                (!joined.is_empty()).then_some(joined)
            });
        if let Some(text) = reasoning {
            out.push(Ok(Delta::reasoning(text)));
        }
        if let Some(text) = msg.content.as_ref().and_then(content_text) {
            out.push(Ok(Delta::content(text)));
        }
        for (position, call) in msg.tool_calls.into_iter().enumerate() {
            self.saw_tool_calls = true;
            let index = call.index.unwrap_or(position as u32);
            let call_id = match (call.id.filter(|id| !id.is_empty()), atomic) {
                (Some(id), true) => id,
                (id, _) => self
                    .ids
                    .entry(index)
                    .or_insert_with(|| id.unwrap_or_else(synthesized_call_id))
                    .clone(),
            };
            let function = call.function.unwrap_or_default();
            out.push(Ok(Delta::ToolCallFragment(ToolCallFragment {
                call_id,
                name: function.name.filter(|n| !n.is_empty()),
                arguments: function.arguments.map(|a| a.into_text()),
                complete: atomic,
            })));
        }
    }

    fn finish(&mut self, reason: &str) -> Result<Delta, ToolturnError> {
        if reason == "error" {
            return Err(ToolturnError::Upstream(
                "upstream finished the completion with an error".to_string(),
            ));
        }
        let mapped = FinishReason::from_openai(reason).unwrap_or(FinishReason::Stop);
        // Some providers report `stop` even when they emitted tool calls.
        let reason = if self.saw_tool_calls && mapped == FinishReason::Stop {
            FinishReason::ToolCalls
        } else {
            mapped
        };
        Ok(Delta::end(reason))
    }

    /// The stream closed before any finish reason. An explicit `[DONE]`
    /// still ends the call cleanly; a dropped connection does not.
    fn on_close(&self, done_marker: bool) -> Result<Delta, ToolturnError> {
        if !done_marker {
            return Err(ToolturnError::Stream(
                "upstream stream ended without a finish reason".to_string(),
            ));
        }
        Ok(Delta::end(if self.saw_tool_calls {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        }))
    }
}

/// Text from a string content or an array of `{"type":"text"}` blocks.
fn synthesized_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

fn content_text(content: &Value) -> Option<String> {
    let text = match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect(),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

fn message_to_openai(msg: &ModelMessage) -> Value {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    if let Some(ContentPart::ToolResult(result)) = msg.content.first() {
        return json!({
            "role": "tool",
            "tool_call_id": result.tool_call_id,
            "content": result.content.to_string(),
        });
    }

    let text = msg.text();
    let tool_calls = msg.tool_calls();
    if tool_calls.is_empty() {
        return json!({ "role": role, "content": text });
    }

    let calls: Vec<Value> = tool_calls
        .iter()
        .map(|tc| {
            json!({
                "id": tc.id,
                "type": "function",
                "function": {
                    "name": tc.name,
                    "arguments": tc.arguments.to_json_text(),
                }
            })
        })
        .collect();
    json!({
        "role": role,
        "content": if text.is_empty() { Value::Null } else { Value::String(text) },
        "tool_calls": calls,
    })
}

// Stream chunk shapes (internal)

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Deserialize)]
struct StreamError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<Value>,
}

impl StreamError {
    fn describe(&self) -> String {
        match (&self.message, &self.code) {
            (Some(msg), Some(code)) => format!("{msg} (code {code})"),
            (Some(msg), None) => msg.clone(),
            (None, Some(code)) => format!("upstream error code {code}"),
            (None, None) => "upstream reported an error".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamMessage>,
    #[serde(default)]
    message: Option<StreamMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct StreamMessage {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    reasoning_details: Vec<ReasoningDetail>,
    #[serde(default)]
    tool_calls: Vec<StreamToolCall>,
}

#[derive(Deserialize)]
struct ReasoningDetail {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunction>,
}

#[derive(Deserialize, Default)]
struct StreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<ArgumentText>,
}

/// Arguments are normally a JSON string; a few providers send an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ArgumentText {
    Text(String),
    Object(Value),
}

impl ArgumentText {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Object(v) => v.to_string(),
        }
    }
}
