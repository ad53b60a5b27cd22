//! The turn state machine.
//!
//! One spawned task drives a turn from the first upstream call to its
//! terminal event:
//!
//! ```text
//! Requesting -> Streaming -> AwaitingToolDispatch -> ExecutingTools -> Requesting ...
//!                                                         \-> Finalizing -> Done
//! ```
//!
//! Reasoning and content deltas are forwarded as they arrive. Tool calls are
//! accumulated until the upstream call ends, trimmed to the remaining clamp
//! budget, executed, and fed back as tool messages. Once the clamp is spent
//! the controller issues one last call with tool use disabled.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::accumulator::ToolCallAccumulator;
use super::dispatch::{self, DispatchLimits};
use super::request::TurnRequest;
use super::state::{Turn, TurnPhase, TurnStatus};
use crate::error::ToolturnError;
use crate::events::{EventEmitter, OutboundEvent, WireToolCall, EMPTY_ANSWER_FALLBACK};
use crate::provider::{CompletionProvider, CompletionRequest};
use crate::tools::search::parse_time_constraint;
use crate::tools::{SearchCache, ToolError, ToolExecutionContext, ToolRegistry};
use crate::types::{
    Delta, FinishReason, ModelMessage, ToolCall, ToolCallRequest, ToolCallResult, ToolCallStatus,
    ToolChoice,
};

/// User message appended before the tool-free finalization call.
pub const FINALIZE_PROMPT: &str = "Please use the tool results above to answer my original question.";

/// Knobs shared by every turn a controller runs.
#[derive(Debug, Clone)]
pub struct TurnOptions {
    /// Maximum tool calls dispatched per turn.
    pub clamp_limit: usize,
    /// Deadline for a single tool call.
    pub tool_timeout: Duration,
    /// Tool calls in flight at once within a round.
    pub max_concurrency: usize,
    /// Capacity of the event channel to the client.
    pub event_buffer: usize,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            clamp_limit: 10,
            tool_timeout: Duration::from_millis(7_500),
            max_concurrency: 4,
            event_buffer: 64,
        }
    }
}

/// Runs turns against one upstream provider and tool registry.
#[derive(Clone)]
pub struct TurnController {
    provider: Arc<dyn CompletionProvider>,
    registry: Arc<ToolRegistry>,
    options: TurnOptions,
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("provider", &self.provider.provider_name())
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}

/// Why the drive loop stopped early.
enum TurnStop {
    Cancelled,
    Failed(ToolturnError),
}

impl From<ToolturnError> for TurnStop {
    fn from(err: ToolturnError) -> Self {
        match err {
            ToolturnError::Cancelled => Self::Cancelled,
            other => Self::Failed(other),
        }
    }
}

/// What one upstream call produced.
struct RoundOutput {
    text: String,
    finish: FinishReason,
    calls: Vec<ToolCall>,
}

impl TurnController {
    pub fn new(provider: Arc<dyn CompletionProvider>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            registry,
            options: TurnOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TurnOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TurnOptions {
        &self.options
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Spawn a turn and return a handle to its event stream.
    pub fn start(&self, request: TurnRequest) -> TurnHandle {
        let turn_id = uuid::Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let (tx, events) = mpsc::channel(self.options.event_buffer.max(1));
        let emitter = EventEmitter::new(turn_id.clone(), tx, cancel.clone());

        let controller = self.clone();
        let id = turn_id.clone();
        let join = tokio::spawn(async move { controller.run(id, request, emitter).await });

        TurnHandle {
            turn_id,
            cancel,
            events,
            join,
        }
    }

    /// Drive a turn to completion on the current task.
    pub async fn run(&self, turn_id: String, request: TurnRequest, emitter: EventEmitter) -> Turn {
        let clamp_limit = request
            .clamp_limit
            .unwrap_or(self.options.clamp_limit)
            .max(1);
        let mut turn = Turn::new(turn_id, request.model.clone(), request.initial_messages(), clamp_limit);
        tracing::info!(
            turn_id = %turn.id,
            model = %turn.model,
            provider = self.provider.provider_name(),
            clamp_limit,
            tools_enabled = request.tools_enabled,
            "turn started"
        );

        let status = match self.drive(&mut turn, &request, &emitter).await {
            Ok(()) if emitter.is_cancelled() => TurnStatus::Cancelled,
            Ok(()) => {
                if turn.answer.is_empty() {
                    emitter
                        .emit(OutboundEvent::Content {
                            content: EMPTY_ANSWER_FALLBACK.to_string(),
                            round: turn.round.saturating_sub(1),
                        })
                        .await;
                    turn.answer.push_str(EMPTY_ANSWER_FALLBACK);
                }
                emitter.finish(OutboundEvent::done()).await;
                TurnStatus::Completed
            }
            Err(TurnStop::Failed(_)) | Err(TurnStop::Cancelled) if emitter.is_cancelled() => {
                TurnStatus::Cancelled
            }
            Err(TurnStop::Cancelled) => TurnStatus::Cancelled,
            Err(TurnStop::Failed(err)) => {
                tracing::warn!(turn_id = %turn.id, round = turn.round, error = %err, "turn failed");
                emitter
                    .finish(OutboundEvent::Error {
                        error: err.to_string(),
                    })
                    .await;
                TurnStatus::Errored(err.to_string())
            }
        };
        if status == TurnStatus::Cancelled {
            emitter.close();
        }

        turn.end(status);
        tracing::info!(
            turn_id = %turn.id,
            phase = %turn.phase,
            rounds = turn.round,
            tool_calls = turn.tool_calls.len(),
            elapsed_ms = turn.duration_ms().unwrap_or_default(),
            "turn ended"
        );
        turn
    }

    async fn drive(
        &self,
        turn: &mut Turn,
        request: &TurnRequest,
        emitter: &EventEmitter,
    ) -> Result<(), TurnStop> {
        let ctx = ToolExecutionContext {
            turn_id: turn.id.clone(),
            time_constraint: parse_time_constraint(&request.hint_text(), Utc::now().date_naive()),
            search_cache: SearchCache::new(),
        };
        let tools = if request.tools_enabled {
            self.registry.definitions()
        } else {
            Vec::new()
        };
        let mut finalizing = !request.tools_enabled;
        let mut first_choice = Some(request.tool_choice.clone());

        loop {
            let tool_choice = if finalizing {
                ToolChoice::None
            } else {
                first_choice.take().unwrap_or(ToolChoice::Auto)
            };
            turn.transition(if finalizing {
                TurnPhase::Finalizing
            } else {
                TurnPhase::Requesting
            });

            let upstream = CompletionRequest {
                model: turn.model.clone(),
                messages: turn.messages.clone(),
                tools: tools.clone(),
                tool_choice,
                settings: request.settings.clone(),
            };
            let round = turn.round;
            let output = self.stream_round(turn, &upstream, finalizing, emitter).await?;
            turn.round += 1;

            if finalizing || output.finish != FinishReason::ToolCalls || output.calls.is_empty() {
                if !output.calls.is_empty() {
                    tracing::warn!(
                        turn_id = %turn.id,
                        round,
                        discarded = output.calls.len(),
                        finish_reason = %output.finish,
                        "tool calls outside a tool round discarded"
                    );
                }
                if !output.text.is_empty() {
                    turn.messages.push(ModelMessage::assistant(output.text));
                }
                return Ok(());
            }

            self.dispatch_round(turn, round, output, &ctx, emitter).await?;

            if turn.clamp.is_exhausted() {
                tracing::debug!(turn_id = %turn.id, issued = turn.clamp.issued, "clamp exhausted; finalizing");
                turn.messages.push(ModelMessage::user(FINALIZE_PROMPT));
                finalizing = true;
            }
        }
    }

    /// Open one upstream call and forward its deltas until it ends.
    async fn stream_round(
        &self,
        turn: &mut Turn,
        upstream: &CompletionRequest,
        finalizing: bool,
        emitter: &EventEmitter,
    ) -> Result<RoundOutput, TurnStop> {
        let round = turn.round;
        tracing::debug!(
            turn_id = %turn.id,
            round,
            messages = upstream.messages.len(),
            tool_choice = ?upstream.tool_choice,
            "opening upstream call"
        );

        let opened = tokio::select! {
            biased;
            _ = emitter.stopped() => None,
            opened = self.provider.complete(upstream) => Some(opened),
        };
        let mut stream = opened.ok_or(TurnStop::Cancelled)??;
        if !finalizing {
            turn.transition(TurnPhase::Streaming);
        }

        let mut accumulator = ToolCallAccumulator::new();
        let mut text = String::new();
        let finish = loop {
            let next = tokio::select! {
                biased;
                _ = emitter.stopped() => return Err(TurnStop::Cancelled),
                next = stream.next() => next,
            };
            let delta = match next {
                Some(delta) => delta?,
                None => {
                    return Err(TurnStop::Failed(ToolturnError::Stream(
                        "upstream stream ended without a finish reason".to_string(),
                    )))
                }
            };
            match delta {
                Delta::ReasoningText { text: chunk } => {
                    if !chunk.is_empty() {
                        emitter
                            .emit(OutboundEvent::Reasoning {
                                content: chunk,
                                round,
                            })
                            .await;
                    }
                }
                Delta::ContentText { text: chunk } => {
                    if !chunk.is_empty() {
                        text.push_str(&chunk);
                        turn.answer.push_str(&chunk);
                        emitter
                            .emit(OutboundEvent::Content {
                                content: chunk,
                                round,
                            })
                            .await;
                    }
                }
                Delta::ToolCallFragment(fragment) => accumulator.push(fragment),
                Delta::TurnEnd { finish_reason } => break finish_reason,
            }
        };

        Ok(RoundOutput {
            text,
            finish,
            calls: accumulator.finish(),
        })
    }

    /// Trim a batch to the clamp, run the admitted calls and answer every
    /// requested call in the history.
    async fn dispatch_round(
        &self,
        turn: &mut Turn,
        round: u32,
        output: RoundOutput,
        ctx: &ToolExecutionContext,
        emitter: &EventEmitter,
    ) -> Result<(), TurnStop> {
        turn.transition(TurnPhase::AwaitingToolDispatch);
        turn.messages
            .push(ModelMessage::assistant_tool_calls(output.text, &output.calls));

        let requested = output.calls.len();
        let admitted = turn.clamp.admit(requested);
        let mut accepted: Vec<ToolCallRequest> = output
            .calls
            .into_iter()
            .map(|call| ToolCallRequest::new(call, round))
            .collect();
        let mut rejected = accepted.split_off(admitted);

        if !rejected.is_empty() {
            tracing::warn!(
                turn_id = %turn.id,
                round,
                requested,
                dispatched = admitted,
                limit = turn.clamp.limit,
                "tool calls trimmed by clamp"
            );
            emitter
                .emit(OutboundEvent::clamp_warning(turn.clamp.limit))
                .await;
        }

        if !accepted.is_empty() {
            emitter
                .emit(OutboundEvent::ToolCalls {
                    calls: accepted
                        .iter()
                        .map(|request| WireToolCall::from(&request.to_call()))
                        .collect(),
                    round,
                })
                .await;

            turn.transition(TurnPhase::ExecutingTools);
            let limits = DispatchLimits {
                timeout: self.options.tool_timeout,
                max_concurrency: self.options.max_concurrency,
            };
            let results = tokio::select! {
                biased;
                _ = emitter.stopped() => None,
                results = dispatch::run_round(&self.registry, &mut accepted, ctx, limits, emitter, round) => Some(results),
            };
            let Some(results) = results else {
                for request in accepted.iter_mut().filter(|r| !r.status.is_terminal()) {
                    request.status = ToolCallStatus::Failed;
                }
                turn.tool_calls.extend(accepted);
                return Err(TurnStop::Cancelled);
            };

            for result in &results {
                turn.messages.push(ModelMessage::tool_result(
                    &result.tool_call_id,
                    result.payload(),
                    !result.is_success(),
                ));
            }
            turn.tool_results.extend(results);
        }

        for request in &mut rejected {
            let result = ToolCallResult::rejected(
                &request.id,
                &request.name,
                ToolError::clamp_exceeded(turn.clamp.limit),
            );
            request.status = ToolCallStatus::Failed;
            turn.messages
                .push(ModelMessage::tool_result(&request.id, result.payload(), true));
            turn.tool_results.push(result);
        }

        turn.tool_calls.extend(accepted);
        turn.tool_calls.extend(rejected);
        Ok(())
    }
}

/// Handle to a running turn.
#[derive(Debug)]
pub struct TurnHandle {
    turn_id: String,
    cancel: CancellationToken,
    events: mpsc::Receiver<OutboundEvent>,
    join: JoinHandle<Turn>,
}

impl TurnHandle {
    pub fn turn_id(&self) -> &str {
        &self.turn_id
    }

    /// Cancel the turn. No further events are delivered.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn next_event(&mut self) -> Option<OutboundEvent> {
        self.events.recv().await
    }

    /// Drain every event, then return the finished turn record.
    pub async fn collect(mut self) -> Result<(Vec<OutboundEvent>, Turn), ToolturnError> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let turn = self
            .join
            .await
            .map_err(|e| ToolturnError::InvalidState(format!("turn task failed: {e}")))?;
        Ok((events, turn))
    }

    /// Events as a stream. Dropping the stream cancels the turn.
    pub fn into_event_stream(self) -> impl Stream<Item = OutboundEvent> + Send + 'static {
        let Self { cancel, mut events, .. } = self;
        async_stream::stream! {
            let _guard = cancel.drop_guard();
            while let Some(event) = events.recv().await {
                yield event;
            }
        }
    }
}
