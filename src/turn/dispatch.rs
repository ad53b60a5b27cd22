//! Execution of one round of tool calls.

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};

use crate::events::{EventEmitter, OutboundEvent};
use crate::tools::{ToolExecutionContext, ToolRegistry};
use crate::types::{ToolCallRequest, ToolCallResult, ToolCallStatus};

/// Limits applied to a round.
#[derive(Debug, Clone, Copy)]
pub struct DispatchLimits {
    pub timeout: Duration,
    pub max_concurrency: usize,
}

/// Run `calls` with at most `max_concurrency` in flight.
///
/// A call stays `queued` until it is picked up, then moves to `running` as it
/// emits `tool_executing`, and ends `completed` or `failed` with its
/// `tool_result`. Results come back in dispatch order, one per call. Dropping
/// the returned future cancels every call still running.
pub async fn run_round(
    registry: &ToolRegistry,
    calls: &mut [ToolCallRequest],
    ctx: &ToolExecutionContext,
    limits: DispatchLimits,
    emitter: &EventEmitter,
    round: u32,
) -> Vec<ToolCallResult> {
    let tasks: Vec<BoxFuture<'_, ToolCallResult>> = calls
        .iter_mut()
        .map(|request| {
            async move {
                request.status = ToolCallStatus::Running;
                let call = request.to_call();
                emitter
                    .emit(OutboundEvent::tool_executing(&call, round))
                    .await;
                let result = registry
                    .execute(&call.id, &call.name, &call.arguments, limits.timeout, ctx)
                    .await;
                request.status = if result.is_success() {
                    ToolCallStatus::Completed
                } else {
                    ToolCallStatus::Failed
                };
                emitter.emit(OutboundEvent::tool_result(&result, round)).await;
                result
            }
            .boxed()
        })
        .collect();

    stream::iter(tasks)
        .buffered(limits.max_concurrency.max(1))
        .collect()
        .await
}
