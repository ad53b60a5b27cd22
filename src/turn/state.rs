//! Turn record and lifecycle phases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{ModelMessage, ToolCallRequest, ToolCallResult};

/// Phase of the turn state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TurnPhase {
    Requesting,
    Streaming,
    AwaitingToolDispatch,
    ExecutingTools,
    Finalizing,
    Done,
    Errored,
    Cancelled,
}

impl TurnPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Errored | Self::Cancelled)
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TurnStatus {
    Completed,
    Errored(String),
    Cancelled,
}

/// Per-turn ceiling on dispatched tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClampState {
    pub issued: usize,
    pub limit: usize,
}

impl ClampState {
    pub fn new(limit: usize) -> Self {
        Self { issued: 0, limit }
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.issued)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Admit up to `requested` calls and return how many were admitted.
    pub fn admit(&mut self, requested: usize) -> usize {
        let admitted = requested.min(self.remaining());
        self.issued += admitted;
        admitted
    }
}

/// Everything the controller knows about one turn.
///
/// Owned exclusively by the controller task and handed back when the turn
/// ends.
#[derive(Debug, Clone)]
pub struct Turn {
    pub id: String,
    pub model: String,
    pub phase: TurnPhase,
    /// Messages sent upstream, growing across rounds.
    pub messages: Vec<ModelMessage>,
    pub clamp: ClampState,
    /// Number of upstream calls opened so far.
    pub round: u32,
    pub tool_calls: Vec<ToolCallRequest>,
    pub tool_results: Vec<ToolCallResult>,
    /// Concatenation of every `content` event sent to the client.
    pub answer: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: Option<TurnStatus>,
}

impl Turn {
    pub fn new(
        id: impl Into<String>,
        model: impl Into<String>,
        messages: Vec<ModelMessage>,
        clamp_limit: usize,
    ) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            phase: TurnPhase::Requesting,
            messages,
            clamp: ClampState::new(clamp_limit),
            round: 0,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            answer: String::new(),
            started_at: Utc::now(),
            ended_at: None,
            status: None,
        }
    }

    pub fn transition(&mut self, next: TurnPhase) {
        if self.phase == next {
            return;
        }
        tracing::debug!(turn_id = %self.id, from = %self.phase, to = %next, round = self.round, "turn phase");
        self.phase = next;
    }

    /// Move to a terminal phase and stamp the end time.
    pub fn end(&mut self, status: TurnStatus) {
        let phase = match status {
            TurnStatus::Completed => TurnPhase::Done,
            TurnStatus::Errored(_) => TurnPhase::Errored,
            TurnStatus::Cancelled => TurnPhase::Cancelled,
        };
        self.transition(phase);
        self.ended_at = Some(Utc::now());
        self.status = Some(status);
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|ended| (ended - self.started_at).num_milliseconds())
    }
}
