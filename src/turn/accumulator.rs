//! Assembles streamed tool-call fragments into complete calls.

use std::collections::HashMap;

use crate::types::{ToolCall, ToolCallArguments, ToolCallFragment};

#[derive(Debug, Default)]
struct PendingCall {
    name: Option<String>,
    arguments: String,
}

/// Buffers fragments per call id until each call closes.
///
/// Calls close either on an explicit `complete` fragment or when the upstream
/// call ends ([`finish`](Self::finish)). Completed calls come out in the order
/// they closed; calls still open at the end close in first-seen order.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    pending: HashMap<String, PendingCall>,
    /// Open call ids in first-seen order.
    order: Vec<String>,
    completed: Vec<ToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment. Fragments for an already closed id are ignored.
    pub fn push(&mut self, fragment: ToolCallFragment) {
        if self.completed.iter().any(|c| c.id == fragment.call_id) {
            tracing::debug!(call_id = %fragment.call_id, "fragment for closed tool call ignored");
            return;
        }
        if !self.pending.contains_key(&fragment.call_id) {
            self.order.push(fragment.call_id.clone());
        }
        let entry = self.pending.entry(fragment.call_id.clone()).or_default();
        if let Some(name) = fragment.name {
            entry.name = Some(name);
        }
        if let Some(chunk) = fragment.arguments {
            entry.arguments.push_str(&chunk);
        }
        if fragment.complete {
            self.close(&fragment.call_id);
        }
    }

    /// Close every call still open. Returns all completed calls in order.
    pub fn finish(mut self) -> Vec<ToolCall> {
        for id in std::mem::take(&mut self.order) {
            self.close(&id);
        }
        self.completed
    }

    fn close(&mut self, id: &str) {
        let Some(call) = self.pending.remove(id) else {
            return;
        };
        self.order.retain(|open| open != id);
        let name = call.name.unwrap_or_default();
        if name.is_empty() {
            tracing::warn!(call_id = id, "tool call closed without a name");
        }
        self.completed.push(ToolCall {
            id: id.to_string(),
            name,
            arguments: ToolCallArguments::from_text(&call.arguments),
        });
    }
}
