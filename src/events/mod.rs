//! Client-facing events and their delivery.

pub mod emitter;
pub mod wire;

pub use emitter::{missing_api_key_events, EventEmitter};
pub use wire::{OutboundEvent, WireToolCall, EMPTY_ANSWER_FALLBACK, TOOL_CLAMP_CODE};
