//! Turn orchestration.

pub mod accumulator;
pub mod controller;
pub mod dispatch;
pub mod request;
pub mod state;

pub use accumulator::ToolCallAccumulator;
pub use controller::{TurnController, TurnHandle, TurnOptions, FINALIZE_PROMPT};
pub use request::TurnRequest;
pub use state::{ClampState, Turn, TurnPhase, TurnStatus};
