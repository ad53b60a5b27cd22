//! toolturn: streaming tool-calling turns over an LLM chat completion API.
//!
//! A turn takes one user prompt, streams the model's answer, runs the web
//! search, clock and calculator tools the model asks for (bounded by a per-turn
//! clamp), feeds the results back, and delivers everything to the caller as a
//! single ordered event stream.
//!
//! ```no_run
//! use futures::StreamExt;
//! use toolturn::config::TurnConfig;
//! use toolturn::turn::TurnRequest;
//!
//! # async fn example() -> toolturn::error::Result<()> {
//! let controller = TurnConfig::load()?.build_controller()?;
//! let request = TurnRequest::builder()
//!     .model("openai/gpt-4o-mini")
//!     .prompt("What happened in Rust news this week?")
//!     .build();
//! let mut events = Box::pin(controller.start(request).into_event_stream());
//! while let Some(event) = events.next().await {
//!     print!("{}", event.to_sse());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod provider;
pub mod tools;
pub mod turn;
pub mod types;
pub mod util;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub mod cli;
