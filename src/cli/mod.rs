//! Command line interface.

use std::io::Write;

use clap::{Parser, Subcommand};
use futures::StreamExt;

use crate::config::{TurnConfig, API_KEY_ENV};
use crate::error::Result;
use crate::events::missing_api_key_events;
use crate::server::{self, DEFAULT_MODEL};
use crate::tools::ToolKind;
use crate::turn::TurnRequest;
use crate::types::{GenerationSettings, ToolChoice};

/// Streaming tool-calling chat turns
#[derive(Parser, Debug)]
#[command(name = "toolturn", version, about = "Streaming tool-calling chat turns")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one turn and print its SSE frames
    Chat(ChatArgs),
    /// Serve the HTTP API
    Serve(ServeArgs),
}

#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// User prompt
    pub prompt: String,

    /// Model id (e.g. openai/gpt-4o-mini)
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    #[arg(short, long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// auto, none, required or a tool name
    #[arg(long, default_value = "auto")]
    pub tool_choice: String,

    /// Override the per-turn tool call limit
    #[arg(long)]
    pub max_tool_calls: Option<usize>,

    /// Disable tools for this turn
    #[arg(long)]
    pub no_tools: bool,
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind, overriding configuration
    #[arg(short, long)]
    pub bind: Option<String>,
}

impl ChatArgs {
    pub fn to_turn_request(&self) -> TurnRequest {
        let known: Vec<&str> = ToolKind::ALL.iter().map(|k| k.name()).collect();
        TurnRequest::builder()
            .model(self.model.clone())
            .prompt(self.prompt.clone())
            .maybe_system(self.system.clone())
            .settings(GenerationSettings {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                ..GenerationSettings::default()
            })
            .tool_choice(ToolChoice::parse(&self.tool_choice, &known))
            .tools_enabled(!self.no_tools)
            .maybe_clamp_limit(self.max_tool_calls)
            .build()
    }
}

/// Run a single turn, writing each event to stdout as an SSE frame.
pub async fn handle_chat(config: TurnConfig, args: ChatArgs) -> Result<()> {
    let mut stdout = std::io::stdout();
    if config.api_key().is_none() {
        for event in missing_api_key_events(API_KEY_ENV) {
            stdout.write_all(event.to_sse().as_bytes())?;
        }
        return Ok(());
    }

    let controller = config.build_controller()?;
    let mut events = Box::pin(controller.start(args.to_turn_request()).into_event_stream());
    while let Some(event) = events.next().await {
        stdout.write_all(event.to_sse().as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}

pub async fn handle_serve(mut config: TurnConfig, args: ServeArgs) -> Result<()> {
    if let Some(bind) = args.bind {
        config = config.with_bind(bind);
    }
    server::serve(config).await
}
