//! Skiff runtime — the agent loop, its tools, and LLM backends.
//!
//! # Overview
//!
//! The runtime is organized around these concepts:
//!
//! - **Agent**: resolves one user request by alternating model calls and tool
//!   execution until the model answers with plain text.
//! - **Backend**: a trait abstracting LLM providers (Anthropic, etc.).
//! - **ToolHost**: a trait for whatever executes tool calls; the built-in
//!   [`LocalToolHost`] offers `list_files`, `read_file`, `run_bash` and
//!   `edit_file` against a working directory.
//!
//! # Example
//!
//! ```no_run
//! use runtime::{Agent, AnthropicBackend, LocalToolHost};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = AnthropicBackend::builder("sk-ant-api03-...", "claude-3-5-sonnet-20241022").build();
//! let agent = Agent::new(backend, LocalToolHost::current_dir()?);
//!
//! let completion = agent.run("What files are here?", &CancellationToken::new()).await?;
//! println!("{}", completion.answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
mod conversation;
mod error;
pub mod model;
pub mod providers;
pub mod tools;

pub use agent::{Agent, AgentEvent, Completion, DEFAULT_MAX_CYCLES};
pub use conversation::Conversation;
pub use error::{Error, Result};
pub use model::{
    Backend, Message, ModelError, Part, Role, ToolCall, ToolOutcome, ToolResult, ToolSpec, Usage,
};
pub use providers::{AnthropicBackend, AnthropicBackendBuilder};
pub use tools::{LocalToolHost, ToolError, ToolHost, ToolKind, ToolRegistry};
