//! Tool host trait.

use crate::model::{ToolCall, ToolOutcome, ToolSpec};
use std::future::Future;

/// Trait for tool execution hosts.
///
/// Implementations provide tool specifications and execute tool calls.
/// This is the boundary between the model loop and side effects: every call
/// resolves to an outcome, failures included, so the loop never has to
/// special-case a tool.
pub trait ToolHost: Send + Sync {
    /// Get available tool specifications, in a stable order.
    fn specs(&self) -> &[ToolSpec];

    /// Execute a tool call.
    fn execute(&self, call: &ToolCall) -> impl Future<Output = ToolOutcome> + Send;
}
