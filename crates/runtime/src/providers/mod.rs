//! LLM provider backends.
//!
//! Each provider implements [`crate::model::Backend`] for its specific API.

mod anthropic;

pub use anthropic::{AnthropicBackend, AnthropicBackendBuilder, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
