//! Tool registry, typed dispatch, and local execution.

pub mod errors;
mod host;
mod local;
mod registry;
mod types;

pub use errors::ToolError;
pub use host::ToolHost;
pub use local::LocalToolHost;
pub use registry::ToolRegistry;
pub use types::{
    EditFileArgs, ListFilesArgs, ReadFileArgs, RunBashArgs, ToolInvocation, ToolKind,
};
