//! Built-in tool definitions and typed invocations.
//!
//! Each tool's argument struct sits next to its schema so the two are
//! maintained as one unit.

use super::ToolError;
use crate::model::{ToolCall, ToolSpec};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// The fixed set of tools the agent can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ListFiles,
    ReadFile,
    RunBash,
    EditFile,
}

impl ToolKind {
    /// All tools, in registry order.
    pub const ALL: [ToolKind; 4] = [
        ToolKind::ListFiles,
        ToolKind::ReadFile,
        ToolKind::RunBash,
        ToolKind::EditFile,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ListFiles => "list_files",
            Self::ReadFile => "read_file",
            Self::RunBash => "run_bash",
            Self::EditFile => "edit_file",
        }
    }

    /// Exact-match lookup by tool name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ListFiles => {
                "Get a list of all files and folders within a specified directory."
            }
            Self::ReadFile => "Read the complete contents of a specified file.",
            Self::RunBash => "Execute a bash command and return its standard output and error.",
            Self::EditFile => {
                "Edit a file by replacing a specific string with a new one. \
                 Creates the file if it doesn't exist."
            }
        }
    }

    pub fn input_schema(self) -> Value {
        match self {
            Self::ListFiles => json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The directory path to inspect (defaults to the current directory)."
                    }
                }
            }),
            Self::ReadFile => json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The path to the file to be read."
                    }
                },
                "required": ["path"]
            }),
            Self::RunBash => json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The bash command to execute."
                    }
                },
                "required": ["command"]
            }),
            Self::EditFile => json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The path to the file to be edited."
                    },
                    "search_string": {
                        "type": "string",
                        "description": "The text to search for. If empty, the file is created or overwritten."
                    },
                    "replace_string": {
                        "type": "string",
                        "description": "The text to replace the search_string with."
                    }
                },
                "required": ["path", "search_string", "replace_string"]
            }),
        }
    }

    pub fn spec(self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListFilesArgs {
    #[serde(default)]
    pub path: Option<String>,
}

impl ListFilesArgs {
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadFileArgs {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunBashArgs {
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditFileArgs {
    pub path: String,
    pub search_string: String,
    pub replace_string: String,
}

/// A validated request to run one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    ListFiles(ListFilesArgs),
    ReadFile(ReadFileArgs),
    RunBash(RunBashArgs),
    EditFile(EditFileArgs),
}

impl TryFrom<&ToolCall> for ToolInvocation {
    type Error = ToolError;

    fn try_from(call: &ToolCall) -> Result<Self, Self::Error> {
        let kind =
            ToolKind::from_name(&call.name).ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        // Some providers send `null` for tools without required arguments.
        let input = match &call.input {
            Value::Null => json!({}),
            other => other.clone(),
        };

        let invocation = match kind {
            ToolKind::ListFiles => Self::ListFiles(parse_args(kind, input)?),
            ToolKind::ReadFile => Self::ReadFile(parse_args(kind, input)?),
            ToolKind::RunBash => Self::RunBash(parse_args(kind, input)?),
            ToolKind::EditFile => Self::EditFile(parse_args(kind, input)?),
        };
        Ok(invocation)
    }
}

fn parse_args<T: DeserializeOwned>(kind: ToolKind, input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput {
        tool: kind.name(),
        reason: e.to_string(),
    })
}
