//! Local tool host: filesystem and shell access for the built-in tools.

use super::{
    EditFileArgs, ListFilesArgs, ReadFileArgs, RunBashArgs, ToolError, ToolHost, ToolInvocation,
    ToolRegistry,
};
use crate::model::{ToolCall, ToolOutcome, ToolSpec};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Executes the built-in tools against the local machine.
///
/// Relative paths resolve against `working_dir`. Commands are not sandboxed
/// and have no timeout.
#[derive(Debug, Clone)]
pub struct LocalToolHost {
    registry: ToolRegistry,
    working_dir: PathBuf,
}

impl LocalToolHost {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry: ToolRegistry::builtin(),
            working_dir: working_dir.into(),
        }
    }

    /// Host rooted at the process's current directory.
    pub fn current_dir() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.working_dir.join(path)
    }

    /// Run a validated invocation, returning its text output.
    pub async fn run(&self, invocation: &ToolInvocation) -> Result<String, ToolError> {
        match invocation {
            ToolInvocation::ListFiles(args) => self.list_files(args).await,
            ToolInvocation::ReadFile(args) => self.read_file(args).await,
            ToolInvocation::RunBash(args) => self.run_bash(args).await,
            ToolInvocation::EditFile(args) => self.edit_file(args).await,
        }
    }

    async fn list_files(&self, args: &ListFilesArgs) -> Result<String, ToolError> {
        let shown = args.path();
        let mut entries = tokio::fs::read_dir(self.resolve(shown))
            .await
            .map_err(|e| ToolError::io("list", shown, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ToolError::io("list", shown, e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        serde_json::to_string_pretty(&names).map_err(|e| ToolError::Execution(e.to_string()))
    }

    async fn read_file(&self, args: &ReadFileArgs) -> Result<String, ToolError> {
        tokio::fs::read_to_string(self.resolve(&args.path))
            .await
            .map_err(|e| ToolError::io("read", &args.path, e))
    }

    async fn run_bash(&self, args: &RunBashArgs) -> Result<String, ToolError> {
        let output = Command::new("bash")
            .arg("-c")
            .arg(&args.command)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ToolError::Execution(format!("failed to spawn bash: {e}")))?;

        tracing::debug!(status = %output.status, "command finished");

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(format!("STDOUT:\n{stdout}\nSTDERR:\n{stderr}"))
    }

    async fn edit_file(&self, args: &EditFileArgs) -> Result<String, ToolError> {
        let path = self.resolve(&args.path);

        if args.search_string.is_empty() {
            tokio::fs::write(&path, &args.replace_string)
                .await
                .map_err(|e| ToolError::io("write", &args.path, e))?;
            return Ok(format!(
                "File '{}' created/overwritten successfully.",
                args.path
            ));
        }

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ToolError::FileNotFound(args.path.clone()));
            }
            Err(e) => return Err(ToolError::io("read", &args.path, e)),
        };

        let updated = contents.replace(&args.search_string, &args.replace_string);
        tokio::fs::write(&path, updated)
            .await
            .map_err(|e| ToolError::io("write", &args.path, e))?;

        Ok(format!("File '{}' edited successfully.", args.path))
    }
}

impl ToolHost for LocalToolHost {
    fn specs(&self) -> &[ToolSpec] {
        self.registry.specs()
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        let result = match ToolInvocation::try_from(call) {
            Ok(invocation) => self.run(&invocation).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(output) => ToolOutcome::success(output),
            Err(e) => {
                tracing::warn!(tool = %call.name, id = %call.id, error = %e, "tool failed");
                e.into()
            }
        }
    }
}
