/// Failure of a single tool invocation.
///
/// These never abort a turn; the caller records them as the tool's result.
#[derive(Debug, thiserror::Error)]
pub enum ToolExecutionError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments for {name}: {message}")]
    InvalidArguments { name: String, message: String },

    #[error("Tool {name} failed: {message}")]
    Failed { name: String, message: String },
}

impl ToolExecutionError {
    pub fn failed(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Failed {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Name of the tool the error belongs to
    pub fn tool_name(&self) -> &str {
        match self {
            Self::UnknownTool { name }
            | Self::InvalidArguments { name, .. }
            | Self::Failed { name, .. } => name,
        }
    }
}
