use crate::error::ToolExecutionError;
use codegen_llm_sdk::tools::Tool;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Callable behind a registered tool. Runs synchronously; callers that must
/// not block an async worker move it onto the blocking pool.
pub type ToolHandler = Arc<dyn Fn(Value) -> Result<Value, ToolExecutionError> + Send + Sync>;

#[derive(Clone)]
struct RegisteredTool {
    definition: Tool,
    handler: ToolHandler,
}

/// Name-keyed map of the tools a session may call.
///
/// Dispatch only: no retries, no timeouts.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool from a raw JSON schema and an untyped callable
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        callable: F,
    ) -> Result<(), ToolExecutionError>
    where
        F: Fn(Value) -> Result<Value, ToolExecutionError> + Send + Sync + 'static,
    {
        let name = name.into();
        let definition = Tool::from_json_schema(name.clone(), description, schema).map_err(|e| {
            ToolExecutionError::InvalidArguments {
                name: name.clone(),
                message: e.to_string(),
            }
        })?;
        self.insert(definition, Arc::new(callable));
        Ok(())
    }

    /// Register a tool whose schema is derived from its argument type
    pub fn register_typed<Args, R, F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        callable: F,
    ) -> Result<(), ToolExecutionError>
    where
        Args: DeserializeOwned + schemars::JsonSchema,
        R: Serialize,
        F: Fn(Args) -> Result<R, ToolExecutionError> + Send + Sync + 'static,
    {
        let name = name.into();
        let definition = Tool::from_type::<Args>()
            .name(name.clone())
            .description(description)
            .build()
            .map_err(|e| ToolExecutionError::InvalidArguments {
                name: name.clone(),
                message: e.to_string(),
            })?;

        let tool_name = name.clone();
        let handler: ToolHandler = Arc::new(move |arguments: Value| {
            let args: Args = serde_json::from_value(arguments).map_err(|e| {
                ToolExecutionError::InvalidArguments {
                    name: tool_name.clone(),
                    message: e.to_string(),
                }
            })?;
            let result = callable(args)?;
            serde_json::to_value(result).map_err(|e| ToolExecutionError::failed(&tool_name, e))
        });

        self.insert(definition, handler);
        Ok(())
    }

    fn insert(&mut self, definition: Tool, handler: ToolHandler) {
        let name = definition.name().to_string();
        if self.tools.contains_key(&name) {
            warn!(tool = %name, "replacing already registered tool");
        }
        self.tools.insert(
            name,
            RegisteredTool {
                definition,
                handler,
            },
        );
    }

    /// Run a tool by name with already parsed arguments
    pub fn execute(&self, name: &str, arguments: Value) -> Result<Value, ToolExecutionError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolExecutionError::UnknownTool {
                name: name.to_string(),
            })?;

        let start = Instant::now();
        let result = (tool.handler)(arguments);
        let elapsed_ms = start.elapsed().as_millis();

        match &result {
            Ok(_) => info!(tool = %name, elapsed_ms, "tool executed"),
            Err(e) => warn!(tool = %name, elapsed_ms, error = %e, "tool failed"),
        }
        result
    }

    /// Definitions to advertise to the model, ordered by name
    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.values().map(|t| t.definition.clone()).collect()
    }

    /// A registry holding only the named tools; unknown names are skipped
    pub fn select(&self, names: &[&str]) -> ToolRegistry {
        let tools = names
            .iter()
            .filter_map(|name| {
                let tool = self.tools.get(*name);
                if tool.is_none() {
                    warn!(tool = %name, "requested tool is not registered");
                }
                tool.map(|t| (name.to_string(), t.clone()))
            })
            .collect();
        ToolRegistry { tools }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
