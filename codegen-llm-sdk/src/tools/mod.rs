use crate::error::LlmError;
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;

/// A tool that can be called by an LLM
#[derive(Debug, Clone)]
pub struct Tool {
    name: String,
    description: String,
    parameters: RootSchema,
}

impl Tool {
    /// Create a tool from a type that implements JsonSchema
    pub fn from_type<T: schemars::JsonSchema>() -> ToolBuilder<T> {
        ToolBuilder {
            name: None,
            description: None,
            _phantom: PhantomData,
        }
    }

    /// Create a tool from a raw JSON Schema value
    pub fn from_json_schema(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
    ) -> Result<Self, LlmError> {
        let parameters: RootSchema =
            serde_json::from_value(schema).map_err(|e| LlmError::InvalidToolSchema {
                message: e.to_string(),
            })?;

        Ok(Tool {
            name: name.into(),
            description: description.into(),
            parameters,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &RootSchema {
        &self.parameters
    }

    /// Parameters schema as a plain JSON value
    pub fn parameters_json(&self) -> Value {
        serde_json::to_value(&self.parameters).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// Builder for type-safe tools
pub struct ToolBuilder<T> {
    name: Option<String>,
    description: Option<String>,
    _phantom: PhantomData<T>,
}

impl<T: schemars::JsonSchema> ToolBuilder<T> {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn build(self) -> Result<Tool, LlmError> {
        // Inline subschemas: allOf/$ref have limited support across vendors
        use schemars::gen::SchemaSettings;

        let name = self.name.ok_or_else(|| LlmError::InvalidToolSchema {
            message: "Tool name is required".to_string(),
        })?;

        let settings = SchemaSettings::draft07().with(|s| {
            s.inline_subschemas = true;
        });
        let generator = settings.into_generator();
        let schema = generator.into_root_schema_for::<T>();

        Ok(Tool {
            name,
            description: self.description.unwrap_or_default(),
            parameters: schema,
        })
    }
}

/// A tool call from the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    id: String,
    name: String,
    arguments: Value,
}

impl ToolCall {
    pub fn new(id: String, name: String, arguments: Value) -> Self {
        Self {
            id,
            name,
            arguments,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse arguments into a strongly-typed struct
    pub fn parse_arguments<T>(&self) -> Result<T, LlmError>
    where
        T: for<'de> Deserialize<'de>,
    {
        serde_json::from_value(self.arguments.clone()).map_err(|e| LlmError::ToolArgumentParse {
            tool_name: self.name.clone(),
            source: e,
        })
    }

    /// Get raw JSON arguments
    pub fn raw_arguments(&self) -> &Value {
        &self.arguments
    }
}

/// Convert unified tools to a provider's wire format
pub trait ProviderToolFormat {
    type ProviderTool: Serialize;

    fn to_provider_tool(tool: &Tool) -> Self::ProviderTool;

    /// The `tools` array of a request. One entry per tool unless the
    /// provider groups them.
    fn to_provider_tools(tools: &[Tool]) -> Vec<Self::ProviderTool> {
        tools.iter().map(Self::to_provider_tool).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    struct TestParams {
        query: String,
        limit: u32,
    }

    #[test]
    fn test_tool_creation() {
        let tool = Tool::from_type::<TestParams>()
            .name("search")
            .description("Search database")
            .build()
            .unwrap();

        assert_eq!(tool.name(), "search");
        assert_eq!(tool.description(), "Search database");
        assert_eq!(tool.parameters_json()["type"], "object");
    }

    #[test]
    fn test_tool_without_name_is_rejected() {
        let result = Tool::from_type::<TestParams>().build();
        assert!(matches!(result, Err(LlmError::InvalidToolSchema { .. })));
    }

    #[test]
    fn test_tool_from_json_schema() {
        let tool = Tool::from_json_schema(
            "get_base_repo",
            "Return the base repository",
            serde_json::json!({"type": "object", "properties": {}}),
        )
        .unwrap();
        assert_eq!(tool.name(), "get_base_repo");
    }

    #[test]
    fn test_tool_call_parsing() {
        let args = serde_json::json!({
            "query": "rust",
            "limit": 10
        });

        let call = ToolCall::new("call_123".to_string(), "search".to_string(), args);

        let params: TestParams = call.parse_arguments().unwrap();
        assert_eq!(params.query, "rust");
        assert_eq!(params.limit, 10);
    }
}
