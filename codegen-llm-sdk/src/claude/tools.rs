use super::types::ClaudeTool;
use crate::tools::{ProviderToolFormat, Tool};
use serde_json::{Map, Value};

pub struct ClaudeToolFormat;

impl ProviderToolFormat for ClaudeToolFormat {
    type ProviderTool = ClaudeTool;

    fn to_provider_tool(tool: &Tool) -> Self::ProviderTool {
        ClaudeTool {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            input_schema: input_schema(tool.parameters_json()),
        }
    }
}

/// Drop the draft marker and make sure the top level is an object schema
fn input_schema(schema: Value) -> Value {
    let mut map = match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.remove("$schema");
    map.remove("title");
    map.entry("type")
        .or_insert_with(|| Value::String("object".to_string()));
    if map.get("type") == Some(&Value::String("object".to_string())) {
        map.entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
    }
    Value::Object(map)
}
