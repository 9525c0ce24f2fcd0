use super::types::*;
use crate::tools::{ProviderToolFormat, Tool};
use serde_json::{Map, Value};

pub struct GeminiToolFormat;

impl GeminiToolFormat {
    fn declaration(tool: &Tool) -> GeminiFunctionDeclaration {
        let mut parameters = tool.parameters_json();
        sanitize_schema(&mut parameters);
        GeminiFunctionDeclaration {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters,
        }
    }
}

impl ProviderToolFormat for GeminiToolFormat {
    type ProviderTool = GeminiTool;

    fn to_provider_tool(tool: &Tool) -> Self::ProviderTool {
        GeminiTool {
            function_declarations: Some(vec![Self::declaration(tool)]),
        }
    }

    /// Gemini takes every function as a declaration of a single tool entry
    fn to_provider_tools(tools: &[Tool]) -> Vec<Self::ProviderTool> {
        if tools.is_empty() {
            return Vec::new();
        }
        vec![GeminiTool {
            function_declarations: Some(tools.iter().map(Self::declaration).collect()),
        }]
    }
}

/// Reduce a JSON Schema to the OpenAPI subset Gemini accepts: no `$schema`,
/// `title`, `definitions` or `additionalProperties`, and `["T", "null"]`
/// types become `T` with `nullable: true`.
fn sanitize_schema(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in ["$schema", "title", "definitions", "additionalProperties"] {
                map.remove(key);
            }
            collapse_nullable_type(map);
            for (key, child) in map.iter_mut() {
                // Keys under `properties` are property names, not keywords
                if key == "properties" {
                    if let Value::Object(properties) = child {
                        properties.values_mut().for_each(sanitize_schema);
                        continue;
                    }
                }
                sanitize_schema(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sanitize_schema),
        _ => {}
    }
}

fn collapse_nullable_type(map: &mut Map<String, Value>) {
    let types = match map.get("type") {
        Some(Value::Array(types)) => types.clone(),
        _ => return,
    };
    let nullable = types.iter().any(|t| t == "null");
    match types.into_iter().find(|t| t != "null") {
        Some(concrete) => {
            map.insert("type".to_string(), concrete);
            if nullable {
                map.insert("nullable".to_string(), Value::Bool(true));
            }
        }
        None => {
            map.remove("type");
        }
    }
}
