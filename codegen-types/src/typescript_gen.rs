pub fn generate_typescript_definitions(
    type_names: &[&str],
) -> Result<String, Box<dyn std::error::Error>> {
    if type_names.is_empty() {
        return Err("No type names provided".into());
    }

    let mut definitions = Vec::new();

    for name in type_names {
        let type_def = export_type(name)?;
        let cleaned = clean_type(type_def);

        if !cleaned.trim().is_empty() {
            definitions.push(cleaned);
        }
    }

    Ok(definitions.join("\n\n"))
}

fn export_type(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    use crate::*;

    let result = match name {
        "ChatRequest" => ChatRequest::export_to_string()?,
        "ChatResponse" => ChatResponse::export_to_string()?,
        "ChatMessage" => ChatMessage::export_to_string()?,
        "ChatToolCall" => ChatToolCall::export_to_string()?,

        "AgentInfo" => AgentInfo::export_to_string()?,
        "AgentsResponse" => AgentsResponse::export_to_string()?,
        "ProviderInfo" => ProviderInfo::export_to_string()?,
        "ProvidersResponse" => ProvidersResponse::export_to_string()?,

        "ErrorResponse" => ErrorResponse::export_to_string()?,

        _ => {
            return Err(format!(
                "Unknown type: '{}'. Available types can be found in codegen-types/src/",
                name
            )
            .into());
        }
    };

    Ok(result)
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    let lines: Vec<&str> = type_def.lines().collect();

    let filtered: Vec<&str> = lines
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
        })
        .cloned()
        .collect();

    filtered.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_single_type() {
        let result = generate_typescript_definitions(&["ChatRequest"]).unwrap();
        assert!(result.contains("ChatRequest"));
        assert!(result.contains("user_id: string"));
    }

    #[test]
    fn test_generate_multiple_types() {
        let result = generate_typescript_definitions(&["ChatMessage", "AgentInfo"]).unwrap();
        assert!(result.contains("ChatMessage"));
        assert!(result.contains("AgentInfo"));
    }

    #[test]
    fn test_unknown_type_error() {
        let result = generate_typescript_definitions(&["NonExistentType"]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Unknown type"));
    }

    #[test]
    fn test_empty_type_names() {
        let result = generate_typescript_definitions(&[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cleaned_output() {
        let result = generate_typescript_definitions(&["ChatResponse"]).unwrap();
        assert!(!result.contains("import type"));
        assert!(!result.contains("This file was generated"));
    }
}
