use codegen_types::*;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let types = vec![
        clean_type(ChatRequest::export_to_string()?),
        clean_type(ChatToolCall::export_to_string()?),
        clean_type(ChatMessage::export_to_string()?),
        clean_type(ChatResponse::export_to_string()?),
        clean_type(AgentInfo::export_to_string()?),
        clean_type(AgentsResponse::export_to_string()?),
        clean_type(ProviderInfo::export_to_string()?),
        clean_type(ProvidersResponse::export_to_string()?),
        clean_type(ErrorResponse::export_to_string()?),
    ];

    let output_dir = Path::new("web/api-types");
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    fs::write(&output_path, types.join("\n\n"))?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');
    let filtered: Vec<&str> = type_def
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
        })
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
