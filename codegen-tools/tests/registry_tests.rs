use codegen_tools::{project, register_project_tools, ProjectPaths, ToolExecutionError, ToolRegistry};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_select_keeps_handlers_usable_across_threads() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("index.ts"), "export {}")?;
    let base_repo = dir.path().join("base.json");
    fs::write(&base_repo, "{\"base\": true}")?;

    let mut registry = ToolRegistry::new();
    register_project_tools(
        &mut registry,
        &ProjectPaths {
            base_repo_path: base_repo,
            project_root: dir.path().to_path_buf(),
        },
    )?;

    let manager_tools = Arc::new(registry.select(&[project::GET_BASE_REPO]));
    assert_eq!(manager_tools.names(), vec![project::GET_BASE_REPO]);

    let tools = Arc::clone(&manager_tools);
    let result = std::thread::spawn(move || tools.execute(project::GET_BASE_REPO, json!({})))
        .join()
        .expect("tool thread panicked")?;
    assert_eq!(result, json!({"base": true}));

    let err = manager_tools
        .execute(project::GET_PROJECT_STRUCTURE, json!({}))
        .unwrap_err();
    assert!(matches!(err, ToolExecutionError::UnknownTool { .. }));
    Ok(())
}

#[test]
fn test_definitions_carry_object_schemas() {
    let dir = TempDir::new().unwrap();
    let mut registry = ToolRegistry::new();
    register_project_tools(
        &mut registry,
        &ProjectPaths {
            base_repo_path: dir.path().join("base.json"),
            project_root: dir.path().to_path_buf(),
        },
    )
    .unwrap();

    for tool in registry.definitions() {
        assert_eq!(tool.parameters_json()["type"], json!("object"));
        assert!(!tool.description().is_empty());
    }
}
