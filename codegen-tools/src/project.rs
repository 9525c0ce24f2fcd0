//! Built-in tools that expose the project template to the model.

use crate::error::ToolExecutionError;
use crate::registry::ToolRegistry;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub const GET_BASE_REPO: &str = "get_base_repo";
pub const GET_PROJECT_STRUCTURE: &str = "get_project_structure";

/// Files never included in a structure snapshot
pub const SKIPPED_FILES: &[&str] = &["pnpm-lock.yaml", ".env.vault", "README.md"];

/// Arguments for tools that take none
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// Where the project tools read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPaths {
    /// JSON snapshot of the base template project
    pub base_repo_path: PathBuf,
    /// Root of the project tree to snapshot
    pub project_root: PathBuf,
}

/// Load the base template snapshot
pub fn load_base_repo(path: &Path) -> std::io::Result<Value> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Snapshot a directory tree as
/// `{root_name: {"files": {name: contents}, "directories": {name: {...}}}}`.
///
/// File contents are decoded lossily; files in [`SKIPPED_FILES`] are left out.
pub fn project_structure(root: &Path) -> std::io::Result<Value> {
    if !root.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Project root is not a directory: {}", root.display()),
        ));
    }

    let mut tree = empty_node();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = match entry.path().strip_prefix(root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let components: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let Some((name, parents)) = components.split_last() else {
            continue;
        };

        let parent = descend(&mut tree, parents);
        if entry.file_type().is_dir() {
            insert(parent, "directories", name, empty_node());
        } else if entry.file_type().is_file() {
            if SKIPPED_FILES.contains(&name.as_str()) {
                continue;
            }
            let bytes = std::fs::read(entry.path())?;
            let contents = String::from_utf8_lossy(&bytes).into_owned();
            insert(parent, "files", name, Value::String(contents));
        }
    }

    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());
    debug!(root = %root.display(), "captured project structure");

    let mut snapshot = Map::new();
    snapshot.insert(root_name, tree);
    Ok(Value::Object(snapshot))
}

fn empty_node() -> Value {
    let mut node = Map::new();
    node.insert("files".to_string(), Value::Object(Map::new()));
    node.insert("directories".to_string(), Value::Object(Map::new()));
    Value::Object(node)
}

fn insert(node: &mut Value, kind: &str, name: &str, value: Value) {
    if let Some(children) = node.get_mut(kind).and_then(Value::as_object_mut) {
        children.entry(name.to_string()).or_insert(value);
    }
}

/// Walk down `directories` entries, creating any that are missing
fn descend<'a>(node: &'a mut Value, path: &[String]) -> &'a mut Value {
    let mut current = node;
    for dir in path {
        insert(current, "directories", dir, empty_node());
        current = &mut current["directories"][dir.as_str()];
    }
    current
}

/// Register `get_base_repo` and `get_project_structure` against `paths`
pub fn register_project_tools(
    registry: &mut ToolRegistry,
    paths: &ProjectPaths,
) -> Result<(), ToolExecutionError> {
    let base_repo_path = paths.base_repo_path.clone();
    registry.register_typed(
        GET_BASE_REPO,
        "Return the base repo structure of the Next.js template project as JSON.",
        move |_: NoArgs| {
            load_base_repo(&base_repo_path).map_err(|e| ToolExecutionError::failed(GET_BASE_REPO, e))
        },
    )?;

    let project_root = paths.project_root.clone();
    registry.register_typed(
        GET_PROJECT_STRUCTURE,
        "Return the current project file tree, with file contents, as JSON.",
        move |_: NoArgs| {
            project_structure(&project_root)
                .map_err(|e| ToolExecutionError::failed(GET_PROJECT_STRUCTURE, e))
        },
    )?;

    Ok(())
}
