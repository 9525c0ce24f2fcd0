pub mod error;
pub mod project;
pub mod registry;

pub use error::ToolExecutionError;
pub use project::{project_structure, register_project_tools, ProjectPaths};
pub use registry::{ToolHandler, ToolRegistry};
