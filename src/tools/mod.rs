//! Tool registry and executor.

pub mod arguments;
pub mod builtin;
pub mod error;
pub mod registry;
pub mod search;
pub mod types;
pub mod validation;

pub use arguments::ToolInput;
pub use builtin::ToolKind;
pub use error::{ToolError, ToolErrorKind};
pub use registry::{ToolExecutionContext, ToolRegistry};
pub use search::{SearchCache, SearchProvider, SearchQuery, SearchResult};
pub use types::{ToolCategory, ToolDefinition, ToolMetadata, ToolParameters, ToolVisibility};
