//! Tool surface - descriptors, catalog, dispatch and the tool handlers

mod catalog;
mod definition;
mod router;
mod syntax;
mod write_code;

pub use catalog::{ToolCatalog, ToolKind};
pub use definition::{ParamSpec, ParamType, ToolDescriptor};
pub use router::ToolDispatcher;
pub use syntax::SourceFormat;
pub use write_code::{CodeWriter, WriteOutcome};
