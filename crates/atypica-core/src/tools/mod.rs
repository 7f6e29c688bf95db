pub mod capability;
pub mod model_caller_impl;
pub mod search_backend;
pub mod services;
pub mod static_tool;
pub mod static_tools;
pub mod toolset;

pub use capability::Capabilities;
pub use model_caller_impl::DefaultModelCaller;
pub use search_backend::HttpContentSearch;
pub use services::{ContentSearch, ModelCallError, ModelCaller, ToolServices};
pub use static_tool::{StaticTool, StaticToolContext, StaticToolError, StaticToolErased};
pub use toolset::ToolSet;
