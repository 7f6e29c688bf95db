// Core interview orchestration without the command-line surface

pub mod agent;
pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod interview;
pub mod scout;
pub mod stats;
pub mod store;
pub mod test_utils;
pub mod tools;
pub mod utils;

pub use error::{Error, Result};
