//! Persona scouting: an agent searches social notes for real users around a
//! brand or topic and saves what it learns as personas.

pub mod prompts;
pub mod runner;

pub use runner::{ScoutError, ScoutReport, ScoutRunner};
