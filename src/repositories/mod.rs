//! Bundled [`Repository`](crate::migration::Repository) implementations

pub mod json_file;
pub mod memory;

pub use json_file::{JsonFileRepository, FILE_SCHEME};
pub use memory::{MemoryRepository, MEMORY_SCHEME};
