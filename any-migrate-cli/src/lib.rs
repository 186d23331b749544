//! any-migrate CLI library
//!
//! Scaffolding helpers used by the `any-migrate` binary (main.rs).

pub mod error;
pub mod scaffold;

pub use error::CliError;
