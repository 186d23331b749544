//! Bundled [`Driver`](crate::migration::Driver) implementations

pub mod shell;

pub use shell::ShellDriver;
