//! Shared helpers for file system work and external tool invocation.

pub mod fs;
pub mod process;

pub use process::ToolInvocation;
