// SPDX-FileCopyrightText: 2026 Skiff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait, registry, sandbox policy, and built-in tools for Skiff.
//!
//! The [`ToolRegistry`] validates arguments against each tool's JSON Schema
//! before any executor runs, and every built-in consults the
//! [`SandboxPolicy`] before touching the shell, the filesystem, or the network.
//!
//! Built-in tools:
//! - [`builtin::BashTool`] -- run shell commands
//! - [`builtin::ReadTool`] -- read files with line numbers
//! - [`builtin::GlobTool`] -- find files by pattern
//! - [`builtin::GrepTool`] -- search file contents
//! - [`builtin::WebFetchTool`] -- fetch a URL as text

pub mod builtin;
pub mod policy;
pub mod tool;

pub use builtin::{BuiltinOptions, register_builtins};
pub use policy::{Denial, SandboxPolicy};
pub use tool::{Tool, ToolOutput, ToolRegistry};
