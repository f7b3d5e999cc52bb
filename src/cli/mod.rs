//! # CLI Module
//!
//! The `specrouter` binary.
//!
//! ### `check`
//!
//! Load a document, run structural validation and print the route table:
//!
//! ```bash
//! specrouter check --spec petstore.yaml
//! ```
//!
//! Validation issues are printed to stderr and the process exits with code 1.
//!
//! ### `serve`
//!
//! Serve a document with echo controllers bound to every `operationId`:
//!
//! ```bash
//! specrouter serve --spec petstore.yaml --addr 127.0.0.1:8080
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{execute, format_route_table, run_cli, Cli, Commands};
