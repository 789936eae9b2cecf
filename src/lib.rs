//! # git-flatten - Repositories as Prompt Context
//!
//! A Model Context Protocol (MCP) server and command-line tool that turns
//! local directories and remote git repositories into a single prompt-ready
//! document.
//!
//! ## Overview
//!
//! A source is either a local path or a remote reference
//! (`https://host/org/repo`, `host/org/repo`, `git@host:org/repo.git`, ...).
//! Remote references are shallow-cloned into a cache directory and reused
//! while they are fresh. The resulting tree is walked with hidden-file,
//! `.gitignore`, glob and extension filters, and rendered as plain text,
//! Claude-style XML or Markdown.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   MCP Client    │  (Claude, VS Code, etc.)
//! └────────┬────────┘
//!          │ stdio
//! ┌────────▼────────┐
//! │FlattenMcpServer │  (6 tools, 2 prompts)
//! └────────┬────────┘
//! ┌────────▼────────┐
//! │  FlattenClient  │
//! └────────┬────────┘
//!    ┌─────┴─────┬────────────┬──────────┐
//! ┌──▼───┐  ┌────▼─────┐  ┌───▼───┐  ┌───▼────┐
//! │source│  │repo_cache│  │walker │  │ render │
//! └──────┘  └──────────┘  └───────┘  └────────┘
//! ```
//!
//! ## Modules
//!
//! - [`mcp_server`]: MCP protocol server with tools and prompts
//! - [`client`]: Operations composed from the modules below
//! - [`source`]: Classifies inputs as local paths or remote references
//! - [`repo_cache`]: Per-repository clone cache with per-key locking
//! - [`walker`]: Lazy, filtered, ordered file tree traversal
//! - [`render`]: Plain, cxml and Markdown output
//! - [`config`]: Configuration management with environment variable support
//! - [`types`]: MCP request/response types with JSON schema
//! - [`error`]: Error types and result aliases
//! - [`paths`]: Platform directories and path helpers
//!
//! ## Usage Example
//!
//! ```no_run
//! use git_flatten::mcp_server::FlattenMcpServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Serve over stdio (MCP protocol)
//!     FlattenMcpServer::serve_stdio().await?;
//!     Ok(())
//! }
//! ```

/// High-level operations shared by the MCP server and the CLI
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Error types and utilities
pub mod error;

/// MCP server implementation with tools and prompts
pub mod mcp_server;

/// Platform directories and path utilities
pub mod paths;

/// Document rendering in plain, cxml and Markdown formats
pub mod render;

/// Cache of shallow clones keyed by normalized repository identity
pub mod repo_cache;

/// Local path vs remote reference classification
pub mod source;

/// MCP request/response types with JSON schema definitions
pub mod types;

/// Filtered traversal of file trees
pub mod walker;

pub use client::FlattenClient;
pub use error::{FlattenError, Result};
pub use render::OutputFormat;
pub use types::*;
