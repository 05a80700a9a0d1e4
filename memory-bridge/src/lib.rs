//! Client for the knowledge-graph memory bridge.
//!
//! The research agent keeps a persistent knowledge graph of brands,
//! instruments and facts behind an HTTP bridge. This crate provides the
//! [`KnowledgeGraph`] capability, its HTTP implementation [`BridgeClient`],
//! discovery of the bridge URL, and the [`MemoryToolbox`] that turns model
//! tool calls into graph operations.

/// Knowledge-graph capability and HTTP bridge client.
pub mod client;
/// Resolution of the bridge URL from flags, environment or a local tunnel.
pub mod discovery;
/// Error types returned by bridge operations.
pub mod error;
/// Function-calling definitions and dispatch for memory tools.
pub mod tools;
/// Knowledge-graph payload types.
pub mod types;

pub use client::{BridgeClient, BridgeConfig, KnowledgeGraph, NGROK_SKIP_HEADER};
pub use discovery::{BRIDGE_URL_ENV_VAR, discover_bridge_url};
pub use error::{MemoryError, Result};
pub use tools::{MemoryToolbox, ToolDefinition};
pub use types::*;
