//! Command handlers for the mcpscope CLI.

pub mod auth;
pub mod mcp;
pub mod serve;
