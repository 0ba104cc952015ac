//! # FashionOS
//!
//! Server and CLI around `fashionos-core`: the HTTP API, command line
//! tools, TOML configuration and the AI casting client.

pub mod api;
pub mod casting;
pub mod cli;
pub mod config;
