//! JSON-RPC Ingress Layer
//!
//! Delivers `(command, tier)` submissions from local callers into the
//! daemon's tier queues over JSON-RPC 2.0.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig};
