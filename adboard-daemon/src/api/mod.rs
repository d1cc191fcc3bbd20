//! JSON-RPC API for daemon IPC.
//!
//! This module provides the JSON-RPC interface the dashboard shell uses to
//! read credential status, save tokens, and load the performance view.

pub mod handlers;
pub mod server;

pub use handlers::{
    AdboardApiImpl, AdboardApiServer, ApiState, ConnectResponse, StatusResponse, ViewResponse,
};
pub use server::{start_server, ServerHandle};
