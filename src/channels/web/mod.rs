//! Web gateway: REST API over the case management store.

pub mod auth;
pub mod extract;
pub mod handlers;
pub mod server;
pub mod types;

pub use server::{GatewayState, build_router, start_server};
