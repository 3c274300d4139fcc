//! HTTP listener module
//!
//! Owns the bound socket, the accept loop and every connection task.

pub mod listener;

// Re-export main types
pub use listener::{DrainingServer, HttpServer, ServerHandle};
