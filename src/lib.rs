//! Proxy Pulse - Concurrent Proxy Liveness Checker
//!
//! Reads a list of HTTP/HTTPS proxy URLs, probes each one through a
//! bounded worker pool under a shared deadline and keeps the ones that
//! answered.

pub mod app;
pub mod error;
pub mod proxy;

pub use error::Error;
pub use proxy::*;

/// Application result type
pub type Result<T> = std::result::Result<T, Error>;
