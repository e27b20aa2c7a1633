//! Proxy module for parsing and checking proxies
//!
//! This module provides functionality for:
//! - Parsing proxy URLs into descriptors, skipping malformed lines
//! - Probing proxies concurrently under a shared deadline
//! - Saving the proxies that answered

pub mod checker;
pub mod context;
pub mod models;
pub mod parser;
pub mod transport;

pub use checker::{CheckerConfig, ProxyChecker};
pub use context::ProbeContext;
pub use models::{ProxyDescriptor, ProxyType};
pub use parser::ProxyParser;
pub use transport::{ProbeError, ReqwestTransport, Transport};
