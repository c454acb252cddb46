#![deny(missing_docs)]
//! Onion-model middleware manager for the forge module execution framework.
//!
//! Before-hooks run in registration order, after-hooks in reverse, and
//! on-error hooks in reverse *executed* order — see [`manager`] for the
//! exact semantics the executor relies on.

pub mod adapters;
pub mod logging;
pub mod manager;
pub mod middleware;

pub use adapters::{AfterMiddleware, BeforeMiddleware};
pub use logging::LoggingMiddleware;
pub use manager::{MiddlewareChainError, MiddlewareManager};
pub use middleware::Middleware;
