//! Boxed-future helpers for trait object erasure.
//!
//! Replaces the dual-target `WasmCompat*` bounds some sibling crates carry —
//! this framework targets native async runtimes only, so a plain boxed
//! `Send` future is sufficient.

use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
