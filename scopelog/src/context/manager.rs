//! Scope execution and key/value access for the active scope.
//!
//! Every lookup refers to the innermost live scope. Outside any scope,
//! reads return `None` (or an empty map) and writes are silently dropped.

use super::storage;
use super::{ContextValue, Scope};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

fn inherited() -> Scope {
    storage::current().map_or_else(Scope::new, |parent| parent.branch())
}

/// Runs `future` inside a new scope inheriting a snapshot of the active one.
///
/// The snapshot is taken when `run` is called, so a future handed to
/// `tokio::spawn` inherits from the spawning scope. The scope stays bound
/// across every suspension point of `future` and is released when it
/// completes, fails, panics or is dropped. The output of `future` is
/// returned unchanged.
///
/// # Examples
///
/// ```
/// # tokio_test::block_on(async {
/// use scopelog::context;
///
/// context::run(async {
///     context::set("user", "al");
///     context::run(async {
///         context::set("user", "bo");
///     })
///     .await;
///     assert_eq!(context::get_str("user").as_deref(), Some("al"));
/// })
/// .await;
/// # });
/// ```
pub fn run<F: Future>(future: F) -> impl Future<Output = F::Output> {
    storage::bind_task(Arc::new(inherited()), future)
}

/// Runs `future` inside a fresh scope seeded from `values`.
///
/// Unlike [`run`], nothing is inherited from the active scope.
pub fn run_with<F: Future>(
    values: HashMap<String, ContextValue>,
    future: F,
) -> impl Future<Output = F::Output> {
    storage::bind_task(Arc::new(Scope::from_values(values)), future)
}

/// Runs a synchronous callback inside a new inheriting scope.
pub fn run_sync<R>(f: impl FnOnce() -> R) -> R {
    storage::bind_sync(Arc::new(inherited()), f)
}

/// Returns true if a scope is active.
#[must_use]
pub fn is_active() -> bool {
    storage::current_binding().is_some()
}

/// Gets a value from the active scope.
#[must_use]
pub fn get(key: &str) -> Option<ContextValue> {
    storage::current().and_then(|scope| scope.get(key))
}

/// Gets a value from the active scope rendered as a string.
#[must_use]
pub fn get_str(key: &str) -> Option<String> {
    get(key).and_then(|value| value.to_header_value())
}

/// Sets a value in the active scope. Does nothing outside a scope.
pub fn set(key: impl Into<String>, value: impl Into<ContextValue>) {
    if let Some(scope) = storage::current() {
        scope.set(key, value.into());
    }
}

/// Returns a shallow copy of the active scope, or an empty map.
#[must_use]
pub fn get_all() -> HashMap<String, ContextValue> {
    storage::current().map(|scope| scope.snapshot()).unwrap_or_default()
}

pub(crate) fn get_or_insert_with(
    key: &str,
    make: impl FnOnce() -> ContextValue,
) -> Option<ContextValue> {
    storage::current().map(|scope| scope.get_or_insert_with(key, make))
}
