//! Scope binding strategies.
//!
//! Two strategies sit behind the same lookup:
//!
//! - **Task**: a `tokio` task-local, which follows the logical async call
//!   chain across `.await` points regardless of the worker thread polling it.
//! - **Thread**: an explicit push/restore stack for synchronous callers with
//!   no async scope active. Restoration happens in a `Drop` guard, so it runs
//!   on return and on unwind alike.
//!
//! Lookup prefers the task binding and falls back to the thread stack.

use super::Scope;
use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static TASK_SCOPE: Arc<Scope>;
}

thread_local! {
    static THREAD_SCOPES: RefCell<Vec<Arc<Scope>>> = const { RefCell::new(Vec::new()) };
}

/// Where the innermost scope is currently bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Bound to the running async task.
    Task,
    /// Bound to the current thread's explicit stack.
    Thread,
}

/// Returns the innermost live scope, if any.
pub(crate) fn current() -> Option<Arc<Scope>> {
    TASK_SCOPE
        .try_with(Arc::clone)
        .ok()
        .or_else(|| THREAD_SCOPES.with(|stack| stack.borrow().last().cloned()))
}

/// Returns how the innermost scope is bound, if any.
pub fn current_binding() -> Option<Binding> {
    if TASK_SCOPE.try_with(|_| ()).is_ok() {
        Some(Binding::Task)
    } else if THREAD_SCOPES.with(|stack| !stack.borrow().is_empty()) {
        Some(Binding::Thread)
    } else {
        None
    }
}

/// Runs `future` with `scope` bound to the task.
pub(crate) async fn bind_task<F: Future>(scope: Arc<Scope>, future: F) -> F::Output {
    TASK_SCOPE.scope(scope, future).await
}

/// Runs `f` with `scope` bound, using the task binding when one is active.
pub(crate) fn bind_sync<R>(scope: Arc<Scope>, f: impl FnOnce() -> R) -> R {
    if current_binding() == Some(Binding::Task) {
        TASK_SCOPE.sync_scope(scope, f)
    } else {
        let _guard = ThreadScopeGuard::push(scope);
        f()
    }
}

/// Pops the pushed scope when dropped.
struct ThreadScopeGuard {
    depth: usize,
}

impl ThreadScopeGuard {
    fn push(scope: Arc<Scope>) -> Self {
        let depth = THREAD_SCOPES.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(scope);
            stack.len()
        });
        Self { depth }
    }
}

impl Drop for ThreadScopeGuard {
    fn drop(&mut self) {
        THREAD_SCOPES.with(|stack| stack.borrow_mut().truncate(self.depth - 1));
    }
}
