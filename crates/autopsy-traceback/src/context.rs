//! The fault currently being handled
//!
//! Error handlers mark the fault they are dealing with so that code further
//! down (a logging helper, a hook) can format it without it being passed
//! along explicitly. Synchronous scopes live on a thread-local stack; async
//! scopes are tied to the tokio task.

use crate::fault::Fault;
use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

thread_local! {
    static HANDLING: RefCell<Vec<Arc<Fault>>> = const { RefCell::new(Vec::new()) };
}

tokio::task_local! {
    static TASK_HANDLING: Arc<Fault>;
}

/// Pops the thread-local entry even when the scope unwinds
struct Scope;

impl Scope {
    fn enter(fault: Arc<Fault>) -> Self {
        HANDLING.with(|stack| stack.borrow_mut().push(fault));
        Scope
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        HANDLING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run `f` with `fault` as the current fault on this thread
pub fn handling<R>(fault: impl Into<Arc<Fault>>, f: impl FnOnce() -> R) -> R {
    let _scope = Scope::enter(fault.into());
    f()
}

/// Run `future` with `fault` as the current fault of the task, across awaits
pub async fn handling_async<F>(fault: impl Into<Arc<Fault>>, future: F) -> F::Output
where
    F: Future,
{
    TASK_HANDLING.scope(fault.into(), future).await
}

/// The innermost fault being handled, if any.
///
/// A synchronous scope always sits inside the current poll, so it takes
/// precedence over the task scope.
pub fn current() -> Option<Arc<Fault>> {
    HANDLING
        .with(|stack| stack.borrow().last().cloned())
        .or_else(|| TASK_HANDLING.try_with(Arc::clone).ok())
}
