//! Executors a suspended context can be resumed on.
//!
//! The engine never creates threads itself. It is handed an event-loop
//! executor and a blocking executor by the host, both usually backed by the
//! tokio runtime the server runs on.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

/// A unit of work handed to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs continuations.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Schedules `task`.
    fn execute(&self, task: Task);

    /// Whether tasks run on the network event loop.
    fn is_event_loop(&self) -> bool {
        false
    }
}

/// Runs tasks as tokio tasks on the runtime's worker threads.
#[derive(Debug, Clone)]
pub struct EventLoopExecutor {
    handle: Handle,
}

impl EventLoopExecutor {
    /// Creates an executor spawning onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Executor for EventLoopExecutor {
    fn execute(&self, task: Task) {
        self.handle.spawn(async move { task() });
    }

    fn is_event_loop(&self) -> bool {
        true
    }
}

/// Runs tasks on tokio's blocking thread pool.
#[derive(Debug, Clone)]
pub struct BlockingExecutor {
    handle: Handle,
}

impl BlockingExecutor {
    /// Creates an executor offloading onto `handle`'s blocking pool.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Executor for BlockingExecutor {
    fn execute(&self, task: Task) {
        drop(self.handle.spawn_blocking(task));
    }
}

/// Runs tasks inline on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectExecutor;

impl Executor for DirectExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}

/// Runs tasks inline and reports itself as the event loop, for hosts that
/// drive requests from a single thread.
#[derive(Debug, Clone, Copy, Default)]
struct InlineEventLoop;

impl Executor for InlineEventLoop {
    fn execute(&self, task: Task) {
        task();
    }

    fn is_event_loop(&self) -> bool {
        true
    }
}

/// The pair of executors a deployment runs with.
#[derive(Debug, Clone)]
pub struct Executors {
    event_loop: Arc<dyn Executor>,
    blocking: Arc<dyn Executor>,
}

impl Executors {
    /// Uses the given executors.
    pub fn new(event_loop: Arc<dyn Executor>, blocking: Arc<dyn Executor>) -> Self {
        Self {
            event_loop,
            blocking,
        }
    }

    /// Event-loop and blocking executors backed by `handle`.
    pub fn tokio(handle: &Handle) -> Self {
        Self::new(
            Arc::new(EventLoopExecutor::new(handle.clone())),
            Arc::new(BlockingExecutor::new(handle.clone())),
        )
    }

    /// Both executors run tasks inline on the calling thread.
    pub fn inline() -> Self {
        Self::new(Arc::new(InlineEventLoop), Arc::new(DirectExecutor))
    }

    /// The event-loop executor.
    pub fn event_loop(&self) -> &Arc<dyn Executor> {
        &self.event_loop
    }

    /// The blocking executor.
    pub fn blocking(&self) -> &Arc<dyn Executor> {
        &self.blocking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_direct_runs_inline() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        DirectExecutor.execute(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(ran.load(Ordering::SeqCst));
        assert!(!DirectExecutor.is_event_loop());
    }

    #[test]
    fn test_inline_pair() {
        let executors = Executors::inline();
        assert!(executors.event_loop().is_event_loop());
        assert!(!executors.blocking().is_event_loop());
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        executors
            .event_loop()
            .execute(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_tokio_executors() {
        let executors = Executors::tokio(&Handle::current());
        assert!(executors.event_loop().is_event_loop());
        assert!(!executors.blocking().is_event_loop());

        let (tx, rx) = tokio::sync::oneshot::channel();
        executors.blocking().execute(Box::new(move || {
            let _ = tx.send(std::thread::current().name().map(ToString::to_string));
        }));
        assert!(rx.await.is_ok());

        let (tx, rx) = tokio::sync::oneshot::channel();
        executors.event_loop().execute(Box::new(move || {
            let _ = tx.send(());
        }));
        assert!(rx.await.is_ok());
    }
}
