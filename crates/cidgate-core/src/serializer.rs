use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::{error, trace};

tokio::task_local! {
    // Set for the duration of every critical section.
    static IN_SECTION: ();
}

/// Exclusive gate around every sequence of store calls that touches the
/// namespace root.
///
/// Waiters are admitted in FIFO order. Once admitted, a critical section
/// runs to completion on its own task even if the caller stops waiting for
/// it, so an abandoned request can never leave the root half-mutated while
/// the next section starts.
#[derive(Debug, Default)]
pub struct RootSerializer {
    gate: Arc<Mutex<()>>,
}

impl RootSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `section` with the gate held and return its output.
    ///
    /// The gate is released on every exit path before the output (or
    /// panic) reaches the caller. Errors returned by `section` are passed
    /// through untouched.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a critical section; nested acquisition
    /// would otherwise deadlock. A panic inside `section` is resumed in the
    /// caller. If the runtime shuts down while the section is running, the
    /// section is cancelled and the caller unwinds with a `cancelled` payload
    /// after the cancellation is logged.
    pub async fn run_exclusive<F, Fut, T>(&self, section: F) -> T
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if IN_SECTION.try_with(|_| ()).is_ok() {
            panic!("RootSerializer::run_exclusive is not re-entrant");
        }

        let guard = Arc::clone(&self.gate).lock_owned().await;
        trace!("root gate acquired");

        let task = tokio::spawn(IN_SECTION.scope((), async move {
            let output = section().await;
            drop(guard);
            output
        }));

        join_section(task.await)
    }

    /// Returns `true` while some critical section holds the gate.
    pub fn is_held(&self) -> bool {
        self.gate.try_lock().is_err()
    }
}

/// Unwrap the section task's result, unwinding the caller on panic or
/// cancellation.
fn join_section<T>(joined: Result<T, JoinError>) -> T {
    match joined {
        Ok(output) => output,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            error!(error = %e, "critical section cancelled by runtime shutdown");
            std::panic::resume_unwind(Box::new(format!("critical section cancelled: {e}")))
        }
    }
}
