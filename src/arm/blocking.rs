//! Thread-blocking entry points
//!
//! Blocking calls drive the same futures as the async API on a
//! current-thread runtime owned by the calling thread. No background
//! threads are spawned.
//!
//! A current-thread runtime only runs while its thread is inside
//! [`block_on`], so I/O resources opened on it must not be handed to other
//! threads. The HTTP transport asks [`in_blocking_call`] to keep its
//! connection pool per thread in that case.

use super::error::{ArmError, ArmResult, TransportError};
use std::cell::{Cell, OnceCell};
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};

thread_local! {
    static RUNTIME: OnceCell<Runtime> = const { OnceCell::new() };
    static IN_BLOCKING_CALL: Cell<bool> = const { Cell::new(false) };
}

/// True while the calling thread is driving a future through [`block_on`].
pub fn in_blocking_call() -> bool {
    IN_BLOCKING_CALL.with(Cell::get)
}

/// Clears the flag again when the call returns or unwinds.
struct BlockingCallGuard;

impl BlockingCallGuard {
    fn enter() -> Self {
        IN_BLOCKING_CALL.with(|flag| flag.set(true));
        Self
    }
}

impl Drop for BlockingCallGuard {
    fn drop(&mut self) {
        IN_BLOCKING_CALL.with(|flag| flag.set(false));
    }
}

/// Run `future` to completion on the calling thread.
///
/// Fails with [`ArmError::Configuration`] when called from inside an async
/// runtime, where blocking would stall the executor.
pub fn block_on<T, F>(future: F) -> ArmResult<T>
where
    F: Future<Output = ArmResult<T>>,
{
    if Handle::try_current().is_ok() {
        return Err(ArmError::Configuration(
            "blocking call made from within an async runtime; use the async method instead"
                .to_string(),
        ));
    }

    RUNTIME.with(|cell| {
        if cell.get().is_none() {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(TransportError::Runtime)?;
            let _ = cell.set(runtime);
        }
        match cell.get() {
            Some(runtime) => {
                let _guard = BlockingCallGuard::enter();
                runtime.block_on(future)
            }
            None => Err(ArmError::Configuration("blocking runtime unavailable".to_string())),
        }
    })
}
