//! Runs teardown when the renderer ends the process from inside a call.
//!
//! The renderer calls `exit()` when its window closes, so the frame loop
//! never returns and nothing on the stack is dropped. While a hook is armed
//! an `atexit` callback reaches the armed target and tears it down instead.
//! Only one target can be armed at a time.
//!
//! Thread-locals may already be destroyed when the callback runs, so nothing
//! on that path may log through `tracing` or panic.

use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, Once, PoisonError};

use tracing::{debug, warn};

pub trait Teardown {
    /// Called from the `atexit` callback. Must be idempotent, must not
    /// panic and must not emit `tracing` events.
    fn teardown_at_exit(&self);
}

struct Armed {
    target: *const (),
    run: unsafe fn(*const ()),
}

// SAFETY: the pointer is only dereferenced on the thread that exits the
// process, while the arming thread is blocked inside a library call.
unsafe impl Send for Armed {}

static ARMED: Mutex<Option<Armed>> = Mutex::new(None);
static REGISTER: Once = Once::new();

/// Disarms the hook on drop.
#[must_use = "dropping the guard disarms the exit hook"]
#[derive(Debug)]
pub struct ExitHookGuard {
    _not_send: PhantomData<*mut ()>,
}

impl Drop for ExitHookGuard {
    fn drop(&mut self) {
        if slot().take().is_some() {
            debug!("exit hook disarmed");
        }
    }
}

/// Arms `target` to be torn down if the process exits while the guard lives.
///
/// The target is only ever reached through a shared reference, so callers
/// may keep using `&T` while the hook is armed.
///
/// # Safety
/// `target` must stay valid and must not move until the returned guard is
/// dropped.
pub unsafe fn arm<T: Teardown>(target: *const T) -> ExitHookGuard {
    REGISTER.call_once(|| {
        // SAFETY: `run_at_exit` is a plain `extern "C" fn()` with no captures.
        if unsafe { libc::atexit(run_at_exit) } != 0 {
            warn!("atexit registration failed; cleanup only runs on normal return");
        }
    });

    let previous = slot().replace(Armed {
        target: target.cast(),
        run: run_erased::<T>,
    });
    if previous.is_some() {
        warn!("exit hook re-armed; previous target will not be torn down at exit");
    }
    debug!("exit hook armed");

    ExitHookGuard {
        _not_send: PhantomData,
    }
}

unsafe fn run_erased<T: Teardown>(target: *const ()) {
    // SAFETY: `target` was a `*const T` when armed and the guard is still alive.
    unsafe { (*target.cast::<T>()).teardown_at_exit() }
}

extern "C" fn run_at_exit() {
    fire();
}

/// Runs the armed teardown at most once. Returns whether one was armed.
pub(crate) fn fire() -> bool {
    let Some(armed) = slot().take() else {
        return false;
    };
    // SAFETY: upheld by the contract of `arm`.
    unsafe { (armed.run)(armed.target) };
    true
}

fn slot() -> MutexGuard<'static, Option<Armed>> {
    ARMED.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serializes tests that arm the process-wide hook.
#[cfg(test)]
pub(crate) fn lock_for_test() -> MutexGuard<'static, ()> {
    static TEST_LOCK: Mutex<()> = Mutex::new(());
    TEST_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
