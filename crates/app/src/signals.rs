//! Ctrl-C and SIGTERM stop the frame loop instead of killing the process,
//! so teardown runs on the normal return path.

use lifecycle::CancelToken;

#[cfg(unix)]
mod imp {
    use std::sync::OnceLock;

    use libc::{c_int, sighandler_t, signal, SIGINT, SIGTERM, SIG_ERR};
    use lifecycle::CancelToken;
    use tracing::{debug, warn};

    static TOKEN: OnceLock<CancelToken> = OnceLock::new();

    extern "C" fn on_signal(_signum: c_int) {
        if let Some(token) = TOKEN.get() {
            token.cancel();
        }
    }

    pub fn install(cancel: &CancelToken) {
        if TOKEN.set(cancel.clone()).is_err() {
            return;
        }
        let handler = on_signal as extern "C" fn(c_int) as sighandler_t;
        for signum in [SIGINT, SIGTERM] {
            // SAFETY: `on_signal` only performs an atomic store.
            if unsafe { signal(signum, handler) } == SIG_ERR {
                warn!(signum, "failed to install signal handler");
            }
        }
        debug!("signal handlers installed");
    }
}

#[cfg(not(unix))]
mod imp {
    use lifecycle::CancelToken;

    pub fn install(_cancel: &CancelToken) {}
}

pub fn install(cancel: &CancelToken) {
    imp::install(cancel);
}
