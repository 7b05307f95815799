mod ffi;
mod signals;

use lifecycle::{exit_hook, CancelToken, HostConfig, HostError, Session, SystemAllocator};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("gfx_host failed: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run() -> Result<(), HostError> {
    let renderer = ffi::PrebuiltRenderer;
    let allocator = SystemAllocator;
    let cancel = CancelToken::new();
    signals::install(&cancel);

    let session = Session::start(&renderer, &allocator)?;

    // The renderer exits the process itself when the window closes, so the
    // loop below normally never returns.
    // SAFETY: `session` is not moved and outlives the guard, which is
    // declared after it and therefore dropped first. The hook and `run`
    // both only take `&Session`.
    let exit_guard = unsafe { exit_hook::arm(&session as *const _) };

    let summary = session.run(&HostConfig::default(), &cancel)?;
    drop(exit_guard);

    info!(frames = summary.frames, fps = summary.fps, "renderer stopped");
    Ok(())
}
