use std::cell::{Ref, RefCell};
use std::ffi::CStr;
use std::fmt;
use std::io::{self, Write};

use render_abi::StateBlock;
use tracing::{debug, info};

use crate::alloc::HostAllocator;
use crate::error::HostError;
use crate::exit_hook::Teardown;
use crate::frame_loop::{self, CancelToken, HostConfig, LoopSummary};
use crate::library::RenderLibrary;
use crate::resources::{FrameBuffer, StateBlockHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Unstarted,
    BlockAllocated,
    ContextCreated,
    BufferAllocated,
    ContextInitialized,
    Running,
    Closed,
}

/// What the session has acquired so far.
#[derive(Debug)]
struct Held {
    block: Option<StateBlockHandle>,
    frame_buffer: Option<FrameBuffer>,
    context_open: bool,
    stage: Stage,
}

/// Everything the host owns for one renderer context: the state block, the
/// frame buffer, and whether the library still holds a context on them.
///
/// Teardown runs once, on whichever comes first: an explicit
/// [`Session::teardown`], the armed exit hook, or drop. The held resources
/// sit behind a `RefCell` so the exit hook can tear down through a shared
/// reference while [`Session::run`] is still on the stack.
pub struct Session<'a, L: RenderLibrary, A: HostAllocator> {
    library: &'a L,
    allocator: &'a A,
    held: RefCell<Held>,
}

impl<'a, L: RenderLibrary, A: HostAllocator> Session<'a, L, A> {
    /// Allocates the block, creates the context, attaches the frame buffer
    /// and initializes the window. On error everything acquired so far has
    /// already been released.
    pub fn start(library: &'a L, allocator: &'a A) -> Result<Self, HostError> {
        let session = Self {
            library,
            allocator,
            held: RefCell::new(Held {
                block: None,
                frame_buffer: None,
                context_open: false,
                stage: Stage::Unstarted,
            }),
        };
        let opened = session.open(&mut session.held.borrow_mut());
        if let Err(err) = opened {
            debug!(stage = ?session.stage(), "startup failed: {err}");
            return Err(err);
        }
        Ok(session)
    }

    fn open(&self, held: &mut Held) -> Result<(), HostError> {
        let block = held.block.insert(StateBlockHandle::allocate(self.allocator)?);
        let block_ptr = block.as_ptr();
        advance(held, Stage::BlockAllocated);

        let width = self.library.screen_width();
        let height = self.library.screen_height();
        let title = self.library.window_title();
        // Reject a bad size before the library records it.
        FrameBuffer::layout_for(width, height)?;

        // SAFETY: the block is live and owned by this session; the title
        // borrows from the library and lives as long as it does.
        unsafe { self.library.create_context(block_ptr, width, height, title) };
        held.context_open = true;
        advance(held, Stage::ContextCreated);
        let title_text = title.map(CStr::to_string_lossy).unwrap_or_default();
        info!(width, height, title = %title_text, "renderer context created");

        let frame_buffer = held
            .frame_buffer
            .insert(FrameBuffer::allocate(self.allocator, width, height)?);
        let pixels = frame_buffer.as_mut_ptr();
        let bytes = frame_buffer.len();
        if let Some(block) = held.block.as_mut() {
            block.get_mut().set_frame_buffer(pixels);
        }
        advance(held, Stage::BufferAllocated);
        info!(bytes, "frame buffer allocated");

        // SAFETY: context created above and the frame buffer is attached.
        let status = unsafe { self.library.init_context(block_ptr) };
        if status != 0 {
            return Err(HostError::InitializationFailed { status });
        }
        advance(held, Stage::ContextInitialized);
        Ok(())
    }

    /// Runs the frame loop until `cancel` is set or the library ends the
    /// process.
    ///
    /// No borrow of the held resources is kept across library calls, so an
    /// exit hook firing inside `gfx_loop` can still tear the session down.
    pub fn run(
        &self,
        config: &HostConfig,
        cancel: &CancelToken,
    ) -> Result<LoopSummary, HostError> {
        let block_ptr = {
            let mut held = self.held.borrow_mut();
            let block = match (&held.block, held.stage) {
                (Some(block), Stage::ContextInitialized | Stage::Running) => block,
                _ => return Err(HostError::SessionClosed),
            };
            debug_assert!(block.get().has_frame_buffer());
            let block_ptr = block.as_ptr();
            advance(&mut held, Stage::Running);
            block_ptr
        };
        info!("renderer running; close the window to quit");

        // SAFETY: the stage check guarantees an initialized context with its
        // frame buffer attached. Both stay owned by `self` until teardown,
        // and teardown from inside the loop only happens while the process
        // is exiting, after which the loop never resumes.
        let summary = unsafe { frame_loop::run_frames(self.library, block_ptr, config, cancel) };
        info!(frames = summary.frames, "frame loop stopped");
        Ok(summary)
    }

    /// Closes the context, frees the frame buffer, then frees the block.
    /// Each step runs at most once; later calls are no-ops.
    pub fn teardown(&mut self) {
        let held = self.held.get_mut();
        release_all(self.library, self.allocator, held, Progress::Log);
    }

    pub fn stage(&self) -> Stage {
        self.held.borrow().stage
    }

    /// Current view of the shared block, e.g. to read input after a poll.
    pub fn state_block(&self) -> Option<Ref<'_, StateBlock>> {
        Ref::filter_map(self.held.borrow(), |held| {
            held.block.as_ref().map(StateBlockHandle::get)
        })
        .ok()
    }

    pub fn frame_buffer_len(&self) -> Option<usize> {
        self.held.borrow().frame_buffer.as_ref().map(FrameBuffer::len)
    }
}

/// Where teardown reports its steps. Thread-locals may already be destroyed
/// when an `atexit` callback runs, and the `tracing` subscriber relies on
/// them, so the exit path writes straight to stderr.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Progress {
    Log,
    Stderr,
}

impl Progress {
    fn step(self, message: fmt::Arguments<'_>) {
        match self {
            Self::Log => info!("{message}"),
            Self::Stderr => {
                let _ = writeln!(io::stderr(), "{message}");
            }
        }
    }
}

fn release_all<L: RenderLibrary, A: HostAllocator>(
    library: &L,
    allocator: &A,
    held: &mut Held,
    progress: Progress,
) {
    if held.stage == Stage::Closed {
        return;
    }

    if held.context_open {
        held.context_open = false;
        if let Some(block) = &held.block {
            progress.step(format_args!("window closing"));
            // SAFETY: the context was created on this block and is closed
            // exactly once here.
            unsafe { library.close(block.as_ptr()) };
        }
    }

    if let Some(frame_buffer) = held.frame_buffer.take() {
        progress.step(format_args!("freeing frame buffer ({} bytes)", frame_buffer.len()));
        if let Some(block) = held.block.as_mut() {
            block.get_mut().set_frame_buffer(std::ptr::null_mut());
        }
        // SAFETY: allocated by `allocator`; the context that read it is
        // closed and the block no longer points at it.
        unsafe { frame_buffer.release(allocator) };
    }

    if let Some(block) = held.block.take() {
        // SAFETY: allocated by `allocator`; the library is done with it.
        unsafe { block.release(allocator) };
        progress.step(format_args!("cleanup complete"));
    }

    if progress == Progress::Log {
        advance(held, Stage::Closed);
    } else {
        held.stage = Stage::Closed;
    }
}

fn advance(held: &mut Held, stage: Stage) {
    debug!(from = ?held.stage, to = ?stage, "lifecycle");
    held.stage = stage;
}

impl<L: RenderLibrary, A: HostAllocator> Teardown for Session<'_, L, A> {
    fn teardown_at_exit(&self) {
        // A borrow can only be live if the process exits from inside
        // `start`, before the hook is armed; leave the resources to the OS.
        let Ok(mut held) = self.held.try_borrow_mut() else {
            return;
        };
        release_all(self.library, self.allocator, &mut held, Progress::Stderr);
    }
}

impl<L: RenderLibrary, A: HostAllocator> Drop for Session<'_, L, A> {
    fn drop(&mut self) {
        self.teardown();
    }
}
