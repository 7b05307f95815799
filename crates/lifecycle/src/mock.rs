//! Recording stand-ins for the renderer and the heap. Both write to one
//! journal so tests can assert the interleaving of library calls and
//! allocations.

use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::ffi::{CStr, CString};
use std::ptr::NonNull;
use std::rc::Rc;

use render_abi::{StateBlock, MOUSE_X, MOUSE_Y, WINDOW_HANDLE};

use crate::alloc::{HostAllocator, SystemAllocator};
use crate::frame_loop::CancelToken;
use crate::library::RenderLibrary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Allocate { bytes: usize },
    AllocateFailed { bytes: usize },
    Release { bytes: usize },
    QueryWidth,
    QueryHeight,
    QueryTitle,
    Create {
        width: i32,
        height: i32,
        title: Option<String>,
    },
    Init { frame_buffer_set: bool },
    Poll,
    Render { animate: bool, frame_buffer_set: bool },
    Sleep(i32),
    Close { frame_buffer_set: bool },
}

impl Event {
    pub(crate) fn is_library_call(&self) -> bool {
        !matches!(
            self,
            Self::Allocate { .. } | Self::AllocateFailed { .. } | Self::Release { .. }
        )
    }
}

pub(crate) type Journal = Rc<RefCell<Vec<Event>>>;

pub(crate) fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

pub(crate) struct MockLibrary {
    journal: Journal,
    width: i32,
    height: i32,
    title: CString,
    init_status: i32,
    cancel_after: Option<(usize, CancelToken)>,
    exit_during: Option<(usize, CancelToken)>,
    polls: Cell<usize>,
    pixels_written: Cell<usize>,
}

impl MockLibrary {
    pub(crate) fn new(journal: &Journal, width: i32, height: i32) -> Self {
        Self {
            journal: Rc::clone(journal),
            width,
            height,
            title: CString::new("mock window").unwrap(),
            init_status: 0,
            cancel_after: None,
            exit_during: None,
            polls: Cell::new(0),
            pixels_written: Cell::new(0),
        }
    }

    pub(crate) fn with_title(mut self, title: &str) -> Self {
        self.title = CString::new(title).unwrap();
        self
    }

    pub(crate) fn with_init_status(mut self, status: i32) -> Self {
        self.init_status = status;
        self
    }

    /// Behaves like a window closing during the `polls`-th poll.
    pub(crate) fn cancel_after_polls(mut self, polls: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((polls, token));
        self
    }

    /// Behaves like the library calling `exit()` during the `polls`-th
    /// poll: the armed exit hook runs, then the loop is stopped because a
    /// real process would not come back.
    pub(crate) fn exit_during_poll(mut self, polls: usize, token: CancelToken) -> Self {
        self.exit_during = Some((polls, token));
        self
    }

    pub(crate) fn pixels_written(&self) -> usize {
        self.pixels_written.get()
    }

    fn record(&self, event: Event) {
        self.journal.borrow_mut().push(event);
    }
}

impl RenderLibrary for MockLibrary {
    fn screen_width(&self) -> i32 {
        self.record(Event::QueryWidth);
        self.width
    }

    fn screen_height(&self) -> i32 {
        self.record(Event::QueryHeight);
        self.height
    }

    fn window_title(&self) -> Option<&CStr> {
        self.record(Event::QueryTitle);
        Some(self.title.as_c_str())
    }

    unsafe fn create_context(
        &self,
        block: NonNull<StateBlock>,
        width: i32,
        height: i32,
        title: Option<&CStr>,
    ) {
        let block = unsafe { &mut *block.as_ptr() };
        *block = StateBlock::zeroed();
        block.set_title(title.map_or(std::ptr::null(), CStr::as_ptr));
        block.set_window_size(width, height);
        self.record(Event::Create {
            width,
            height,
            title: title.map(|t| t.to_string_lossy().into_owned()),
        });
    }

    unsafe fn init_context(&self, block: NonNull<StateBlock>) -> i32 {
        let block = unsafe { &mut *block.as_ptr() };
        self.record(Event::Init {
            frame_buffer_set: block.has_frame_buffer(),
        });
        if self.init_status == 0 {
            block.as_bytes_mut()[WINDOW_HANDLE.offset..WINDOW_HANDLE.end()]
                .copy_from_slice(&0xD00D_usize.to_ne_bytes());
        }
        self.init_status
    }

    unsafe fn poll(&self, block: NonNull<StateBlock>) -> i32 {
        let polls = self.polls.get() + 1;
        self.polls.set(polls);

        let block = unsafe { &mut *block.as_ptr() };
        let bytes = block.as_bytes_mut();
        bytes[MOUSE_X.offset..MOUSE_X.end()].copy_from_slice(&(polls as i32).to_ne_bytes());
        bytes[MOUSE_Y.offset..MOUSE_Y.end()].copy_from_slice(&(polls as i32).to_ne_bytes());
        self.record(Event::Poll);

        if let Some((limit, token)) = &self.cancel_after {
            if polls >= *limit {
                token.cancel();
            }
        }
        if let Some((limit, token)) = &self.exit_during {
            if polls == *limit {
                crate::exit_hook::fire();
                token.cancel();
            }
        }
        0
    }

    unsafe fn render(&self, block: NonNull<StateBlock>, animate: bool) {
        let block = unsafe { block.as_ref() };
        let pixels = block.frame_buffer();
        if !pixels.is_null() {
            unsafe { pixels.write_bytes(0xFF, render_abi::BYTES_PER_PIXEL) };
            self.pixels_written.set(self.pixels_written.get() + 1);
        }
        self.record(Event::Render {
            animate,
            frame_buffer_set: !pixels.is_null(),
        });
    }

    fn sleep(&self, ms: i32) {
        self.record(Event::Sleep(ms));
    }

    unsafe fn close(&self, block: NonNull<StateBlock>) {
        let block = unsafe { block.as_ref() };
        self.record(Event::Close {
            frame_buffer_set: block.has_frame_buffer(),
        });
    }
}

pub(crate) struct MockAllocator {
    journal: Journal,
    fail_size: Option<usize>,
}

impl MockAllocator {
    pub(crate) fn new(journal: &Journal) -> Self {
        Self {
            journal: Rc::clone(journal),
            fail_size: None,
        }
    }

    /// Simulates heap exhaustion for requests of exactly `bytes`.
    pub(crate) fn fail_on_size(mut self, bytes: usize) -> Self {
        self.fail_size = Some(bytes);
        self
    }
}

impl HostAllocator for MockAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let bytes = layout.size();
        if self.fail_size == Some(bytes) {
            self.journal
                .borrow_mut()
                .push(Event::AllocateFailed { bytes });
            return None;
        }
        let ptr = SystemAllocator.allocate(layout)?;
        self.journal.borrow_mut().push(Event::Allocate { bytes });
        Some(ptr)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        self.journal.borrow_mut().push(Event::Release {
            bytes: layout.size(),
        });
        unsafe { SystemAllocator.release(ptr, layout) };
    }
}
