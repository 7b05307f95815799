use std::ffi::{c_char, c_double, c_int, c_long, c_void, CStr};
use std::ptr::NonNull;

use lifecycle::RenderLibrary;
use render_abi::StateBlock;

#[cfg(not(render_stub))]
unsafe extern "C" {
    pub fn gfx_create_context(
        state: *mut StateBlock,
        window_width: c_int,
        window_height: c_int,
        window_title: *const c_char,
    ) -> *mut c_void;
    pub fn gfx_init_context(state: *mut StateBlock) -> c_int;
    pub fn gfx_loop(state: *mut StateBlock, reserved: c_double, reserved_ptr: c_long) -> c_int;
    pub fn gfx_render(state: *mut StateBlock, animate: c_int);
    pub fn gfx_sleep(ms: c_int);
    pub fn gfx_close(state: *mut StateBlock);
    pub fn gfx_get_width_screen() -> c_int;
    pub fn gfx_get_height_screen() -> c_int;
    pub fn gfx_get_window_title() -> *const c_char;
}

// Stand-in used when the prebuilt renderer is not available at build time.
// It keeps the block contract and ends the process on the first poll, the
// way the real library does when its window is closed.

#[cfg(render_stub)]
const STUB_WIDTH: c_int = 800;
#[cfg(render_stub)]
const STUB_HEIGHT: c_int = 600;
#[cfg(render_stub)]
static STUB_TITLE: &CStr = c"gfx_host (stub renderer)";

#[cfg(render_stub)]
#[no_mangle]
pub unsafe extern "C" fn gfx_create_context(
    state: *mut StateBlock,
    window_width: c_int,
    window_height: c_int,
    window_title: *const c_char,
) -> *mut c_void {
    if let Some(block) = unsafe { state.as_mut() } {
        *block = StateBlock::zeroed();
        block.set_title(window_title);
        block.set_window_size(window_width, window_height);
    }
    state.cast()
}

#[cfg(render_stub)]
#[no_mangle]
pub unsafe extern "C" fn gfx_init_context(_state: *mut StateBlock) -> c_int {
    0
}

#[cfg(render_stub)]
#[no_mangle]
pub unsafe extern "C" fn gfx_loop(
    _state: *mut StateBlock,
    _reserved: c_double,
    _reserved_ptr: c_long,
) -> c_int {
    tracing::warn!("stub renderer has no window; exiting as if it was closed");
    std::process::exit(0)
}

#[cfg(render_stub)]
#[no_mangle]
pub unsafe extern "C" fn gfx_render(_state: *mut StateBlock, _animate: c_int) {}

#[cfg(render_stub)]
#[no_mangle]
pub unsafe extern "C" fn gfx_sleep(_ms: c_int) {}

#[cfg(render_stub)]
#[no_mangle]
pub unsafe extern "C" fn gfx_close(_state: *mut StateBlock) {}

#[cfg(render_stub)]
#[no_mangle]
pub unsafe extern "C" fn gfx_get_width_screen() -> c_int {
    STUB_WIDTH
}

#[cfg(render_stub)]
#[no_mangle]
pub unsafe extern "C" fn gfx_get_height_screen() -> c_int {
    STUB_HEIGHT
}

#[cfg(render_stub)]
#[no_mangle]
pub unsafe extern "C" fn gfx_get_window_title() -> *const c_char {
    STUB_TITLE.as_ptr()
}

/// The linked renderer, one call per entry point.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrebuiltRenderer;

impl RenderLibrary for PrebuiltRenderer {
    fn screen_width(&self) -> i32 {
        unsafe { gfx_get_width_screen() }
    }

    fn screen_height(&self) -> i32 {
        unsafe { gfx_get_height_screen() }
    }

    fn window_title(&self) -> Option<&CStr> {
        let title = unsafe { gfx_get_window_title() };
        if title.is_null() {
            return None;
        }
        // The library returns a static string.
        Some(unsafe { CStr::from_ptr(title) })
    }

    unsafe fn create_context(
        &self,
        block: NonNull<StateBlock>,
        width: i32,
        height: i32,
        title: Option<&CStr>,
    ) {
        let title = title.map_or(std::ptr::null(), CStr::as_ptr);
        // The returned context pointer aliases the block; nothing to keep.
        let _ = unsafe { gfx_create_context(block.as_ptr(), width, height, title) };
    }

    unsafe fn init_context(&self, block: NonNull<StateBlock>) -> i32 {
        unsafe { gfx_init_context(block.as_ptr()) }
    }

    unsafe fn poll(&self, block: NonNull<StateBlock>) -> i32 {
        unsafe { gfx_loop(block.as_ptr(), 0.0, 0) }
    }

    unsafe fn render(&self, block: NonNull<StateBlock>, animate: bool) {
        unsafe { gfx_render(block.as_ptr(), c_int::from(animate)) }
    }

    fn sleep(&self, ms: i32) {
        unsafe { gfx_sleep(ms) }
    }

    unsafe fn close(&self, block: NonNull<StateBlock>) {
        unsafe { gfx_close(block.as_ptr()) }
    }
}
