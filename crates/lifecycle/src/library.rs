use std::ffi::CStr;
use std::ptr::NonNull;

use render_abi::StateBlock;

/// The prebuilt renderer, seen from the host.
///
/// The production implementation forwards to the C symbols one-to-one;
/// tests substitute a recording double.
pub trait RenderLibrary {
    fn screen_width(&self) -> i32;
    fn screen_height(&self) -> i32;
    fn window_title(&self) -> Option<&CStr>;

    /// Clears the block and records title and window size.
    ///
    /// # Safety
    /// `block` must point to a live, host-owned state block, and `title`
    /// must stay valid for the lifetime of the context.
    unsafe fn create_context(
        &self,
        block: NonNull<StateBlock>,
        width: i32,
        height: i32,
        title: Option<&CStr>,
    );

    /// Creates the real window. Zero means success.
    ///
    /// # Safety
    /// `block` must have been passed to `create_context` first.
    unsafe fn init_context(&self, block: NonNull<StateBlock>) -> i32;

    /// Pumps window events into the block's input fields. The library may
    /// end the process from inside this call when the window closes.
    ///
    /// # Safety
    /// `block` must be initialized and its frame buffer set.
    unsafe fn poll(&self, block: NonNull<StateBlock>) -> i32;

    /// # Safety
    /// Same as [`RenderLibrary::poll`]; the frame buffer must be valid.
    unsafe fn render(&self, block: NonNull<StateBlock>, animate: bool);

    fn sleep(&self, ms: i32);

    /// Releases window and native handles. Tolerates a null frame buffer.
    ///
    /// # Safety
    /// `block` must have been passed to `create_context` and must not be
    /// used with the library again.
    unsafe fn close(&self, block: NonNull<StateBlock>);
}
