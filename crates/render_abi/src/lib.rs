#![forbid(unsafe_code)]

//! Layout of the renderer state block.
//!
//! The prebuilt renderer never exposes a header. Everything here was
//! recovered from its binary: the constructor clears `0x430` bytes, the
//! event loop writes input at the tail and the render call reads the frame
//! buffer pointer at `0x10`. The host treats the block as raw bytes and only
//! touches it through the accessors below.

use core::ffi::{c_char, c_void};

#[cfg(not(target_pointer_width = "64"))]
compile_error!("the renderer state block layout is only known for 64-bit targets");

pub const STATE_BLOCK_SIZE: usize = 0x430;
pub const STATE_BLOCK_ALIGN: usize = 8;

pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
    /// The host may write this field. Everything else belongs to the library.
    pub host_writable: bool,
}

impl Field {
    pub const fn end(&self) -> usize {
        self.offset + self.size
    }
}

pub const TITLE: Field = Field {
    name: "title",
    offset: 0x00,
    size: 8,
    host_writable: true,
};
pub const WINDOW_WIDTH: Field = Field {
    name: "window_width",
    offset: 0x08,
    size: 4,
    host_writable: true,
};
pub const WINDOW_HEIGHT: Field = Field {
    name: "window_height",
    offset: 0x0C,
    size: 4,
    host_writable: true,
};
pub const FRAME_BUFFER: Field = Field {
    name: "frame_buffer",
    offset: 0x10,
    size: 8,
    host_writable: true,
};
pub const KEYBOARD_STATE: Field = Field {
    name: "keyboard_state",
    offset: 0x18,
    size: 0x41C - 0x18,
    host_writable: false,
};
pub const MOUSE_X: Field = Field {
    name: "mouse_x",
    offset: 0x41C,
    size: 4,
    host_writable: false,
};
pub const MOUSE_Y: Field = Field {
    name: "mouse_y",
    offset: 0x420,
    size: 4,
    host_writable: false,
};
pub const MOUSE_BUTTONS: Field = Field {
    name: "mouse_buttons",
    offset: 0x424,
    size: 4,
    host_writable: false,
};
pub const WINDOW_HANDLE: Field = Field {
    name: "window_handle",
    offset: 0x428,
    size: 8,
    host_writable: false,
};

/// Every field in offset order.
pub const LAYOUT: [Field; 9] = [
    TITLE,
    WINDOW_WIDTH,
    WINDOW_HEIGHT,
    FRAME_BUFFER,
    KEYBOARD_STATE,
    MOUSE_X,
    MOUSE_Y,
    MOUSE_BUTTONS,
    WINDOW_HANDLE,
];

const fn layout_is_sound() -> bool {
    let mut cursor = 0;
    let mut i = 0;
    while i < LAYOUT.len() {
        let field = LAYOUT[i];
        if field.offset != cursor {
            return false;
        }
        // Scalars sit on their natural alignment; the keyboard array is bytes.
        if (field.size == 4 || field.size == 8) && field.offset % field.size != 0 {
            return false;
        }
        cursor = field.end();
        i += 1;
    }
    cursor == STATE_BLOCK_SIZE
}

const _: () = assert!(layout_is_sound());
const _: () = assert!(core::mem::size_of::<StateBlock>() == STATE_BLOCK_SIZE);
const _: () = assert!(core::mem::align_of::<StateBlock>() == STATE_BLOCK_ALIGN);
const _: () = assert!(core::mem::size_of::<*const c_char>() == TITLE.size);

/// Mouse button bitmask stored at `0x424`. The library sets bit 0 on press
/// and clears it on release.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MouseButtons(pub u32);

impl MouseButtons {
    pub const PRIMARY: u32 = 1 << 0;

    pub fn primary_pressed(self) -> bool {
        self.0 & Self::PRIMARY != 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

/// The 1072-byte block shared with the renderer.
///
/// Stored as plain bytes so the compiler never gets a say in the layout.
/// Pointers are kept as native-endian addresses, exactly what the library's
/// C struct would contain.
#[repr(C, align(8))]
#[derive(Clone)]
pub struct StateBlock {
    bytes: [u8; STATE_BLOCK_SIZE],
}

impl StateBlock {
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0; STATE_BLOCK_SIZE],
        }
    }

    pub fn as_bytes(&self) -> &[u8; STATE_BLOCK_SIZE] {
        &self.bytes
    }

    /// Raw access for code standing in for the library, e.g. test doubles.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; STATE_BLOCK_SIZE] {
        &mut self.bytes
    }

    pub fn title(&self) -> *const c_char {
        self.read_addr(TITLE) as *const c_char
    }

    pub fn set_title(&mut self, title: *const c_char) {
        self.write_addr(TITLE, title as usize);
    }

    pub fn window_width(&self) -> i32 {
        i32::from_ne_bytes(self.read(WINDOW_WIDTH))
    }

    pub fn window_height(&self) -> i32 {
        i32::from_ne_bytes(self.read(WINDOW_HEIGHT))
    }

    pub fn set_window_size(&mut self, width: i32, height: i32) {
        self.write(WINDOW_WIDTH, width.to_ne_bytes());
        self.write(WINDOW_HEIGHT, height.to_ne_bytes());
    }

    pub fn frame_buffer(&self) -> *mut u8 {
        self.read_addr(FRAME_BUFFER) as *mut u8
    }

    pub fn set_frame_buffer(&mut self, pixels: *mut u8) {
        self.write_addr(FRAME_BUFFER, pixels as usize);
    }

    pub fn has_frame_buffer(&self) -> bool {
        !self.frame_buffer().is_null()
    }

    pub fn keyboard_state(&self) -> &[u8] {
        &self.bytes[KEYBOARD_STATE.offset..KEYBOARD_STATE.end()]
    }

    pub fn mouse_position(&self) -> (i32, i32) {
        (
            i32::from_ne_bytes(self.read(MOUSE_X)),
            i32::from_ne_bytes(self.read(MOUSE_Y)),
        )
    }

    pub fn mouse_buttons(&self) -> MouseButtons {
        MouseButtons(u32::from_ne_bytes(self.read(MOUSE_BUTTONS)))
    }

    /// Native window object, e.g. an `NSWindow*`. Opaque to the host.
    pub fn window_handle(&self) -> *mut c_void {
        self.read_addr(WINDOW_HANDLE) as *mut c_void
    }

    fn read<const N: usize>(&self, field: Field) -> [u8; N] {
        debug_assert_eq!(field.size, N, "field {} read with wrong width", field.name);
        let mut out = [0_u8; N];
        out.copy_from_slice(&self.bytes[field.offset..field.offset + N]);
        out
    }

    fn write<const N: usize>(&mut self, field: Field, value: [u8; N]) {
        debug_assert!(field.host_writable, "field {} is library-owned", field.name);
        debug_assert_eq!(field.size, N, "field {} written with wrong width", field.name);
        self.bytes[field.offset..field.offset + N].copy_from_slice(&value);
    }

    fn read_addr(&self, field: Field) -> usize {
        usize::from_ne_bytes(self.read(field))
    }

    fn write_addr(&mut self, field: Field, addr: usize) {
        self.write(field, addr.to_ne_bytes());
    }
}

impl Default for StateBlock {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl core::fmt::Debug for StateBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StateBlock")
            .field("title", &self.title())
            .field("window_width", &self.window_width())
            .field("window_height", &self.window_height())
            .field("frame_buffer", &self.frame_buffer())
            .field("mouse_position", &self.mouse_position())
            .field("mouse_buttons", &self.mouse_buttons())
            .field("window_handle", &self.window_handle())
            .finish_non_exhaustive()
    }
}

/// Byte length of an RGBA8 frame buffer, or `None` for non-positive sizes
/// and sizes that overflow `usize`.
pub fn frame_buffer_len(width: i32, height: i32) -> Option<usize> {
    if width <= 0 || height <= 0 {
        return None;
    }
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}
