use std::alloc::Layout;
use std::ptr::NonNull;

use render_abi::{frame_buffer_len, StateBlock};

use crate::alloc::HostAllocator;
use crate::error::{HostError, Resource};

/// Heap-owned state block. Released explicitly by the session; dropping the
/// handle alone leaks it.
#[derive(Debug)]
pub struct StateBlockHandle {
    ptr: NonNull<StateBlock>,
}

impl StateBlockHandle {
    pub const LAYOUT: Layout = Layout::new::<StateBlock>();

    pub fn allocate<A: HostAllocator>(allocator: &A) -> Result<Self, HostError> {
        let ptr = allocator
            .allocate(Self::LAYOUT)
            .ok_or(HostError::OutOfMemory {
                resource: Resource::StateBlock,
                bytes: Self::LAYOUT.size(),
            })?;
        Ok(Self { ptr: ptr.cast() })
    }

    pub fn as_ptr(&self) -> NonNull<StateBlock> {
        self.ptr
    }

    pub fn get(&self) -> &StateBlock {
        // SAFETY: the allocation is live and sized for a StateBlock; the
        // library only touches it during calls, never concurrently with us.
        unsafe { self.ptr.as_ref() }
    }

    pub fn get_mut(&mut self) -> &mut StateBlock {
        // SAFETY: as in `get`, and `&mut self` makes this the only host view.
        unsafe { self.ptr.as_mut() }
    }

    /// # Safety
    /// `allocator` must be the one that produced this block, and the library
    /// must be done with it.
    pub unsafe fn release<A: HostAllocator>(self, allocator: &A) {
        // SAFETY: forwarded from the caller's contract.
        unsafe { allocator.release(self.ptr.cast(), Self::LAYOUT) }
    }
}

/// RGBA8 pixels the renderer draws into. Fixed size for the whole session.
#[derive(Debug)]
pub struct FrameBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
    width: i32,
    height: i32,
}

impl FrameBuffer {
    pub const ALIGN: usize = 16;

    pub fn layout_for(width: i32, height: i32) -> Result<Layout, HostError> {
        frame_buffer_len(width, height)
            .and_then(|len| Layout::from_size_align(len, Self::ALIGN).ok())
            .ok_or(HostError::InvalidScreenSize { width, height })
    }

    pub fn allocate<A: HostAllocator>(
        allocator: &A,
        width: i32,
        height: i32,
    ) -> Result<Self, HostError> {
        let layout = Self::layout_for(width, height)?;
        let ptr = allocator
            .allocate(layout)
            .ok_or(HostError::OutOfMemory {
                resource: Resource::FrameBuffer,
                bytes: layout.size(),
            })?;
        Ok(Self {
            ptr,
            layout,
            width,
            height,
        })
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Row stride in bytes; the renderer assumes tightly packed rows.
    pub fn stride(&self) -> usize {
        self.width as usize * render_abi::BYTES_PER_PIXEL
    }

    /// # Safety
    /// `allocator` must be the one that produced this buffer, and no state
    /// block handed to the library may still reference it.
    pub unsafe fn release<A: HostAllocator>(self, allocator: &A) {
        // SAFETY: forwarded from the caller's contract.
        unsafe { allocator.release(self.ptr, self.layout) }
    }
}
