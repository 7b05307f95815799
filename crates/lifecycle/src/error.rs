use std::fmt;

use thiserror::Error;

/// Host-owned allocation that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    StateBlock,
    FrameBuffer,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateBlock => f.write_str("renderer state block"),
            Self::FrameBuffer => f.write_str("frame buffer"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("memory allocation for {resource} failed ({bytes} bytes)")]
    OutOfMemory { resource: Resource, bytes: usize },

    #[error("gfx_init_context() failed with status {status}")]
    InitializationFailed { status: i32 },

    #[error("renderer reported unusable screen size {width}x{height}")]
    InvalidScreenSize { width: i32, height: i32 },

    #[error("render session already closed")]
    SessionClosed,
}
