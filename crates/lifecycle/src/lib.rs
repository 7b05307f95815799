#![deny(unsafe_op_in_unsafe_fn)]

//! Host side of the prebuilt renderer: owns the state block and frame
//! buffer, sequences context startup, runs the frame loop and guarantees a
//! single teardown on every exit path.

mod alloc;
mod error;
pub mod exit_hook;
mod frame_loop;
mod library;
mod resources;
mod session;

#[cfg(test)]
mod mock;

pub use alloc::{HostAllocator, SystemAllocator};
pub use error::{HostError, Resource};
pub use frame_loop::{CancelToken, FrameClock, HostConfig, LoopSummary};
pub use library::RenderLibrary;
pub use resources::{FrameBuffer, StateBlockHandle};
pub use session::{Session, Stage};
