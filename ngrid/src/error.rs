//! Error handling for the tensor engine (specification §7).
//!
//! Fatal usage and device errors terminate the process after logging, as
//! the host-facing API offers no exception-like channel for them (§7:
//! "corrupted shape or memory-class assumptions would silently corrupt
//! numeric output; early termination is preferred"). `GridError` exists
//! only for the handful of cases returned to the caller directly: timeouts
//! and the declared-but-unimplemented non-square inverse.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("device error: {0}")]
    Device(#[from] gctx::DeviceError),

    #[error("non-square pseudo-inverse is not implemented (§9 open question)")]
    Unsupported,
}
