//! Error kinds and the fatal-usage termination policy of the error-handling
//! design (see the crate-level docs). There is no exception-like channel
//! across the host API: fatal and device errors are logged and the process
//! is terminated; recoverable usage errors are logged and a default value
//! is returned to the caller.

use std::fmt;

/// Errors a caller is expected to handle.
///
/// Only [`DeviceError::Timeout`] is meant to be matched on by well-behaved
/// callers; everything else that would otherwise appear here is instead
/// routed through [`fatal`] and never returned.
#[derive(thiserror::Error, Debug)]
pub enum DeviceError {
    #[error("fence wait exceeded its timeout budget; GPU work remains in flight")]
    Timeout,
    #[error("swapchain is out of date or suboptimal")]
    OutOfDate,
    #[error("surface was lost")]
    SurfaceLost,
    #[error(transparent)]
    Vulkan(#[from] ash::vk::Result),
    #[error(transparent)]
    Loading(#[from] ash::LoadingError),
}

/// Marker for a usage error that is always a programming mistake: null
/// handles, reading a non-host-visible buffer, mutating a finalized
/// descriptor-set layout, rank above `MAX_DIMENSIONS`, shape mismatches in
/// linear algebra, out-of-bounds single-element access. The policy for
/// all of these is identical: log at `error!` and terminate the process.
#[derive(Debug, Clone)]
pub struct FatalUsage(pub String);

impl fmt::Display for FatalUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Log a fatal usage or device error and terminate the process.
///
/// Targets compute workloads where corrupted shape or memory-class
/// assumptions would silently corrupt numeric output, so early termination
/// is preferred to propagating nonsense results (§7).
#[track_caller]
pub fn fatal(message: impl fmt::Display) -> ! {
    let location = std::panic::Location::caller();
    log::error!("fatal usage error at {location}: {message}");
    std::process::abort()
}

/// Log a recoverable usage warning (a bulk read/write clipped to buffer
/// bounds) without aborting.
#[track_caller]
pub fn recoverable(message: impl fmt::Display) {
    let location = std::panic::Location::caller();
    log::warn!("clipped at {location}: {message}");
}
