//! Typed failures for recoverable resource exhaustion.
//!
//! Contract violations (remapping a live page, unmapping something that is
//! not mapped, a fault for a page never marked swapped) are panics: by the
//! time they fire, an invariant was already broken elsewhere in the kernel
//! and continuing would run on corrupted state.

use core::fmt::{self, Display, Formatter};

/// Recoverable virtual-memory failures, reported to the caller so a
/// memory-allocation system call can return an error to user code instead
/// of stopping the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    /// The physical frame pool is exhausted.
    OutOfFrames,
    /// Every swap roster slot of the process is occupied.
    OutOfSwapSlots,
    /// Growth would push the process past its total page ceiling.
    PageBudgetExceeded,
    /// A user-copy range touched a page that is not mapped user-accessible.
    BadUserAddress,
    /// A user string exceeded the destination buffer without a terminator.
    StringTooLong,
}

impl Display for VmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            VmError::OutOfFrames => write!(f, "out of physical frames"),
            VmError::OutOfSwapSlots => write!(f, "out of swap slots"),
            VmError::PageBudgetExceeded => write!(f, "per-process page budget exceeded"),
            VmError::BadUserAddress => write!(f, "bad user address"),
            VmError::StringTooLong => write!(f, "user string too long"),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, VmError>;
