use alloc::collections::TryReserveError;
use core::fmt::{self, Debug, Display, Formatter};

/// Result type of every allocating operation of this crate.
pub type Result<T> = core::result::Result<T, AllocError>;

/// The backing buffer could not be allocated or reallocated.
///
/// Carries the byte count that was requested and the error reported by the
/// allocator. The index that produced it is left exactly as it was before
/// the failing call.
#[derive(Clone, PartialEq, Eq)]
pub struct AllocError {
    requested: usize,
    source: TryReserveError,
}

impl AllocError {
    pub(crate) const fn new(requested: usize, source: TryReserveError) -> Self {
        Self { requested, source }
    }

    /// Number of bytes the failing operation asked for.
    pub const fn requested(&self) -> usize {
        self.requested
    }
}

impl Debug for AllocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AllocError {{ requested: {}, source: {:?} }}",
            self.requested, self.source
        )
    }
}

impl Display for AllocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to allocate {} bytes for the free index: {}",
            self.requested, self.source
        )
    }
}

impl core::error::Error for AllocError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.source)
    }
}
