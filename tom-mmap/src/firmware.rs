//! Firmware capability used to query the memory map
//!
//! The acquirer never reaches for boot services directly. The UEFI image
//! passes in an implementation backed by the system table; tests pass in a
//! fake.

use crate::acquire::MemoryMapResult;
use crate::error::FirmwareStatus;

/// Outcome of one size-negotiated query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapQuery {
    /// The table was written into the buffer
    Filled(MemoryMapResult),
    /// The table did not fit; `required` is the firmware's size hint
    TooSmall { required: Option<usize> },
}

/// Source of memory map snapshots
pub trait MemoryMapFirmware {
    /// Write the current descriptor table into `buffer`.
    ///
    /// `buffer.len()` is the size hint. Any status other than success or
    /// "buffer too small" is returned as `Err` untouched.
    fn query_memory_map(&self, buffer: &mut [u8]) -> Result<MapQuery, FirmwareStatus>;
}

impl<F: MemoryMapFirmware + ?Sized> MemoryMapFirmware for &F {
    fn query_memory_map(&self, buffer: &mut [u8]) -> Result<MapQuery, FirmwareStatus> {
        (**self).query_memory_map(buffer)
    }
}
