//! Error types for memory map acquisition and reporting

use core::fmt;

/// Raw status code returned by the firmware
///
/// Kept opaque: the value is passed through untouched so the caller can hand
/// it back to whoever invoked the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FirmwareStatus(pub usize);

impl FirmwareStatus {
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for FirmwareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Errors produced while acquiring or viewing a memory map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// Null buffer or zero capacity
    InvalidArgument,
    /// The map does not fit; `required` is the size the firmware asked for
    BufferTooSmall { required: Option<usize> },
    /// Any other non-success status, passed through verbatim
    Firmware(FirmwareStatus),
    /// The reported table does not fit the buffer or its stride is shorter
    /// than a descriptor record
    MalformedMap {
        used_bytes: usize,
        stride: usize,
        capacity: usize,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid memory map buffer"),
            Self::BufferTooSmall {
                required: Some(required),
            } => write!(f, "memory map buffer too small ({} bytes required)", required),
            Self::BufferTooSmall { required: None } => write!(f, "memory map buffer too small"),
            Self::Firmware(status) => write!(f, "firmware error {}", status),
            Self::MalformedMap {
                used_bytes,
                stride,
                capacity,
            } => write!(
                f,
                "malformed memory map: {} bytes used, stride {}, capacity {}",
                used_bytes, stride, capacity
            ),
        }
    }
}

/// Why a sink write failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFault<E> {
    /// The sink returned an error
    Rejected(E),
    /// The sink accepted only part of the line
    Short { accepted: usize, expected: usize },
}

impl<E: fmt::Display> fmt::Display for SinkFault<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(e) => write!(f, "write rejected: {}", e),
            Self::Short { accepted, expected } => {
                write!(f, "short write: {} of {} bytes", accepted, expected)
            }
        }
    }
}

/// A report write that stopped part way through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkWriteError<E> {
    /// Index of the last descriptor line fully written, `None` if the failure
    /// hit the header or the first descriptor line
    pub last_written: Option<usize>,
    pub fault: SinkFault<E>,
}

impl<E: fmt::Display> fmt::Display for SinkWriteError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_written {
            Some(index) => write!(f, "{} after line {}", self.fault, index),
            None => write!(f, "{} before any descriptor line", self.fault),
        }
    }
}

/// Errors produced by [`write_report`](crate::report::write_report)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportError<E> {
    /// The result does not describe a readable table in the buffer
    Map(MapError),
    SinkWrite(SinkWriteError<E>),
}

impl<E> From<MapError> for ReportError<E> {
    fn from(e: MapError) -> Self {
        ReportError::Map(e)
    }
}

impl<E> From<SinkWriteError<E>> for ReportError<E> {
    fn from(e: SinkWriteError<E>) -> Self {
        ReportError::SinkWrite(e)
    }
}

impl<E: fmt::Display> fmt::Display for ReportError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(e) => write!(f, "{}", e),
            Self::SinkWrite(e) => write!(f, "{}", e),
        }
    }
}
