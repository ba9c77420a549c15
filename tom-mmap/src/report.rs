//! Memory Map Report
//!
//! Renders a descriptor table as comma-separated text:
//!
//! ```text
//! Index, Type, Type(Name), PhysicalStart, NumberOfPages, Attribute
//! 0, 3, EfiBootServicesCode, 0000000000000000, 1, f
//! 1, 7, EfiConventionalMemory, 0000000000001000, 9f, f
//! ```
//!
//! Index is decimal, every other number is lowercase hex without a prefix.
//! `PhysicalStart` is always 16 digits wide and `Attribute` is masked with
//! [`ATTRIBUTE_MASK`](crate::descriptor::ATTRIBUTE_MASK). Output depends only
//! on the buffer contents.

use core::fmt::{self, Write};

use crate::acquire::MemoryMapResult;
use crate::buffer::MemoryMapBuffer;
use crate::descriptor::{DescriptorTable, MemoryDescriptor};
use crate::error::{MapError, ReportError, SinkFault, SinkWriteError};

/// First line of every report
pub const REPORT_HEADER: &str = "Index, Type, Type(Name), PhysicalStart, NumberOfPages, Attribute\n";

/// Longest possible line: 20-digit index, 8-digit type, 26-char name,
/// three 16-digit numbers, five separators and the newline
const MAX_LINE_LEN: usize = 20 + 8 + 26 + 3 * 16 + 5 * 2 + 1;

const LINE_CAPACITY: usize = 128;

const _: () = assert!(MAX_LINE_LEN <= LINE_CAPACITY, "report line buffer too small");
const _: () = assert!(REPORT_HEADER.len() <= LINE_CAPACITY, "report header too long");

/// One rendered, `\n`-terminated report line
#[derive(Clone, Copy)]
pub struct ReportLine {
    data: [u8; LINE_CAPACITY],
    len: usize,
    /// Descriptor index, `None` for the header
    index: Option<usize>,
}

impl ReportLine {
    const fn empty(index: Option<usize>) -> Self {
        Self {
            data: [0u8; LINE_CAPACITY],
            len: 0,
            index,
        }
    }

    fn header() -> Self {
        let mut line = Self::empty(None);
        let written = line.write_str(REPORT_HEADER);
        debug_assert!(written.is_ok(), "header exceeds line capacity");
        line
    }

    fn descriptor(index: usize, desc: &MemoryDescriptor) -> Self {
        let mut line = Self::empty(Some(index));
        let written = writeln!(
            line,
            "{}, {:x}, {}, {:016x}, {:x}, {:x}",
            index,
            desc.region_type.0,
            desc.region_type.name(),
            desc.physical_start,
            desc.number_of_pages,
            desc.masked_attribute()
        );
        debug_assert!(written.is_ok(), "descriptor line exceeds MAX_LINE_LEN");
        line
    }

    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_bytes()).unwrap_or("<invalid>")
    }
}

impl Write for ReportLine {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let end = self.len + bytes.len();
        if end > LINE_CAPACITY {
            return Err(fmt::Error);
        }
        self.data[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportLine")
            .field("index", &self.index)
            .field("text", &self.as_str())
            .finish()
    }
}

/// Header line followed by one line per descriptor, in table order
#[derive(Debug, Clone)]
pub struct ReportLines<'a> {
    table: DescriptorTable<'a>,
    header_done: bool,
    next: usize,
}

impl Iterator for ReportLines<'_> {
    type Item = ReportLine;

    fn next(&mut self) -> Option<ReportLine> {
        if !self.header_done {
            self.header_done = true;
            return Some(ReportLine::header());
        }
        let index = self.next;
        let desc = self.table.get(index)?;
        self.next += 1;
        Some(ReportLine::descriptor(index, &desc))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.len() - self.next + usize::from(!self.header_done);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ReportLines<'_> {}

/// Render the report for `result` as read from `buffer`.
///
/// Fails only if `result` does not describe a table inside `buffer`.
pub fn render<'a>(result: &MemoryMapResult, buffer: &'a MemoryMapBuffer<'_>) -> Result<ReportLines<'a>, MapError> {
    let table = DescriptorTable::new(result, buffer)?;
    Ok(ReportLines {
        table,
        header_done: false,
        next: 0,
    })
}

/// Append-only byte destination for a report
pub trait ReportSink {
    type Error;

    /// Append `bytes`, returning how many were accepted.
    fn append(&mut self, bytes: &[u8]) -> Result<usize, Self::Error>;
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    type Error = S::Error;

    fn append(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        (**self).append(bytes)
    }
}

/// Render the report and append it to `sink` line by line.
///
/// Returns the number of descriptor lines written. The first failed or short
/// write stops the report; lines already written are left in the sink.
pub fn write_report<S>(
    result: &MemoryMapResult,
    buffer: &MemoryMapBuffer<'_>,
    sink: &mut S,
) -> Result<usize, ReportError<S::Error>>
where
    S: ReportSink + ?Sized,
{
    let mut last_written = None;

    for line in render(result, buffer)? {
        let bytes = line.as_bytes();
        let fault = match sink.append(bytes) {
            Ok(accepted) if accepted == bytes.len() => None,
            Ok(accepted) => Some(SinkFault::Short {
                accepted,
                expected: bytes.len(),
            }),
            Err(e) => Some(SinkFault::Rejected(e)),
        };

        if let Some(fault) = fault {
            log::warn!("Report write failed after line {:?}", last_written);
            return Err(SinkWriteError {
                last_written,
                fault,
            }
            .into());
        }

        if let Some(index) = line.index() {
            last_written = Some(index);
        }
    }

    Ok(last_written.map_or(0, |index| index + 1))
}
