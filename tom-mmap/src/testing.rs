//! Fakes for unit tests: a scripted firmware and in-memory report sinks.

use core::cell::{Cell, RefCell};
use std::vec::Vec;

use crate::acquire::{MapKey, MemoryMapResult};
use crate::error::FirmwareStatus;
use crate::firmware::{MapQuery, MemoryMapFirmware};
use crate::report::ReportSink;

/// Write one descriptor record at the start of `record`.
pub fn encode_descriptor(record: &mut [u8], ty: u32, phys: u64, pages: u64, attr: u64) {
    record[0..4].copy_from_slice(&ty.to_le_bytes());
    record[4..8].fill(0);
    record[8..16].copy_from_slice(&phys.to_le_bytes());
    record[16..24].fill(0);
    record[24..32].copy_from_slice(&pages.to_le_bytes());
    record[32..40].copy_from_slice(&attr.to_le_bytes());
}

/// Builds a packed descriptor table with a given stride.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    stride: usize,
    bytes: Vec<u8>,
}

impl TableBuilder {
    pub fn new(stride: usize) -> Self {
        Self {
            stride,
            bytes: Vec::new(),
        }
    }

    pub fn push(mut self, ty: u32, phys: u64, pages: u64, attr: u64) -> Self {
        let start = self.bytes.len();
        // Padding past the common prefix is junk on real firmware too
        self.bytes.resize(start + self.stride, 0xAA);
        encode_descriptor(&mut self.bytes[start..], ty, phys, pages, attr);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn used(&self) -> usize {
        self.bytes.len()
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Result describing this table as if the firmware had written it
    pub fn result(&self) -> MemoryMapResult {
        MemoryMapResult::new(self.used(), self.stride, 1, MapKey(0))
    }
}

/// Firmware that serves a fixed table and counts queries.
pub struct FakeFirmware {
    table: RefCell<TableBuilder>,
    key: Cell<usize>,
    reported_stride: Option<usize>,
    failure: Option<FirmwareStatus>,
    calls: Cell<usize>,
}

impl FakeFirmware {
    pub fn new(table: TableBuilder, key: usize) -> Self {
        Self {
            table: RefCell::new(table),
            key: Cell::new(key),
            reported_stride: None,
            failure: None,
            calls: Cell::new(0),
        }
    }

    pub fn failing(status: FirmwareStatus) -> Self {
        Self {
            failure: Some(status),
            ..Self::new(TableBuilder::new(48), 0)
        }
    }

    /// Report a stride other than the one the table was built with.
    pub fn with_reported_stride(mut self, stride: usize) -> Self {
        self.reported_stride = Some(stride);
        self
    }

    pub fn replace_table(&self, table: TableBuilder, key: usize) {
        *self.table.borrow_mut() = table;
        self.key.set(key);
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl MemoryMapFirmware for FakeFirmware {
    fn query_memory_map(&self, buffer: &mut [u8]) -> Result<MapQuery, FirmwareStatus> {
        self.calls.set(self.calls.get() + 1);
        if let Some(status) = self.failure {
            return Err(status);
        }

        let table = self.table.borrow();
        if table.used() > buffer.len() {
            return Ok(MapQuery::TooSmall {
                required: Some(table.used()),
            });
        }

        buffer[..table.used()].copy_from_slice(table.bytes());
        Ok(MapQuery::Filled(MemoryMapResult::new(
            table.used(),
            self.reported_stride.unwrap_or(table.stride()),
            1,
            MapKey(self.key.get()),
        )))
    }
}

/// Sink that keeps everything it is given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub data: Vec<u8>,
    pub writes: usize,
}

impl RecordingSink {
    pub fn text(&self) -> &str {
        core::str::from_utf8(&self.data).unwrap()
    }
}

impl ReportSink for RecordingSink {
    type Error = &'static str;

    fn append(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        self.data.extend_from_slice(bytes);
        self.writes += 1;
        Ok(bytes.len())
    }
}

/// Sink that fails the `fail_at`-th write (0 = header) and counts attempts.
#[derive(Debug)]
pub struct FailingSink {
    pub inner: RecordingSink,
    pub fail_at: usize,
    pub attempts: usize,
    /// Accept this many bytes instead of returning an error
    pub accept_only: Option<usize>,
}

impl FailingSink {
    pub fn new(fail_at: usize) -> Self {
        Self {
            inner: RecordingSink::default(),
            fail_at,
            attempts: 0,
            accept_only: None,
        }
    }
}

impl ReportSink for FailingSink {
    type Error = &'static str;

    fn append(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        let attempt = self.attempts;
        self.attempts += 1;
        if attempt != self.fail_at {
            return self.inner.append(bytes);
        }
        match self.accept_only {
            Some(accepted) => {
                self.inner.data.extend_from_slice(&bytes[..accepted]);
                Ok(accepted)
            }
            None => Err("device error"),
        }
    }
}
