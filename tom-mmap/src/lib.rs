//! # tom-mmap
//!
//! Memory map acquisition and reporting for the TomLoader UEFI image.
//!
//! - [`acquire`](acquire::acquire): one size-negotiated `GetMemoryMap` query
//!   into a caller-owned [`MemoryMapBuffer`]
//! - [`DescriptorTable`]: bounds-checked, stride-aware view over the result
//! - [`render`](report::render) / [`write_report`](report::write_report):
//!   deterministic text report, one line per descriptor
//!
//! Firmware access goes through the [`MemoryMapFirmware`] trait and output
//! through [`ReportSink`], so nothing here touches boot services directly.
//!
//! # no_std
//!
//! This crate is `#![no_std]` and allocation-free. Tests link `std` for
//! their fakes.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
extern crate std;

pub mod acquire;
pub mod buffer;
pub mod descriptor;
pub mod error;
pub mod firmware;
pub mod report;

#[cfg(test)]
mod testing;

pub use acquire::{acquire, MapKey, MemoryMapResult};
pub use buffer::MemoryMapBuffer;
pub use descriptor::{DescriptorTable, MemoryDescriptor, RegionType};
pub use error::{FirmwareStatus, MapError, ReportError, SinkFault, SinkWriteError};
pub use firmware::{MapQuery, MemoryMapFirmware};
pub use report::{render, write_report, ReportLine, ReportSink, REPORT_HEADER};
