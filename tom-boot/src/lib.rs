//! TomLoader UEFI Application
//!
//! This image:
//! 1. Queries the firmware memory map into a fixed buffer
//! 2. Renders it as a text report
//! 3. Writes the report to `\memmap` on its own boot volume

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod efi_file;
pub mod firmware;
