//! TomLoader Entry Point
//!
//! Dumps the firmware memory map to `\memmap` on the boot volume.

#![no_std]
#![no_main]
#![deny(unsafe_op_in_unsafe_fn)]

use tom_boot::config::{LOADER_NAME, MEMMAP_PATH, MEMORY_MAP_BUFFER_SIZE};
use tom_boot::efi_file::{create_report_file, EfiFileSink};
use tom_boot::firmware::BootServicesFirmware;
use tom_mmap::descriptor::PAGE_SIZE;
use tom_mmap::{
    acquire, write_report, DescriptorTable, MapError, MemoryMapBuffer, ReportError, SinkFault,
    SinkWriteError,
};
use uefi::prelude::*;
use uefi::system;

/// Memory map storage; the firmware writes `u64` fields in place
#[repr(C, align(8))]
struct MapStorage([u8; MEMORY_MAP_BUFFER_SIZE]);

#[entry]
fn efi_main() -> Status {
    // Initialise UEFI services
    if let Err(e) = uefi::helpers::init() {
        return e.status();
    }

    log::info!("{} starting...", LOADER_NAME);
    log::info!("UEFI Firmware Vendor: {}", system::firmware_vendor());
    log::info!(
        "UEFI Firmware Revision: {:#x}",
        system::firmware_revision()
    );

    let Some(firmware) = BootServicesFirmware::new() else {
        log::error!("Boot services not available");
        return Status::UNSUPPORTED;
    };

    let mut storage = MapStorage([0u8; MEMORY_MAP_BUFFER_SIZE]);
    let mut buffer = MemoryMapBuffer::new(&mut storage.0);

    let result = match acquire(&firmware, &mut buffer) {
        Ok(result) => result,
        Err(e) => {
            log::error!("Failed to get memory map: {}", e);
            return map_error_status(&e);
        }
    };

    log::info!(
        "Memory map: {} entries, stride {} bytes, version {}, key {:#x}",
        result.entry_count(),
        result.descriptor_stride(),
        result.descriptor_version(),
        result.map_key().as_usize()
    );

    let file = match create_report_file(MEMMAP_PATH) {
        Ok(file) => file,
        Err(e) => {
            log::error!("Failed to open {}: {:?}", MEMMAP_PATH, e.status());
            return e.status();
        }
    };

    let mut sink = EfiFileSink::new(file);
    let written = match write_report(&result, &buffer, &mut sink) {
        Ok(written) => written,
        Err(e) => {
            log::error!("Failed to write {}: {}", MEMMAP_PATH, e);
            return match e {
                ReportError::Map(e) => map_error_status(&e),
                ReportError::SinkWrite(SinkWriteError { fault, .. }) => match fault {
                    SinkFault::Rejected(status) => status,
                    SinkFault::Short { .. } => Status::DEVICE_ERROR,
                },
            };
        }
    };

    if let Err(e) = sink.finish() {
        log::error!("Failed to flush {}: {:?}", MEMMAP_PATH, e.status());
        return e.status();
    }

    log::info!("Wrote {} memory map lines to {}", written, MEMMAP_PATH);

    // Summary for the console; the table was already validated by write_report
    if let Ok(table) = DescriptorTable::new(&result, &buffer) {
        if table.is_empty() {
            log::warn!("Firmware returned an empty memory map");
        }
        let ram_mb = table.ram_pages().saturating_mul(PAGE_SIZE) / (1024 * 1024);
        log::info!(
            "{} descriptors, {} pages total, {} MB usable RAM",
            table.len(),
            table.total_pages(),
            ram_mb
        );
    }

    log::info!("All done");
    Status::SUCCESS
}

/// Status handed back to the firmware for an acquisition failure
fn map_error_status(e: &MapError) -> Status {
    match e {
        MapError::InvalidArgument => Status::INVALID_PARAMETER,
        MapError::BufferTooSmall { .. } => Status::BUFFER_TOO_SMALL,
        MapError::Firmware(status) => Status(status.as_usize()),
        MapError::MalformedMap { .. } => Status::COMPROMISED_DATA,
    }
}

/// Panic handler
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("LOADER PANIC: {}", info);
    loop {
        core::hint::spin_loop();
    }
}
