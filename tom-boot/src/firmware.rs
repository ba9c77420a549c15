//! Boot Services Memory Map Source
//!
//! Implements [`MemoryMapFirmware`] on top of the raw `GetMemoryMap` boot
//! service. The high-level `uefi::boot::memory_map` allocates its own pool
//! buffer; this adapter writes into the caller's fixed buffer instead.

use tom_mmap::{FirmwareStatus, MapKey, MapQuery, MemoryMapFirmware, MemoryMapResult};
use uefi::Status;

/// `GetMemoryMap` from the global system table
#[derive(Debug)]
pub struct BootServicesFirmware {
    _private: (),
}

impl BootServicesFirmware {
    /// Returns `None` if the system table has not been registered or boot
    /// services are no longer available.
    pub fn new() -> Option<Self> {
        let st = uefi::table::system_table_raw()?;
        // SAFETY: the pointer was registered by `uefi::helpers::init` from
        // the table the firmware handed to the entry point
        let bs = unsafe { st.as_ref().boot_services };
        if bs.is_null() {
            return None;
        }
        Some(Self { _private: () })
    }
}

impl MemoryMapFirmware for BootServicesFirmware {
    fn query_memory_map(&self, buffer: &mut [u8]) -> Result<MapQuery, FirmwareStatus> {
        let st = uefi::table::system_table_raw().ok_or(FirmwareStatus(Status::UNSUPPORTED.0))?;
        // SAFETY: see `new`
        let bs = unsafe { st.as_ref().boot_services };
        if bs.is_null() {
            return Err(FirmwareStatus(Status::UNSUPPORTED.0));
        }

        let mut map_size = buffer.len();
        let mut map_key = 0usize;
        let mut descriptor_size = 0usize;
        let mut descriptor_version = 0u32;

        // SAFETY: boot services are live, `buffer` is valid for writes of
        // `map_size` bytes and every out-pointer refers to a local
        let status = unsafe {
            ((*bs).get_memory_map)(
                &mut map_size,
                buffer.as_mut_ptr().cast(),
                &mut map_key,
                &mut descriptor_size,
                &mut descriptor_version,
            )
        };

        if status == Status::SUCCESS {
            Ok(MapQuery::Filled(MemoryMapResult::new(
                map_size,
                descriptor_size,
                descriptor_version,
                MapKey(map_key),
            )))
        } else if status == Status::BUFFER_TOO_SMALL {
            // The firmware updates map_size to the size it needs
            Ok(MapQuery::TooSmall {
                required: Some(map_size),
            })
        } else {
            Err(FirmwareStatus(status.0))
        }
    }
}
