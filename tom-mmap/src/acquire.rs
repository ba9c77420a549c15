//! Memory Map Acquisition
//!
//! One size-negotiated query into a caller-owned buffer. Resizing and retry
//! are left to the caller: a `BufferTooSmall` error carries the size hint
//! needed to do so.

use crate::buffer::MemoryMapBuffer;
use crate::descriptor::DESCRIPTOR_MIN_SIZE;
use crate::error::MapError;
use crate::firmware::{MapQuery, MemoryMapFirmware};

/// Opaque token identifying one memory map snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapKey(pub usize);

impl MapKey {
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

/// What the firmware reported about the table it wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMapResult {
    used_bytes: usize,
    descriptor_stride: usize,
    descriptor_version: u32,
    map_key: MapKey,
}

impl MemoryMapResult {
    #[must_use]
    pub const fn new(
        used_bytes: usize,
        descriptor_stride: usize,
        descriptor_version: u32,
        map_key: MapKey,
    ) -> Self {
        Self {
            used_bytes,
            descriptor_stride,
            descriptor_version,
            map_key,
        }
    }

    /// Bytes of the buffer holding descriptors
    #[must_use]
    pub const fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Distance between consecutive records
    #[must_use]
    pub const fn descriptor_stride(&self) -> usize {
        self.descriptor_stride
    }

    #[must_use]
    pub const fn descriptor_version(&self) -> u32 {
        self.descriptor_version
    }

    #[must_use]
    pub const fn map_key(&self) -> MapKey {
        self.map_key
    }

    /// Number of whole records, `0` for a zero stride
    #[must_use]
    pub const fn entry_count(&self) -> usize {
        match self.used_bytes.checked_div(self.descriptor_stride) {
            Some(count) => count,
            None => 0,
        }
    }
}

/// Fill `buffer` with the current memory map.
///
/// A null or empty buffer fails with [`MapError::InvalidArgument`] without
/// touching the firmware. On error the buffer contents are undefined.
pub fn acquire<F>(firmware: &F, buffer: &mut MemoryMapBuffer<'_>) -> Result<MemoryMapResult, MapError>
where
    F: MemoryMapFirmware + ?Sized,
{
    let capacity = buffer.capacity();
    let storage = buffer.as_bytes_mut().ok_or(MapError::InvalidArgument)?;

    log::trace!("Querying memory map into {} byte buffer", capacity);

    let result = match firmware.query_memory_map(storage).map_err(MapError::Firmware)? {
        MapQuery::Filled(result) => result,
        MapQuery::TooSmall { required } => {
            log::warn!(
                "Memory map does not fit in {} bytes (firmware wants {:?})",
                capacity,
                required
            );
            return Err(MapError::BufferTooSmall { required });
        }
    };

    if result.used_bytes > capacity || result.descriptor_stride < DESCRIPTOR_MIN_SIZE {
        return Err(MapError::MalformedMap {
            used_bytes: result.used_bytes,
            stride: result.descriptor_stride,
            capacity,
        });
    }

    log::debug!(
        "Memory map: {} bytes, stride {}, version {}, {} entries",
        result.used_bytes,
        result.descriptor_stride,
        result.descriptor_version,
        result.entry_count()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FirmwareStatus;
    use crate::testing::{FakeFirmware, TableBuilder};

    fn two_entry_table() -> TableBuilder {
        TableBuilder::new(48)
            .push(7, 0x0010_0000, 0x100, 0xF)
            .push(3, 0x0020_0000, 0x20, 0xF)
    }

    #[test]
    fn test_acquire_fills_buffer() {
        let firmware = FakeFirmware::new(two_entry_table(), 0x55);
        let mut storage = [0u8; 16384];
        let mut buffer = MemoryMapBuffer::new(&mut storage);

        let result = acquire(&firmware, &mut buffer).unwrap();
        assert_eq!(result.used_bytes(), 96);
        assert_eq!(result.descriptor_stride(), 48);
        assert_eq!(result.entry_count(), 2);
        assert_eq!(result.map_key(), MapKey(0x55));
        assert!(result.used_bytes() <= buffer.capacity());
        assert_eq!(firmware.calls(), 1);
        assert_eq!(&storage[..96], two_entry_table().bytes());
    }

    #[test]
    fn test_zero_capacity_skips_firmware() {
        let firmware = FakeFirmware::new(two_entry_table(), 0);
        let mut storage = [0u8; 0];
        let mut buffer = MemoryMapBuffer::new(&mut storage);

        assert_eq!(acquire(&firmware, &mut buffer), Err(MapError::InvalidArgument));
        assert_eq!(firmware.calls(), 0);
    }

    #[test]
    fn test_null_base_skips_firmware() {
        let firmware = FakeFirmware::new(two_entry_table(), 0);
        // SAFETY: null base is rejected before any access
        let mut buffer = unsafe { MemoryMapBuffer::from_raw_parts(core::ptr::null_mut(), 4096) };

        assert_eq!(acquire(&firmware, &mut buffer), Err(MapError::InvalidArgument));
        assert_eq!(firmware.calls(), 0);
    }

    #[test]
    fn test_buffer_too_small_reports_required() {
        let firmware = FakeFirmware::new(two_entry_table(), 0);
        let mut storage = [0u8; 64];
        let mut buffer = MemoryMapBuffer::new(&mut storage);

        assert_eq!(
            acquire(&firmware, &mut buffer),
            Err(MapError::BufferTooSmall { required: Some(96) })
        );
        assert_eq!(firmware.calls(), 1);
    }

    #[test]
    fn test_firmware_status_passed_through() {
        let status = FirmwareStatus(0x8000_0000_0000_0007);
        let firmware = FakeFirmware::failing(status);
        let mut storage = [0u8; 512];
        let mut buffer = MemoryMapBuffer::new(&mut storage);

        assert_eq!(acquire(&firmware, &mut buffer), Err(MapError::Firmware(status)));
    }

    #[test]
    fn test_bogus_stride_rejected() {
        let firmware = FakeFirmware::new(two_entry_table(), 0).with_reported_stride(0);
        let mut storage = [0u8; 512];
        let mut buffer = MemoryMapBuffer::new(&mut storage);

        assert!(matches!(
            acquire(&firmware, &mut buffer),
            Err(MapError::MalformedMap { stride: 0, .. })
        ));
    }

    #[test]
    fn test_repeated_acquire_sees_latest_snapshot() {
        let firmware = FakeFirmware::new(two_entry_table(), 1);
        let mut storage = [0u8; 1024];
        let mut buffer = MemoryMapBuffer::new(&mut storage);

        let first = acquire(&firmware, &mut buffer).unwrap();
        firmware.replace_table(two_entry_table().push(4, 0x0030_0000, 4, 0), 2);
        let second = acquire(&firmware, &mut buffer).unwrap();

        assert_eq!(first.entry_count(), 2);
        assert_eq!(second.entry_count(), 3);
        assert_ne!(first.map_key(), second.map_key());
        assert_eq!(firmware.calls(), 2);
    }

    #[test]
    fn test_entry_count_zero_stride() {
        let result = MemoryMapResult::new(96, 0, 1, MapKey(0));
        assert_eq!(result.entry_count(), 0);
    }
}
