//! Memory Descriptors
//!
//! Typed, bounds-checked access to the firmware's descriptor table. The table
//! is a packed array of `EFI_MEMORY_DESCRIPTOR` records spaced by a
//! firmware-chosen stride, which may be larger than the record itself.

use uefi_raw::table::boot::{MemoryAttribute, MemoryType};

use crate::acquire::MemoryMapResult;
use crate::buffer::MemoryMapBuffer;
use crate::error::MapError;

/// Size of the fields every descriptor version carries
pub const DESCRIPTOR_MIN_SIZE: usize = 40;

/// Attribute bits worth reporting (cacheability, protection, reliability).
/// Higher bits such as `EFI_MEMORY_RUNTIME` are platform bookkeeping.
pub const ATTRIBUTE_MASK: u64 = 0x000F_FFFF;

const _: () = assert!(
    MemoryAttribute::WRITE_BACK.bits() & ATTRIBUTE_MASK != 0,
    "cacheability bits must be reported"
);
const _: () = assert!(
    MemoryAttribute::READ_ONLY.bits() & ATTRIBUTE_MASK != 0,
    "protection bits must be reported"
);
const _: () = assert!(
    MemoryAttribute::RUNTIME.bits() & ATTRIBUTE_MASK == 0,
    "EFI_MEMORY_RUNTIME must be masked off"
);

/// UEFI page size; `number_of_pages` always counts 4 KiB pages
pub const PAGE_SIZE: u64 = 4096;

const TYPE_OFFSET: usize = 0;
const PHYSICAL_START_OFFSET: usize = 8;
const VIRTUAL_START_OFFSET: usize = 16;
const NUMBER_OF_PAGES_OFFSET: usize = 24;
const ATTRIBUTE_OFFSET: usize = 32;

/// Name reported for codes outside the known set
pub const INVALID_MEMORY_TYPE_NAME: &str = "InvalidMemoryType";

/// Region type code as reported by the firmware
///
/// Any `u32` is representable; unknown codes still have a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionType(pub u32);

impl RegionType {
    pub const RESERVED: Self = Self(MemoryType::RESERVED.0);
    pub const LOADER_CODE: Self = Self(MemoryType::LOADER_CODE.0);
    pub const LOADER_DATA: Self = Self(MemoryType::LOADER_DATA.0);
    pub const BOOT_SERVICES_CODE: Self = Self(MemoryType::BOOT_SERVICES_CODE.0);
    pub const BOOT_SERVICES_DATA: Self = Self(MemoryType::BOOT_SERVICES_DATA.0);
    pub const RUNTIME_SERVICES_CODE: Self = Self(MemoryType::RUNTIME_SERVICES_CODE.0);
    pub const RUNTIME_SERVICES_DATA: Self = Self(MemoryType::RUNTIME_SERVICES_DATA.0);
    pub const CONVENTIONAL: Self = Self(MemoryType::CONVENTIONAL.0);
    pub const UNUSABLE: Self = Self(MemoryType::UNUSABLE.0);
    pub const ACPI_RECLAIM: Self = Self(MemoryType::ACPI_RECLAIM.0);
    pub const ACPI_NON_VOLATILE: Self = Self(MemoryType::ACPI_NON_VOLATILE.0);
    pub const MMIO: Self = Self(MemoryType::MMIO.0);
    pub const MMIO_PORT_SPACE: Self = Self(MemoryType::MMIO_PORT_SPACE.0);
    pub const PAL_CODE: Self = Self(MemoryType::PAL_CODE.0);
    pub const PERSISTENT_MEMORY: Self = Self(MemoryType::PERSISTENT_MEMORY.0);
    pub const UNACCEPTED: Self = Self(MemoryType::UNACCEPTED.0);

    /// Human-readable name, never empty
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.0 {
            0 => "EfiReservedMemoryType",
            1 => "EfiLoaderCode",
            2 => "EfiLoaderData",
            3 => "EfiBootServicesCode",
            4 => "EfiBootServicesData",
            5 => "EfiRuntimeServicesCode",
            6 => "EfiRuntimeServicesData",
            7 => "EfiConventionalMemory",
            8 => "EfiUnusableMemory",
            9 => "EfiACPIReclaimMemory",
            10 => "EfiACPIMemoryNVS",
            11 => "EfiMemoryMappedIO",
            12 => "EfiMemoryMappedIOPortSpace",
            13 => "EfiPalCode",
            14 => "EfiPersistentMemory",
            15 => "EfiUnacceptedMemoryType",
            _ => INVALID_MEMORY_TYPE_NAME,
        }
    }

    /// RAM the OS can use once boot services are gone
    #[must_use]
    pub const fn is_ram(self) -> bool {
        matches!(
            self,
            Self::CONVENTIONAL
                | Self::BOOT_SERVICES_CODE
                | Self::BOOT_SERVICES_DATA
                | Self::LOADER_CODE
                | Self::LOADER_DATA
                | Self::PERSISTENT_MEMORY
        )
    }
}

/// One decoded descriptor record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryDescriptor {
    pub region_type: RegionType,
    /// Physical start address (page-aligned)
    pub physical_start: u64,
    pub virtual_start: u64,
    pub number_of_pages: u64,
    /// Raw attribute bits, unmasked
    pub attribute: u64,
}

impl MemoryDescriptor {
    /// Decode the common prefix of a descriptor record
    fn decode(record: &[u8; DESCRIPTOR_MIN_SIZE]) -> Self {
        Self {
            region_type: RegionType(read_u32(record, TYPE_OFFSET)),
            physical_start: read_u64(record, PHYSICAL_START_OFFSET),
            virtual_start: read_u64(record, VIRTUAL_START_OFFSET),
            number_of_pages: read_u64(record, NUMBER_OF_PAGES_OFFSET),
            attribute: read_u64(record, ATTRIBUTE_OFFSET),
        }
    }

    /// Attribute bits with the platform-reserved high bits cleared
    #[must_use]
    pub const fn masked_attribute(&self) -> u64 {
        self.attribute & ATTRIBUTE_MASK
    }
}

fn read_u32(record: &[u8; DESCRIPTOR_MIN_SIZE], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&record[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(record: &[u8; DESCRIPTOR_MIN_SIZE], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&record[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

/// Read-only view over the filled part of a memory map buffer
///
/// Holds `floor(used_bytes / stride)` entries; a trailing partial record is
/// ignored.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorTable<'a> {
    bytes: &'a [u8],
    stride: usize,
    len: usize,
}

impl<'a> DescriptorTable<'a> {
    /// Build a view from an acquisition result.
    ///
    /// Fails with [`MapError::InvalidArgument`] for a null or empty buffer and
    /// with [`MapError::MalformedMap`] if the result does not fit it.
    pub fn new(result: &MemoryMapResult, buffer: &'a MemoryMapBuffer<'_>) -> Result<Self, MapError> {
        let bytes = buffer.as_bytes().ok_or(MapError::InvalidArgument)?;
        Self::from_bytes(bytes, result.used_bytes(), result.descriptor_stride())
    }

    pub(crate) fn from_bytes(bytes: &'a [u8], used_bytes: usize, stride: usize) -> Result<Self, MapError> {
        if used_bytes > bytes.len() || stride < DESCRIPTOR_MIN_SIZE {
            return Err(MapError::MalformedMap {
                used_bytes,
                stride,
                capacity: bytes.len(),
            });
        }

        Ok(Self {
            bytes: &bytes[..used_bytes],
            stride,
            len: used_bytes / stride,
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Descriptor at `index`, or `None` past the end of the table
    #[must_use]
    pub fn get(&self, index: usize) -> Option<MemoryDescriptor> {
        if index >= self.len {
            return None;
        }
        let start = index.checked_mul(self.stride)?;
        let record = self.bytes.get(start..)?.first_chunk::<DESCRIPTOR_MIN_SIZE>()?;
        Some(MemoryDescriptor::decode(record))
    }

    /// Descriptors in table order (not address order)
    pub fn iter(&self) -> impl Iterator<Item = MemoryDescriptor> + 'a {
        let table = *self;
        (0..table.len).filter_map(move |i| table.get(i))
    }

    /// Sum of all page counts, saturating at `u64::MAX`
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.iter()
            .map(|d| d.number_of_pages)
            .fold(0u64, u64::saturating_add)
    }

    /// Pages the OS can treat as RAM after boot services exit, saturating
    #[must_use]
    pub fn ram_pages(&self) -> u64 {
        self.iter()
            .filter(|d| d.region_type.is_ram())
            .map(|d| d.number_of_pages)
            .fold(0u64, u64::saturating_add)
    }
}
