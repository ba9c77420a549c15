//! Caller-owned memory map storage

use core::marker::PhantomData;
use core::ptr;

/// Fixed-capacity byte region the firmware writes the descriptor table into
///
/// The buffer only borrows its storage; the caller keeps ownership for the
/// whole acquire/report cycle.
#[derive(Debug)]
pub struct MemoryMapBuffer<'a> {
    base: *mut u8,
    capacity: usize,
    _storage: PhantomData<&'a mut [u8]>,
}

impl<'a> MemoryMapBuffer<'a> {
    /// Wrap a byte slice.
    ///
    /// The firmware writes `u64` fields in place, so callers should hand in
    /// 8-byte aligned storage. Reads through [`DescriptorTable`] do not depend
    /// on alignment.
    ///
    /// [`DescriptorTable`]: crate::descriptor::DescriptorTable
    pub fn new(storage: &'a mut [u8]) -> Self {
        Self {
            base: storage.as_mut_ptr(),
            capacity: storage.len(),
            _storage: PhantomData,
        }
    }

    /// Wrap a raw region.
    ///
    /// A null `base` or zero `capacity` is accepted here and rejected by
    /// [`acquire`](crate::acquire::acquire).
    ///
    /// # Safety
    ///
    /// If `base` is non-null it must be valid for reads and writes of
    /// `capacity` bytes for `'a`, and nothing else may access the region
    /// during that time.
    pub unsafe fn from_raw_parts(base: *mut u8, capacity: usize) -> Self {
        Self {
            base,
            capacity,
            _storage: PhantomData,
        }
    }

    /// An empty buffer with a null base
    pub const fn null() -> Self {
        Self {
            base: ptr::null_mut(),
            capacity: 0,
            _storage: PhantomData,
        }
    }

    #[must_use]
    pub fn base_address(&self) -> usize {
        self.base as usize
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.base.is_null() && self.capacity != 0
    }

    pub(crate) fn as_bytes(&self) -> Option<&[u8]> {
        if !self.is_valid() {
            return None;
        }
        // SAFETY: non-null and valid for `capacity` bytes, guaranteed by the
        // constructors
        Some(unsafe { core::slice::from_raw_parts(self.base, self.capacity) })
    }

    pub(crate) fn as_bytes_mut(&mut self) -> Option<&mut [u8]> {
        if !self.is_valid() {
            return None;
        }
        // SAFETY: as above, and `&mut self` makes the access exclusive
        Some(unsafe { core::slice::from_raw_parts_mut(self.base, self.capacity) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_buffer() {
        let mut storage = [0u8; 64];
        let addr = storage.as_ptr() as usize;
        let buffer = MemoryMapBuffer::new(&mut storage);
        assert!(buffer.is_valid());
        assert_eq!(buffer.capacity(), 64);
        assert_eq!(buffer.base_address(), addr);
        assert_eq!(buffer.as_bytes().map(<[u8]>::len), Some(64));
    }

    #[test]
    fn test_empty_and_null() {
        let mut storage = [0u8; 0];
        assert!(!MemoryMapBuffer::new(&mut storage).is_valid());

        let null = MemoryMapBuffer::null();
        assert!(!null.is_valid());
        assert!(null.as_bytes().is_none());

        // SAFETY: null base is never dereferenced
        let raw = unsafe { MemoryMapBuffer::from_raw_parts(ptr::null_mut(), 4096) };
        assert!(!raw.is_valid());
    }
}
