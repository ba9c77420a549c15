//! Loader Configuration Constants

/// Name printed in the startup banner
pub const LOADER_NAME: &str = "TomLoader";

/// Report file at the root of the volume the image was loaded from
pub const MEMMAP_PATH: &str = "\\memmap";

/// Longest UCS-2 path accepted, including the terminating NUL
pub const MAX_PATH_LEN: usize = 64;

/// Memory map buffer size
/// A few hundred 48-byte descriptors; firmware maps are usually far smaller.
/// Undersize is reported, never retried.
pub const MEMORY_MAP_BUFFER_SIZE: usize = 16 * 1024; // 16 KB

const _: () = assert!(MEMMAP_PATH.len() < MAX_PATH_LEN, "MEMMAP_PATH too long");
