//! EFI report file
//!
//! Creates the report file on the volume this image was loaded from and
//! exposes it as a [`ReportSink`].

use crate::config::MAX_PATH_LEN;
use tom_mmap::ReportSink;
use uefi::boot;
use uefi::proto::media::file::{File, FileAttribute, FileMode, RegularFile};
use uefi::{CStr16, Status};

/// Open `path` on the boot volume for writing, replacing any existing file.
///
/// The volume is the one holding this image (loaded image → device →
/// simple file system). UEFI has no truncating open, so an existing file is
/// deleted and created again.
pub fn create_report_file(path: &str) -> uefi::Result<RegularFile> {
    let mut path_buf = [0u16; MAX_PATH_LEN];
    let cpath = CStr16::from_str_with_buf(path, &mut path_buf)
        .map_err(|_| uefi::Error::from(Status::INVALID_PARAMETER))?;

    let mut sfs = boot::get_image_file_system(boot::image_handle())?;
    let mut root = sfs.open_volume()?;

    match root.open(cpath, FileMode::ReadWrite, FileAttribute::empty()) {
        Ok(existing) => {
            log::debug!("Replacing existing {}", path);
            existing.delete()?;
        }
        Err(e) if e.status() == Status::NOT_FOUND => {}
        Err(e) => return Err(e),
    }

    let handle = root.open(cpath, FileMode::CreateReadWrite, FileAttribute::empty())?;
    handle
        .into_regular_file()
        .ok_or_else(|| uefi::Error::from(Status::ACCESS_DENIED))
}

/// [`ReportSink`] writing straight into an EFI file
pub struct EfiFileSink {
    file: RegularFile,
}

impl EfiFileSink {
    pub fn new(file: RegularFile) -> Self {
        Self { file }
    }

    /// Flush buffered data to the volume; the file closes on drop.
    pub fn finish(mut self) -> uefi::Result {
        self.file.flush()
    }
}

impl ReportSink for EfiFileSink {
    type Error = Status;

    fn append(&mut self, bytes: &[u8]) -> Result<usize, Status> {
        match self.file.write(bytes) {
            Ok(()) => Ok(bytes.len()),
            Err(e) => {
                log::debug!("File write failed after {} of {} bytes", e.data(), bytes.len());
                Err(e.status())
            }
        }
    }
}
