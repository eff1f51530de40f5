//! Single writer for one channel slot

use crate::error::{ShmError, ShmResult};
use crate::platform::{
    MapConfig, attach_segment_mmap, create_segment_mmap, get_current_pid, is_process_alive,
};
use crate::segment::{SegmentHeader, SharedMemorySegment, segment_path, validate_segment_size};
use std::path::Path;
use std::sync::atomic::{Ordering, fence};
use tracing::{debug, trace};

/// Writer for a channel slot.
///
/// A writer either creates the segment (and removes it on drop) or attaches
/// to a segment another process created. Only one writer may be active per
/// segment at a time.
pub struct SegmentWriter {
    segment: SharedMemorySegment,
    current_version: u64,
    owner: bool,
}

impl SegmentWriter {
    /// Create a new segment named `name` inside `dir`
    pub fn create(dir: &Path, name: &str, size: usize) -> ShmResult<Self> {
        validate_segment_size(size)?;

        let writer_pid = get_current_pid();
        let path = segment_path(dir, name);
        let total_size = size + std::mem::size_of::<SegmentHeader>();
        let mut mmap = create_segment_mmap(name, &path, total_size, &MapConfig::default())?;

        // SAFETY: the mapping is fresh, large enough and page aligned.
        unsafe {
            std::ptr::write(
                mmap.as_mut_ptr() as *mut SegmentHeader,
                SegmentHeader::new(size, writer_pid),
            );
        }
        fence(Ordering::Release);

        let segment = SharedMemorySegment::new(name.to_string(), path, size, mmap)?;
        debug!(name, size, writer_pid, path = %segment.path.display(), "segment created");

        Ok(Self {
            segment,
            current_version: 0,
            owner: true,
        })
    }

    /// Attach for writing to a segment created by another process
    ///
    /// Refuses segments whose creator is no longer running.
    pub fn attach(dir: &Path, name: &str) -> ShmResult<Self> {
        let path = segment_path(dir, name);
        let mmap = attach_segment_mmap(name, &path)?;

        if mmap.len() < std::mem::size_of::<SegmentHeader>() {
            return Err(ShmError::InvalidHeader {
                name: name.to_string(),
            });
        }
        // SAFETY: length checked above; mmap is page aligned.
        let header = unsafe { &*(mmap.as_ptr() as *const SegmentHeader) };
        header.validate(name, mmap.len())?;
        let creator = header.writer_pid.load(Ordering::Acquire);
        if !is_process_alive(creator) {
            return Err(ShmError::CreatorDead {
                name: name.to_string(),
                pid: creator,
            });
        }
        let data_size = header.size as usize;
        let current_version = header.version.load();

        let segment = SharedMemorySegment::new(name.to_string(), path, data_size, mmap)?;
        debug!(name, creator, "attached for writing");

        Ok(Self {
            segment,
            current_version,
            owner: false,
        })
    }

    /// Overwrite the slot with a tagged message
    pub fn write(&mut self, tag: u32, data: &[u8]) -> ShmResult<()> {
        if data.len() > self.segment.data_size {
            return Err(ShmError::PayloadTooLarge {
                size: data.len(),
                capacity: self.segment.data_size,
            });
        }

        let header_ptr = self.segment.header() as *const SegmentHeader;
        let data_ptr = self.segment.data_ptr_mut();

        // SAFETY: header lives inside the mapping owned by `self.segment`;
        // data bounds were checked above.
        unsafe {
            let header = &*header_ptr;
            header.version.begin_write();
            fence(Ordering::Release);

            header.tag.store(tag, Ordering::Relaxed);
            header.payload_len.store(data.len() as u64, Ordering::Relaxed);
            std::ptr::copy_nonoverlapping(data.as_ptr(), data_ptr, data.len());

            fence(Ordering::Release);
            self.current_version = header.version.end_write();
            header.touch();
        }

        trace!(
            name = %self.segment.name,
            tag,
            len = data.len(),
            version = self.current_version,
            "slot written"
        );
        Ok(())
    }

    /// Write only if the previous message has been consumed
    ///
    /// Returns `ChannelFull` while a reader has not acknowledged the last
    /// posted message.
    pub fn post(&mut self, tag: u32, data: &[u8]) -> ShmResult<()> {
        if self.segment.header().is_pending() {
            return Err(ShmError::ChannelFull {
                name: self.segment.name.clone(),
            });
        }
        self.write(tag, data)
    }

    /// True while the last posted message has not been consumed
    pub fn is_pending(&self) -> bool {
        self.segment.header().is_pending()
    }

    /// Get current version
    pub fn current_version(&self) -> u64 {
        self.current_version
    }

    /// Get creator process ID
    pub fn writer_pid(&self) -> u32 {
        self.segment.header().writer_pid.load(Ordering::Acquire)
    }

    /// Get segment name
    pub fn name(&self) -> &str {
        &self.segment.name
    }

    /// Get data size
    pub fn data_size(&self) -> usize {
        self.segment.data_size
    }
}

impl Drop for SegmentWriter {
    fn drop(&mut self) {
        if self.owner {
            let _ = std::fs::remove_file(&self.segment.path);
            debug!(name = %self.segment.name, "segment removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SHM_MIN_SIZE;
    use tempfile::TempDir;

    #[test]
    fn test_writer_creation() {
        let dir = TempDir::new().unwrap();
        let writer = SegmentWriter::create(dir.path(), "test_segment", SHM_MIN_SIZE).unwrap();
        assert_eq!(writer.data_size(), SHM_MIN_SIZE);
        assert_eq!(writer.current_version(), 0);
        assert_eq!(writer.writer_pid(), get_current_pid());
    }

    #[test]
    fn test_exclusive_creation() {
        let dir = TempDir::new().unwrap();
        let _writer1 = SegmentWriter::create(dir.path(), "exclusive", SHM_MIN_SIZE).unwrap();
        let writer2 = SegmentWriter::create(dir.path(), "exclusive", SHM_MIN_SIZE);
        assert!(matches!(writer2, Err(ShmError::AlreadyExists { .. })));
    }

    #[test]
    fn test_write_bounds() {
        let dir = TempDir::new().unwrap();
        let mut writer = SegmentWriter::create(dir.path(), "bounds", SHM_MIN_SIZE).unwrap();

        assert!(writer.write(1, b"Hello, World!").is_ok());
        assert_eq!(writer.current_version(), 2);

        let large = vec![0u8; SHM_MIN_SIZE + 1];
        assert!(matches!(
            writer.write(1, &large),
            Err(ShmError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_post_requires_consumption() {
        let dir = TempDir::new().unwrap();
        let mut writer = SegmentWriter::create(dir.path(), "mailbox", SHM_MIN_SIZE).unwrap();

        writer.post(7, b"first").unwrap();
        assert!(writer.is_pending());
        assert!(matches!(
            writer.post(7, b"second"),
            Err(ShmError::ChannelFull { .. })
        ));
    }

    #[test]
    fn test_attach_for_write_shares_versions() {
        let dir = TempDir::new().unwrap();
        let mut creator = SegmentWriter::create(dir.path(), "shared", SHM_MIN_SIZE).unwrap();
        creator.write(1, b"a").unwrap();

        let mut attached = SegmentWriter::attach(dir.path(), "shared").unwrap();
        assert_eq!(attached.current_version(), 2);
        attached.write(2, b"b").unwrap();
        assert_eq!(attached.current_version(), 4);
    }

    #[test]
    fn test_drop_removes_owned_file() {
        let dir = TempDir::new().unwrap();
        let path = segment_path(dir.path(), "ephemeral");
        {
            let _writer = SegmentWriter::create(dir.path(), "ephemeral", SHM_MIN_SIZE).unwrap();
            assert!(path.exists());
            let _attached = SegmentWriter::attach(dir.path(), "ephemeral").unwrap();
        }
        assert!(!path.exists());
    }
}
