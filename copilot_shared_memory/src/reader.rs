//! Lock-free reader implementation

use crate::error::{ShmError, ShmResult};
use crate::platform::{attach_segment_mmap, is_process_alive};
use crate::segment::{SegmentHeader, SharedMemorySegment, segment_path};
use crate::version::VersionCounter;
use std::path::Path;
use std::sync::atomic::{Ordering, fence};
use tracing::debug;

const MAX_READ_RETRIES: usize = 10;

/// A consistent copy of the slot contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Message type tag
    pub tag: u32,
    /// Version the copy was taken at
    pub version: u64,
    /// Message bytes
    pub payload: &'a [u8],
}

/// Lock-free reader with conflict detection
pub struct SegmentReader {
    segment: SharedMemorySegment,
    last_seen_version: u64,
    read_buffer: Vec<u8>,
}

impl SegmentReader {
    /// Attach to the segment `name` inside `dir`
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

        let segment = SharedMemorySegment::new(name.to_string(), path, data_size, mmap)?;
        segment.header().add_reader();
        debug!(name, creator, data_size, "attached for reading");

        Ok(Self {
            segment,
            last_seen_version: 0,
            read_buffer: Vec::with_capacity(data_size),
        })
    }

    /// Copy the current slot contents with conflict detection
    ///
    /// Returns `VersionConflict` if a writer kept the slot busy for every
    /// retry.
    pub fn read(&mut self) -> ShmResult<Frame<'_>> {
        let header = self.segment.header();

        for _attempt in 0..MAX_READ_RETRIES {
            let version_before = header.version.load();
            if !VersionCounter::is_stable(version_before) {
                std::thread::yield_now();
                continue;
            }
            fence(Ordering::Acquire);

            let tag = header.tag.load(Ordering::Relaxed);
            let len = header.payload_len.load(Ordering::Relaxed) as usize;
            if len > self.segment.data_size {
                // Torn length from a concurrent write; the version check
                // below would reject it anyway.
                std::thread::yield_now();
                continue;
            }
            if self.read_buffer.len() < len {
                self.read_buffer.resize(len, 0);
            }
            // SAFETY: `len` is within the data section.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.segment.data_ptr(),
                    self.read_buffer.as_mut_ptr(),
                    len,
                );
            }
            fence(Ordering::Acquire);

            let version_after = header.version.load();
            if version_before == version_after {
                self.last_seen_version = version_after;
                return Ok(Frame {
                    tag,
                    version: version_after,
                    payload: &self.read_buffer[..len],
                });
            }
            std::thread::yield_now();
        }

        Err(ShmError::VersionConflict)
    }

    /// Mark the last read message as consumed
    pub fn acknowledge(&self) {
        self.segment
            .header()
            .acknowledged
            .store(self.last_seen_version, Ordering::Release);
    }

    /// True while a posted message waits for a consumer
    pub fn is_pending(&self) -> bool {
        self.segment.header().is_pending()
    }

    /// Check if the slot has been rewritten since the last read
    ///
    /// Only inspects the header; no payload is copied.
    pub fn has_changed(&self) -> bool {
        let current = self.segment.header().version.load();
        current != self.last_seen_version && VersionCounter::is_stable(current)
    }

    /// Version seen by the last successful read
    pub fn version(&self) -> u64 {
        self.last_seen_version
    }

    /// True if the creating process is still running
    pub fn creator_alive(&self) -> bool {
        is_process_alive(self.segment.header().writer_pid.load(Ordering::Acquire))
    }

    /// Get segment name
    pub fn name(&self) -> &str {
        &self.segment.name
    }

    /// Get data size
    pub fn data_size(&self) -> usize {
        self.segment.data_size
    }

    /// Get current reader count
    pub fn reader_count(&self) -> u32 {
        self.segment.header().get_reader_count()
    }
}

impl Drop for SegmentReader {
    fn drop(&mut self) {
        self.segment.header().remove_reader();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SHM_MIN_SIZE;
    use crate::writer::SegmentWriter;
    use tempfile::TempDir;

    #[test]
    fn test_reader_attachment() {
        let dir = TempDir::new().unwrap();
        let mut writer = SegmentWriter::create(dir.path(), "reader_test", SHM_MIN_SIZE).unwrap();
        writer.write(1, b"Hello, Reader!").unwrap();

        let reader = SegmentReader::attach(dir.path(), "reader_test").unwrap();
        assert_eq!(reader.data_size(), SHM_MIN_SIZE);
        assert_eq!(reader.reader_count(), 1);
        assert!(reader.creator_alive());
    }

    #[test]
    fn test_tagged_read() {
        let dir = TempDir::new().unwrap();
        let mut writer = SegmentWriter::create(dir.path(), "tagged", SHM_MIN_SIZE).unwrap();
        writer.write(0x0B01, b"spindle fault").unwrap();

        let mut reader = SegmentReader::attach(dir.path(), "tagged").unwrap();
        let frame = reader.read().unwrap();
        assert_eq!(frame.tag, 0x0B01);
        assert_eq!(frame.payload, b"spindle fault");
        assert_eq!(frame.version, 2);
    }

    #[test]
    fn test_multiple_readers() {
        let dir = TempDir::new().unwrap();
        let _writer = SegmentWriter::create(dir.path(), "multi", SHM_MIN_SIZE).unwrap();

        let reader1 = SegmentReader::attach(dir.path(), "multi").unwrap();
        let reader2 = SegmentReader::attach(dir.path(), "multi").unwrap();
        assert_eq!(reader1.reader_count(), 2);
        drop(reader2);
        assert_eq!(reader1.reader_count(), 1);
    }

    #[test]
    fn test_version_tracking() {
        let dir = TempDir::new().unwrap();
        let mut writer = SegmentWriter::create(dir.path(), "versions", SHM_MIN_SIZE).unwrap();
        let mut reader = SegmentReader::attach(dir.path(), "versions").unwrap();

        assert!(!reader.has_changed());
        writer.write(1, b"New data").unwrap();
        assert!(reader.has_changed());

        reader.read().unwrap();
        assert_eq!(reader.version(), 2);
        assert!(!reader.has_changed());
    }

    #[test]
    fn test_acknowledge_frees_mailbox() {
        let dir = TempDir::new().unwrap();
        let mut writer = SegmentWriter::create(dir.path(), "ack", SHM_MIN_SIZE).unwrap();
        let mut reader = SegmentReader::attach(dir.path(), "ack").unwrap();

        writer.post(3, b"one").unwrap();
        assert!(reader.is_pending());
        assert_eq!(reader.read().unwrap().payload, b"one");
        reader.acknowledge();
        assert!(!reader.is_pending());
        writer.post(3, b"two").unwrap();
    }

    #[test]
    fn test_nonexistent_segment() {
        let dir = TempDir::new().unwrap();
        let reader = SegmentReader::attach(dir.path(), "nonexistent");
        assert!(matches!(reader, Err(ShmError::NotFound { .. })));
    }
}
