//! Shared memory segment structures and operations

use crate::error::{ShmError, ShmResult};
use crate::version::VersionCounter;
use memmap2::MmapMut;
use static_assertions::const_assert_eq;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Magic number identifying a copilot channel segment ("COPILOT1").
pub const COPILOT_SHM_MAGIC: u64 = 0x434F_5049_4C4F_5431;

/// Minimum data section size (one page).
pub const SHM_MIN_SIZE: usize = 4096;

/// Maximum data section size (1 GiB).
pub const SHM_MAX_SIZE: usize = 1024 * 1024 * 1024;

/// Cache line size assumed for header alignment.
pub const CACHE_LINE_SIZE: usize = 64;

/// Prefix of every segment file name.
pub const SEGMENT_PREFIX: &str = "copilot_";

/// Segment header with cache-line alignment
///
/// One header precedes a single-slot data section. The slot holds the most
/// recent message; `tag` and `payload_len` describe it and are covered by
/// the same version as the payload bytes.
#[repr(C, align(64))]
pub struct SegmentHeader {
    /// Magic number for validation
    pub magic: u64,
    /// Version counter for optimistic concurrency
    pub version: VersionCounter,
    /// Last version a consumer has taken out of the slot
    pub acknowledged: AtomicU64,
    /// Creator process ID
    pub writer_pid: AtomicU32,
    /// Active reader count
    pub reader_count: AtomicU32,
    /// Type tag of the message in the slot
    pub tag: AtomicU32,
    _reserved: u32,
    /// Length of the message in the slot
    pub payload_len: AtomicU64,
    /// Data section size
    pub size: u64,
    /// Creation timestamp (ns since epoch)
    pub created_ts: u64,
    /// Last write timestamp
    pub last_write_ts: AtomicU64,
    _padding: [u8; 56],
}

const_assert_eq!(std::mem::size_of::<SegmentHeader>(), 128);
const_assert_eq!(std::mem::align_of::<SegmentHeader>(), CACHE_LINE_SIZE);

impl SegmentHeader {
    /// Create new segment header
    pub fn new(size: usize, writer_pid: u32) -> Self {
        let now = now_ns();
        Self {
            magic: COPILOT_SHM_MAGIC,
            version: VersionCounter::new(),
            acknowledged: AtomicU64::new(0),
            writer_pid: AtomicU32::new(writer_pid),
            reader_count: AtomicU32::new(0),
            tag: AtomicU32::new(0),
            _reserved: 0,
            payload_len: AtomicU64::new(0),
            size: size as u64,
            created_ts: now,
            last_write_ts: AtomicU64::new(now),
            _padding: [0; 56],
        }
    }

    /// Validate header magic and recorded size against the mapping
    pub fn validate(&self, name: &str, mapped_len: usize) -> ShmResult<()> {
        let fits = (self.size as usize)
            .checked_add(std::mem::size_of::<Self>())
            .is_some_and(|total| total <= mapped_len);
        if self.magic != COPILOT_SHM_MAGIC || !fits {
            return Err(ShmError::InvalidHeader {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// True while a posted message waits for a consumer
    #[inline]
    pub fn is_pending(&self) -> bool {
        let version = self.version.load();
        VersionCounter::is_stable(version)
            && version != self.acknowledged.load(Ordering::Acquire)
    }

    /// Increment reader count
    pub fn add_reader(&self) -> u32 {
        self.reader_count.fetch_add(1, Ordering::AcqRel)
    }

    /// Decrement reader count
    pub fn remove_reader(&self) -> u32 {
        self.reader_count.fetch_sub(1, Ordering::AcqRel)
    }

    /// Get current reader count
    pub fn get_reader_count(&self) -> u32 {
        self.reader_count.load(Ordering::Acquire)
    }

    pub(crate) fn touch(&self) {
        self.last_write_ts.store(now_ns(), Ordering::Release);
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Core shared memory segment representation
pub struct SharedMemorySegment {
    /// Segment name
    pub name: String,
    /// Backing file
    pub path: PathBuf,
    /// Data section size
    pub data_size: usize,
    mmap: MmapMut,
}

impl SharedMemorySegment {
    /// Wrap a mapping whose header has already been initialised or validated
    pub fn new(name: String, path: PathBuf, data_size: usize, mmap: MmapMut) -> ShmResult<Self> {
        validate_segment_size(data_size)?;
        if mmap.len() < data_size + std::mem::size_of::<SegmentHeader>()
            || (mmap.as_ptr() as usize) % CACHE_LINE_SIZE != 0
        {
            return Err(ShmError::InvalidHeader { name });
        }

        Ok(Self {
            name,
            path,
            data_size,
            mmap,
        })
    }

    /// Get header reference
    pub fn header(&self) -> &SegmentHeader {
        // SAFETY: the mapping is at least header-sized and page aligned, and
        // every header field written after creation is atomic.
        unsafe { &*(self.mmap.as_ptr() as *const SegmentHeader) }
    }

    /// Get data section pointer
    pub fn data_ptr(&self) -> *const u8 {
        // SAFETY: the mapping extends past the header by `data_size` bytes.
        unsafe { self.mmap.as_ptr().add(std::mem::size_of::<SegmentHeader>()) }
    }

    /// Get mutable data section pointer (writer only)
    pub fn data_ptr_mut(&mut self) -> *mut u8 {
        // SAFETY: as for `data_ptr`.
        unsafe {
            self.mmap
                .as_mut_ptr()
                .add(std::mem::size_of::<SegmentHeader>())
        }
    }
}

/// File backing the channel `name` inside `dir`.
pub fn segment_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{SEGMENT_PREFIX}{name}"))
}

/// Validate segment size constraints
pub fn validate_segment_size(size: usize) -> ShmResult<()> {
    if !(SHM_MIN_SIZE..=SHM_MAX_SIZE).contains(&size) || size % SHM_MIN_SIZE != 0 {
        return Err(ShmError::InvalidSize { size });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_size_validation() {
        assert!(validate_segment_size(SHM_MIN_SIZE).is_ok());
        assert!(validate_segment_size(8192).is_ok());
        assert!(validate_segment_size(1024 * 1024).is_ok());

        assert!(validate_segment_size(1024).is_err());
        assert!(validate_segment_size(4097).is_err());
        assert!(validate_segment_size(2 * 1024 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_header_creation() {
        let header = SegmentHeader::new(SHM_MIN_SIZE, 12345);
        assert_eq!(header.magic, COPILOT_SHM_MAGIC);
        assert_eq!(header.size, SHM_MIN_SIZE as u64);
        assert_eq!(header.writer_pid.load(Ordering::Relaxed), 12345);
        assert_eq!(header.get_reader_count(), 0);
        assert!(!header.is_pending());
    }

    #[test]
    fn test_header_validation() {
        let header = SegmentHeader::new(SHM_MIN_SIZE, 1);
        let mapped = SHM_MIN_SIZE + std::mem::size_of::<SegmentHeader>();
        assert!(header.validate("ok", mapped).is_ok());
        assert!(header.validate("short", mapped - 1).is_err());

        let mut invalid = header;
        invalid.magic = 0;
        assert!(matches!(
            invalid.validate("bad", mapped),
            Err(ShmError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_segment_path() {
        let path = segment_path(Path::new("/dev/shm"), "emcStatus");
        assert_eq!(path, PathBuf::from("/dev/shm/copilot_emcStatus"));
    }
}
