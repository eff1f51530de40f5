//! Error types for shared memory channel operations

use thiserror::Error;

/// Errors that can occur during shared memory channel operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// Segment already exists
    #[error("Segment already exists: {name}")]
    AlreadyExists {
        /// Segment name
        name: String,
    },

    /// Segment not found
    #[error("Segment not found: {name}")]
    NotFound {
        /// Segment name
        name: String,
    },

    /// Invalid segment size
    #[error("Invalid segment size: {size} bytes (must be 4KB-1GB, page-aligned)")]
    InvalidSize {
        /// Attempted size in bytes
        size: usize,
    },

    /// Payload does not fit into the data section
    #[error("Payload of {size} bytes exceeds channel capacity of {capacity} bytes")]
    PayloadTooLarge {
        /// Payload size in bytes
        size: usize,
        /// Data section size in bytes
        capacity: usize,
    },

    /// Header magic or recorded size does not match
    #[error("Invalid segment header: {name}")]
    InvalidHeader {
        /// Segment name
        name: String,
    },

    /// Version conflict detected during read
    #[error("Version conflict detected - retry recommended")]
    VersionConflict,

    /// The previous message has not been consumed yet
    #[error("Channel full: previous message on {name} not consumed")]
    ChannelFull {
        /// Segment name
        name: String,
    },

    /// Permission denied
    #[error("Permission denied accessing segment: {name}")]
    PermissionDenied {
        /// Segment name
        name: String,
    },

    /// The process that created the segment is gone
    #[error("Segment {name} was created by process {pid}, which is no longer running")]
    CreatorDead {
        /// Segment name
        name: String,
        /// Creator process ID
        pid: u32,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },
}

/// Result type for shared memory operations
pub type ShmResult<T> = Result<T, ShmError>;
