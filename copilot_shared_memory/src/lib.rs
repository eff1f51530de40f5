//! # Copilot Shared Memory Channels
//!
//! Single-slot, tagged message channels over memory-mapped files. Each
//! channel is one segment: a 128-byte cache-aligned header followed by a
//! data section holding the most recent message.
//!
//! ## Access Patterns
//!
//! - **Latest value** (status): the writer overwrites the slot with
//!   [`SegmentWriter::write`]; readers poll [`SegmentReader::has_changed`],
//!   which only inspects the header, and copy the payload when it moved.
//! - **Mailbox** (commands, operator messages): the writer uses
//!   [`SegmentWriter::post`], which refuses to overwrite a message nobody
//!   has consumed yet; the consumer reads and then calls
//!   [`SegmentReader::acknowledge`].
//!
//! ## Layout
//!
//! ```text
//! ┌────────────────────────────── header (128 B) ─────────────────────────────┐
//! │ magic │ version │ acknowledged │ pid │ readers │ tag │ len │ size │ ts … │
//! ├────────────────────────────── data (size B) ──────────────────────────────┤
//! │ payload[0..len]                                                           │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `version` is an even/odd counter: odd while a write is in progress. A
//! reader copies the tag, length and payload between two equal, even
//! samples of it.
//!
//! ## Usage
//!
//! ```rust
//! use copilot_shared_memory::{SegmentReader, SegmentWriter, SHM_MIN_SIZE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = std::env::temp_dir();
//! let mut writer = SegmentWriter::create(&dir, "doc_status", SHM_MIN_SIZE)?;
//! writer.write(0x01, b"spindle at speed")?;
//!
//! let mut reader = SegmentReader::attach(&dir, "doc_status")?;
//! if reader.has_changed() {
//!     let frame = reader.read()?;
//!     assert_eq!(frame.tag, 0x01);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! - **SegmentWriter**: single writer per segment
//! - **SegmentReader**: one reader per thread; any number per segment

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod platform;
pub mod reader;
pub mod segment;
pub mod version;
pub mod writer;

pub use error::{ShmError, ShmResult};
pub use reader::{Frame, SegmentReader};
pub use segment::{SHM_MAX_SIZE, SHM_MIN_SIZE, SegmentHeader, SharedMemorySegment, segment_path};
pub use version::VersionCounter;
pub use writer::SegmentWriter;
