//! Packed asset archives.
//!
//! Layout on disk, all integers little-endian:
//!
//! ```text
//! 0        magic u32 = 0x4B415021
//! 4        entry_count u32
//! 8        entry_count * { name[56] NUL-padded, offset u32, size u32 }
//! 8+n*64   file bytes, each at the offset its entry declares
//! ```
//!
//! Every operation opens and closes the file itself; nothing is cached
//! between calls.

mod format;
mod reader;
mod reload;
mod writer;

pub use format::{
    ARCHIVE_MAGIC, ArchiveEntry, ArchiveError, ArchiveHeader, ArchiveResult, ENTRY_SIZE,
    HEADER_SIZE, MAX_NAME_LEN, NAME_LEN, validate_directory,
};
pub use reader::{ExtractSummary, extract_all, list, read_entry, read_entry_string};
pub use reload::ReloadWatcher;
pub use writer::create;
