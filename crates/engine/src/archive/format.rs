use std::io::{self, Read, Write};
use std::ops::Range;
use std::path::PathBuf;

pub const ARCHIVE_MAGIC: u32 = 0x4B41_5021;
pub const NAME_LEN: usize = 56;
/// Longest name that still leaves room for the terminating NUL.
pub const MAX_NAME_LEN: usize = NAME_LEN - 1;
pub const HEADER_SIZE: usize = 8;
pub const ENTRY_SIZE: usize = NAME_LEN + 4 + 4;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("{}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("{}: cannot create: {source}", .path.display())]
    Create { path: PathBuf, source: io::Error },
    #[error("{}: not a valid archive (magic {magic:#010x})", .path.display())]
    InvalidArchive { path: PathBuf, magic: u32 },
    #[error("{}: no entry '{name}'", .archive.display())]
    NoEntry { archive: PathBuf, name: String },
    #[error("entry name '{name}' exceeds 55 bytes")]
    NameTooLong { name: String },
    #[error("duplicate entry '{name}'")]
    DuplicateEntry { name: String },
    #[error("{}: file name is not valid UTF-8", .path.display())]
    InvalidName { path: PathBuf },
    #[error("archive would be {size} bytes, offsets are limited to 32 bits")]
    TooLarge { size: u64 },
    #[error("entry '{name}' spans {start}..{end}, outside the data region {data_start}..{file_len}")]
    EntryOutOfBounds {
        name: String,
        start: u64,
        end: u64,
        data_start: u64,
        file_len: u64,
    },
    #[error("entry '{second}' starts before '{first}' ends")]
    OverlappingEntries { first: String, second: String },
    #[error("entry '{name}' expected {expected} bytes, got {actual}")]
    ShortRead {
        name: String,
        expected: u32,
        actual: u64,
    },
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub magic: u32,
    pub entry_count: u32,
}

impl ArchiveHeader {
    pub fn new(entry_count: u32) -> Self {
        Self {
            magic: ARCHIVE_MAGIC,
            entry_count,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == ARCHIVE_MAGIC
    }

    /// Offset of the first data byte.
    pub fn data_start(&self) -> u64 {
        data_start(self.entry_count)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.magic.to_le_bytes())?;
        writer.write_all(&self.entry_count.to_le_bytes())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; HEADER_SIZE];
        reader.read_exact(&mut buf)?;
        Ok(Self {
            magic: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            entry_count: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }
}

/// One directory record: `name[56] | offset u32 | size u32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

impl ArchiveEntry {
    pub fn data_range(&self) -> Range<u64> {
        let start = self.offset as u64;
        start..start + self.size as u64
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> ArchiveResult<()> {
        let name = encode_name(&self.name)?;
        writer.write_all(&name)?;
        writer.write_all(&self.offset.to_le_bytes())?;
        writer.write_all(&self.size.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; ENTRY_SIZE];
        reader.read_exact(&mut buf)?;

        let name = decode_name(&buf[..NAME_LEN]);
        let tail = &buf[NAME_LEN..];
        Ok(Self {
            name,
            offset: u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]),
            size: u32::from_le_bytes([tail[4], tail[5], tail[6], tail[7]]),
        })
    }
}

pub fn data_start(entry_count: u32) -> u64 {
    HEADER_SIZE as u64 + entry_count as u64 * ENTRY_SIZE as u64
}

/// Checks a directory read from disk against the file it came from: every
/// entry lies between the end of the directory and the end of the file, and
/// non-empty entries follow each other without overlapping.
pub fn validate_directory(entries: &[ArchiveEntry], file_len: u64) -> ArchiveResult<()> {
    let data_start = HEADER_SIZE as u64 + entries.len() as u64 * ENTRY_SIZE as u64;
    let mut previous: Option<&ArchiveEntry> = None;

    for entry in entries {
        let range = entry.data_range();
        if range.start < data_start || range.end > file_len {
            return Err(ArchiveError::EntryOutOfBounds {
                name: entry.name.clone(),
                start: range.start,
                end: range.end,
                data_start,
                file_len,
            });
        }

        if entry.size == 0 {
            continue;
        }
        if let Some(prev) = previous {
            if range.start < prev.data_range().end {
                return Err(ArchiveError::OverlappingEntries {
                    first: prev.name.clone(),
                    second: entry.name.clone(),
                });
            }
        }
        previous = Some(entry);
    }

    Ok(())
}

fn encode_name(name: &str) -> ArchiveResult<[u8; NAME_LEN]> {
    let bytes = name.as_bytes();
    if bytes.len() > MAX_NAME_LEN {
        return Err(ArchiveError::NameTooLong {
            name: name.to_string(),
        });
    }

    let mut out = [0u8; NAME_LEN];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

fn decode_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_layout() {
        let mut buf = Vec::new();
        ArchiveHeader::new(3).write_to(&mut buf).unwrap();

        assert_eq!(buf, [0x21, 0x50, 0x41, 0x4B, 3, 0, 0, 0]);
        assert_eq!(ArchiveHeader::new(3).data_start(), 8 + 3 * 64);
    }

    #[test]
    fn test_entry_layout() {
        let entry = ArchiveEntry {
            name: "main.lua".to_string(),
            offset: 72,
            size: 0x0102,
        };

        let mut buf = Vec::new();
        entry.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), ENTRY_SIZE);
        assert_eq!(&buf[..8], b"main.lua");
        assert!(buf[8..NAME_LEN].iter().all(|&b| b == 0));
        assert_eq!(&buf[NAME_LEN..NAME_LEN + 4], &[72, 0, 0, 0]);
        assert_eq!(&buf[NAME_LEN + 4..], &[0x02, 0x01, 0, 0]);

        let decoded = ArchiveEntry::read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_name_length_limit() {
        let fits = "a".repeat(MAX_NAME_LEN);
        assert!(encode_name(&fits).is_ok());

        let too_long = "a".repeat(NAME_LEN);
        assert!(matches!(
            encode_name(&too_long),
            Err(ArchiveError::NameTooLong { .. })
        ));
    }

    fn entry(name: &str, offset: u32, size: u32) -> ArchiveEntry {
        ArchiveEntry {
            name: name.to_string(),
            offset,
            size,
        }
    }

    #[test]
    fn test_validate_directory() {
        // two entries: data starts at 8 + 2 * 64 = 136
        let entries = [entry("a", 136, 4), entry("b", 140, 0)];
        assert!(validate_directory(&entries, 140).is_ok());

        let past_end = [entry("a", 136, 4), entry("b", 140, 10)];
        assert!(matches!(
            validate_directory(&past_end, 144),
            Err(ArchiveError::EntryOutOfBounds { ref name, end: 150, .. }) if name == "b"
        ));

        let inside_directory = [entry("a", 72, 4), entry("b", 140, 4)];
        assert!(matches!(
            validate_directory(&inside_directory, 144),
            Err(ArchiveError::EntryOutOfBounds { .. })
        ));

        let overlapping = [entry("a", 136, 4), entry("b", 138, 4)];
        assert!(matches!(
            validate_directory(&overlapping, 142),
            Err(ArchiveError::OverlappingEntries { ref first, ref second })
                if first == "a" && second == "b"
        ));

        let backwards = [entry("a", 140, 4), entry("b", 136, 4)];
        assert!(matches!(
            validate_directory(&backwards, 144),
            Err(ArchiveError::OverlappingEntries { .. })
        ));
    }

    #[test]
    fn test_decode_name_without_terminator() {
        let raw = [b'x'; NAME_LEN];
        assert_eq!(decode_name(&raw).len(), NAME_LEN);
    }
}
