use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use super::format::{
    ArchiveEntry, ArchiveError, ArchiveHeader, ArchiveResult, ENTRY_SIZE, validate_directory,
};

/// Outcome of [`extract_all`]. Entries whose output could not be written are
/// listed in `skipped`; extraction carries on past them.
#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub extracted: Vec<ArchiveEntry>,
    pub skipped: Vec<String>,
}

struct OpenArchive {
    path: PathBuf,
    reader: BufReader<File>,
    header: ArchiveHeader,
    len: u64,
}

impl OpenArchive {
    fn open(path: &Path) -> ArchiveResult<Self> {
        let file = File::open(path).map_err(|source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let header = match ArchiveHeader::read_from(&mut reader) {
            Ok(header) => header,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                ArchiveHeader {
                    magic: 0,
                    entry_count: 0,
                }
            }
            Err(e) => return Err(e.into()),
        };

        if !header.is_valid() {
            log::warn!("{}: not a valid archive", path.display());
            return Err(ArchiveError::InvalidArchive {
                path: path.to_path_buf(),
                magic: header.magic,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            header,
            len,
        })
    }

    fn next_entry(&mut self) -> ArchiveResult<ArchiveEntry> {
        Ok(ArchiveEntry::read_from(&mut self.reader)?)
    }

    fn directory(&mut self) -> ArchiveResult<Vec<ArchiveEntry>> {
        // entry_count comes from disk; don't trust it for the allocation
        let plausible = (self.len / ENTRY_SIZE as u64) as usize;
        let count = self.header.entry_count as usize;
        let mut entries = Vec::with_capacity(count.min(plausible));
        for _ in 0..count {
            entries.push(self.next_entry()?);
        }
        if let Err(e) = validate_directory(&entries, self.len) {
            log::warn!("{}: {}", self.path.display(), e);
            return Err(e);
        }
        Ok(entries)
    }

    fn read_data(&mut self, entry: &ArchiveEntry) -> ArchiveResult<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(entry.offset as u64))?;

        let mut buf = Vec::with_capacity((entry.size as u64).min(self.len) as usize);
        let read = (&mut self.reader)
            .take(entry.size as u64)
            .read_to_end(&mut buf)?;

        if read as u64 != entry.size as u64 {
            return Err(ArchiveError::ShortRead {
                name: entry.name.clone(),
                expected: entry.size,
                actual: read as u64,
            });
        }

        Ok(buf)
    }
}

/// Reads the directory of the archive at `archive_path`.
pub fn list<P: AsRef<Path>>(archive_path: P) -> ArchiveResult<Vec<ArchiveEntry>> {
    OpenArchive::open(archive_path.as_ref())?.directory()
}

/// Returns the bytes of the entry called `entry_name`.
///
/// The directory is scanned front to back and the first exact match wins.
pub fn read_entry<P: AsRef<Path>>(archive_path: P, entry_name: &str) -> ArchiveResult<Vec<u8>> {
    let mut archive = OpenArchive::open(archive_path.as_ref())?;

    for _ in 0..archive.header.entry_count {
        let entry = archive.next_entry()?;
        if entry.name == entry_name {
            return archive.read_data(&entry);
        }
    }

    log::warn!(
        "{}: no entry '{}'",
        archive.path.display(),
        entry_name
    );
    Err(ArchiveError::NoEntry {
        archive: archive.path,
        name: entry_name.to_string(),
    })
}

/// Text convenience over [`read_entry`]. Invalid UTF-8 is replaced rather
/// than rejected, since script sources are handed straight to the host.
pub fn read_entry_string<P: AsRef<Path>>(archive_path: P, entry_name: &str) -> ArchiveResult<String> {
    let bytes = read_entry(archive_path, entry_name)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Writes every entry into `dest_dir` under its own name.
pub fn extract_all<P, D>(archive_path: P, dest_dir: D) -> ArchiveResult<ExtractSummary>
where
    P: AsRef<Path>,
    D: AsRef<Path>,
{
    let dest_dir = dest_dir.as_ref();
    let mut archive = OpenArchive::open(archive_path.as_ref())?;
    let directory = archive.directory()?;
    let mut summary = ExtractSummary::default();

    for entry in directory {
        log::info!("{}: {} bytes", entry.name, entry.size);

        if !is_plain_file_name(&entry.name) {
            log::warn!("{}: refusing to extract outside destination", entry.name);
            summary.skipped.push(entry.name);
            continue;
        }

        let out_path = dest_dir.join(&entry.name);
        let written = archive
            .read_data(&entry)
            .and_then(|data| Ok(fs::write(&out_path, data)?));

        match written {
            Ok(()) => summary.extracted.push(entry),
            Err(e) => {
                log::warn!("{}: {}", out_path.display(), e);
                summary.skipped.push(entry.name);
            }
        }
    }

    Ok(summary)
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("client.lua"));
        assert!(is_plain_file_name("font.ttf"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("../escape.lua"));
        assert!(!is_plain_file_name("/etc/passwd"));
        assert!(!is_plain_file_name("nested/file.lua"));
    }
}
