use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use super::format::{
    ArchiveEntry, ArchiveError, ArchiveHeader, ArchiveResult, MAX_NAME_LEN, data_start,
};

/// Packs `inputs` into a new archive at `archive_path`.
///
/// Only the final path component of each input becomes its entry name. The
/// output is created before the inputs are inspected, so a failure part way
/// through leaves a truncated file behind; callers must not use it.
pub fn create<A, P>(archive_path: A, inputs: &[P]) -> ArchiveResult<Vec<ArchiveEntry>>
where
    A: AsRef<Path>,
    P: AsRef<Path>,
{
    let archive_path = archive_path.as_ref();
    let out = File::create(archive_path).map_err(|source| ArchiveError::Create {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(out);

    let directory = build_directory(inputs)?;

    ArchiveHeader::new(directory.len() as u32).write_to(&mut out)?;
    for entry in &directory {
        entry.write_to(&mut out)?;
    }

    for (input, entry) in inputs.iter().zip(&directory) {
        let input = input.as_ref();
        let file = open_input(input)?;
        let copied = io::copy(&mut file.take(entry.size as u64), &mut out)?;
        if copied != entry.size as u64 {
            return Err(ArchiveError::ShortRead {
                name: entry.name.clone(),
                expected: entry.size,
                actual: copied,
            });
        }
    }

    out.flush()?;

    log::debug!(
        "packed {} entries into {}",
        directory.len(),
        archive_path.display()
    );

    Ok(directory)
}

fn build_directory<P: AsRef<Path>>(inputs: &[P]) -> ArchiveResult<Vec<ArchiveEntry>> {
    let count = u32::try_from(inputs.len()).map_err(|_| ArchiveError::TooLarge {
        size: inputs.len() as u64,
    })?;

    let mut offset = data_start(count);
    let mut seen = HashSet::with_capacity(inputs.len());
    let mut directory = Vec::with_capacity(inputs.len());

    for input in inputs {
        let input = input.as_ref();
        let name = entry_name(input)?;
        if !seen.insert(name.clone()) {
            return Err(ArchiveError::DuplicateEntry { name });
        }

        let size = open_input(input)?.metadata()?.len();
        let end = offset + size;
        if end > u32::MAX as u64 {
            return Err(ArchiveError::TooLarge { size: end });
        }

        directory.push(ArchiveEntry {
            name,
            offset: offset as u32,
            size: size as u32,
        });
        offset = end;
    }

    Ok(directory)
}

fn entry_name(input: &Path) -> ArchiveResult<String> {
    let name = input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ArchiveError::InvalidName {
            path: input.to_path_buf(),
        })?;

    if name.len() > MAX_NAME_LEN {
        return Err(ArchiveError::NameTooLong {
            name: name.to_string(),
        });
    }

    Ok(name.to_string())
}

fn open_input(path: &Path) -> ArchiveResult<File> {
    File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })
}
