use crate::error::{ErrorKind, Result};
use crate::path::resolve;
use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::Path;
use tracing::instrument;
use zip::ZipArchive;

/// Summary of what an extraction materialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Extracted {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Expand every entry of a zip archive into `destination`, in stored order.
///
/// Directory entries are created along with any missing parents. File entries
/// get their parent directories created on demand, then their full contents
/// written to the corresponding relative path.
///
/// Entry names go through [`normalize_entry`](crate::normalize_entry) first;
/// any entry that would resolve outside `destination` aborts the whole
/// extraction before it touches the disk. There is no partial-success mode:
/// the first failure is returned and whatever was already written stays put
/// for the caller to clean up.
#[instrument(skip_all, fields(destination = %destination.display()))]
pub fn extract<R: Read + Seek>(archive: R, destination: &Path) -> Result<Extracted> {
    let mut zip = ZipArchive::new(archive).map_err(|e| ErrorKind::InvalidArchive(e.to_string()))?;
    let mut extracted = Extracted::default();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| ErrorKind::InvalidArchive(e.to_string()))?;
        let Some(target) = resolve(destination, entry.name())? else {
            if entry.is_dir() {
                continue;
            }
            exn::bail!(ErrorKind::UnsafePath(entry.name().to_string()));
        };
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| ErrorKind::io(&target, e))?;
            extracted.directories += 1;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ErrorKind::io(parent, e))?;
        }
        let mut file = File::create(&target).map_err(|e| ErrorKind::io(&target, e))?;
        let written = io::copy(&mut entry, &mut file).map_err(|e| ErrorKind::io(&target, e))?;
        tracing::trace!(entry = entry.name(), bytes = written, "Extracted file");
        extracted.files += 1;
        extracted.bytes += written;
    }
    tracing::debug!(
        files = extracted.files,
        directories = extracted.directories,
        bytes = extracted.bytes,
        "Archive extracted"
    );
    Ok(extracted)
}
