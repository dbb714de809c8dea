//! Per-request working directories and zip extraction.
//!
//! An uploaded repository archive lands in a [`WorkingDirectory`], a uniquely
//! named directory under an explicitly configured base that is removed when the
//! guard drops. [`extract`] then expands the archive into it, entry by entry, in
//! the order the archive stores them.
//!
//! Entry names are never trusted: each is resolved by [`normalize_entry`] and
//! the whole extraction aborts on the first entry that would escape the
//! working directory (`../../etc/passwd`, `/etc/passwd`, ...).

pub mod error;
mod extract;
mod path;
mod workdir;

pub use crate::extract::{Extracted, extract};
pub use crate::path::normalize as normalize_entry;
pub use crate::workdir::{ARCHIVE_FILE_NAME, WorkingDirectory};
