use super::models::EntryKind;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::Path;

/*
 * This module provides the leaf filesystem utilities used by the comparison
 * engine: a probe that classifies a path as absent, or present with a kind and
 * a readability flag, a directory listing helper, and the ignore filter applied
 * at every directory level. The probe is abstracted behind
 * `FileSystemProbeOperations` so tests can simulate unreadable paths without
 * depending on process privileges.
 */

/*
 * Result of probing a single path. `Absent` is reserved for "not found"; any
 * other failure means something is there that we cannot inspect, which the
 * engine reports as an unknown status rather than an error. `Unknown` is a
 * path whose kind could not be determined at all (stat failure, dangling
 * link); it is never readable.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Absent,
    Present { kind: EntryKind, readable: bool },
    Unknown,
}

impl Presence {
    pub fn exists(self) -> bool {
        !matches!(self, Presence::Absent)
    }

    pub fn is_readable(self) -> bool {
        matches!(self, Presence::Present { readable: true, .. })
    }

    pub fn kind(self) -> Option<EntryKind> {
        match self {
            Presence::Present { kind, .. } => Some(kind),
            Presence::Absent | Presence::Unknown => None,
        }
    }

    pub fn is_readable_dir(self) -> bool {
        self == Presence::Present {
            kind: EntryKind::Directory,
            readable: true,
        }
    }
}

/*
 * Defines the filesystem queries the comparison engine needs.
 * Implementations must never fail for the "unreadable" case; that condition is
 * part of the returned value. Only `list_names` reports an error, and callers
 * treat it as the directory being unreadable.
 */
pub trait FileSystemProbeOperations: Send + Sync {
    fn probe(&self, path: &Path) -> Presence;

    /* Lists the entry names of a directory. Names that are not valid UTF-8 are skipped. */
    fn list_names(&self, dir: &Path) -> io::Result<Vec<String>>;
}

/*
 * The real implementation of `FileSystemProbeOperations`, backed by `std::fs`.
 * Nothing is cached: the filesystem is the source of truth on every call.
 */
pub struct CoreFileSystemProbe {}

impl CoreFileSystemProbe {
    pub fn new() -> Self {
        CoreFileSystemProbe {}
    }
}

impl Default for CoreFileSystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystemProbeOperations for CoreFileSystemProbe {
    fn probe(&self, path: &Path) -> Presence {
        match fs::symlink_metadata(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Presence::Absent,
            Err(e) => {
                log::warn!("FileSystemProbe: Cannot stat {path:?}: {e}");
                return Presence::Unknown;
            }
            Ok(_) => {}
        }

        // The entry itself exists; follow links to find out what it points to.
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("FileSystemProbe: Uncomparable path {path:?}: {e}");
                return Presence::Unknown;
            }
        };

        if metadata.is_dir() {
            let readable = match fs::read_dir(path) {
                Ok(_) => true,
                Err(e) => {
                    log::warn!("FileSystemProbe: Cannot list directory {path:?}: {e}");
                    false
                }
            };
            Presence::Present {
                kind: EntryKind::Directory,
                readable,
            }
        } else {
            let readable = match File::open(path) {
                Ok(_) => true,
                Err(e) => {
                    log::warn!("FileSystemProbe: Cannot open file {path:?}: {e}");
                    false
                }
            };
            Presence::Present {
                kind: EntryKind::File,
                readable,
            }
        }
    }

    fn list_names(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for dir_entry in fs::read_dir(dir)? {
            let dir_entry = dir_entry?;
            match dir_entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => {
                    log::warn!("FileSystemProbe: Skipping non UTF-8 name {raw:?} in {dir:?}");
                }
            }
        }
        Ok(names)
    }
}

/*
 * Removes every name contained in `ignore`. Matching is by exact string
 * equality, without any case or Unicode normalization.
 */
pub fn filter_ignored(names: Vec<String>, ignore: &HashSet<String>) -> Vec<String> {
    if ignore.is_empty() {
        return names;
    }
    names
        .into_iter()
        .filter(|name| {
            let skip = ignore.contains(name);
            if skip {
                log::trace!("FileSystemProbe: Ignoring '{name}'");
            }
            !skip
        })
        .collect()
}
