/*
 * Decides whether two regular files are equal. Two policies are supported:
 * `Shallow` trusts matching size and modification time without reading the
 * files, while `Strict` always compares the bytes when the sizes match. In
 * both policies files of different sizes are never equal, and a shallow
 * signature mismatch with equal sizes still falls back to reading the content.
 */
use serde::{Deserialize, Serialize};
use std::fs::{self, File, Metadata};
use std::io::{self, BufReader, Read};
use std::path::Path;

const COMPARE_BUFFER_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonPolicy {
    #[default]
    Shallow,
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileComparator {
    policy: ComparisonPolicy,
}

impl FileComparator {
    pub fn new(policy: ComparisonPolicy) -> Self {
        FileComparator { policy }
    }

    pub fn policy(&self) -> ComparisonPolicy {
        self.policy
    }

    /*
     * Returns `Ok(true)` when the two files are considered equal under the
     * configured policy. Any I/O error is returned to the caller, which maps
     * it to an unknown status.
     */
    pub fn files_equal(&self, left: &Path, right: &Path) -> io::Result<bool> {
        let left_meta = fs::metadata(left)?;
        let right_meta = fs::metadata(right)?;

        if self.policy == ComparisonPolicy::Shallow && same_signature(&left_meta, &right_meta) {
            log::trace!("FileComparator: Signatures match for {left:?} and {right:?}");
            return Ok(true);
        }
        if left_meta.len() != right_meta.len() {
            return Ok(false);
        }
        contents_equal(left, right)
    }
}

fn same_signature(left: &Metadata, right: &Metadata) -> bool {
    if left.is_file() != right.is_file() || left.len() != right.len() {
        return false;
    }
    match (left.modified(), right.modified()) {
        (Ok(l), Ok(r)) => l == r,
        _ => false,
    }
}

fn contents_equal(left: &Path, right: &Path) -> io::Result<bool> {
    log::debug!("FileComparator: Comparing contents of {left:?} and {right:?}");
    let mut left_reader = BufReader::new(File::open(left)?);
    let mut right_reader = BufReader::new(File::open(right)?);
    let mut left_buf = [0u8; COMPARE_BUFFER_SIZE];
    let mut right_buf = [0u8; COMPARE_BUFFER_SIZE];

    loop {
        let n = read_full(&mut left_reader, &mut left_buf)?;
        let m = read_full(&mut right_reader, &mut right_buf)?;
        if n != m || left_buf[..n] != right_buf[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

// Fills `buf` as far as the reader allows, so chunk boundaries line up on both sides.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
