//! Duplicate detection for lists of input files
//!
//! Files are compared the cheap way first: identical file type, size and
//! modification time count as equal. Files of the same size but with
//! different timestamps are compared byte by byte.

use crate::errors::Result;
use std::fs::{self, File, Metadata};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, PartialEq, Eq)]
struct Signature {
    is_file: bool,
    len: u64,
    modified: Option<SystemTime>,
}

impl From<&Metadata> for Signature {
    fn from(meta: &Metadata) -> Self {
        Self {
            is_file: meta.is_file(),
            len: meta.len(),
            modified: meta.modified().ok(),
        }
    }
}

/// Shallow comparison of two files.
///
/// # Errors
///
/// Returns an error if a file cannot be inspected or read.
pub fn files_equal(a: impl AsRef<Path>, b: impl AsRef<Path>) -> Result<bool> {
    let (a, b) = (a.as_ref(), b.as_ref());
    let sig_a = Signature::from(&fs::metadata(a)?);
    let sig_b = Signature::from(&fs::metadata(b)?);

    if !sig_a.is_file || !sig_b.is_file {
        return Ok(false);
    }
    if sig_a == sig_b {
        return Ok(true);
    }
    if sig_a.len != sig_b.len {
        return Ok(false);
    }
    contents_equal(a, b)
}

fn contents_equal(a: &Path, b: &Path) -> Result<bool> {
    let mut reader_a = BufReader::new(File::open(a)?);
    let mut reader_b = BufReader::new(File::open(b)?);
    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];
    loop {
        let n_a = read_full(&mut reader_a, &mut buf_a)?;
        let n_b = read_full(&mut reader_b, &mut buf_b)?;
        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Drop files that are duplicates of a file later in the list.
///
/// Of every group of equal files only the last one is kept; the order of the
/// remaining files is preserved.
///
/// # Errors
///
/// Returns an error if a file cannot be compared.
pub fn filter_duplicate_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>> {
    let mut duplicate = vec![false; paths.len()];
    for (i, first) in paths.iter().enumerate() {
        for second in &paths[i + 1..] {
            if files_equal(first, second)? {
                duplicate[i] = true;
                break;
            }
        }
    }

    let removed: Vec<&Path> = paths
        .iter()
        .zip(&duplicate)
        .filter(|(_, dup)| **dup)
        .map(|(p, _)| p.as_ref())
        .collect();
    if !removed.is_empty() {
        info!("Found and ignored {} duplicates in file list.", removed.len());
        for path in &removed {
            debug!("Ignored {}", path.display());
        }
    }

    Ok(paths
        .iter()
        .zip(&duplicate)
        .filter(|(_, dup)| !**dup)
        .map(|(p, _)| p.as_ref().to_path_buf())
        .collect())
}

/// Call `f` with the list of files after dropping duplicates.
///
/// Lists with at most one entry are passed on unchanged.
///
/// # Errors
///
/// Returns an error if the files cannot be compared.
pub fn with_unique_files<P, F, R>(paths: &[P], f: F) -> Result<R>
where
    P: AsRef<Path>,
    F: FnOnce(Vec<PathBuf>) -> R,
{
    if paths.len() <= 1 {
        return Ok(f(paths.iter().map(|p| p.as_ref().to_path_buf()).collect()));
    }
    Ok(f(filter_duplicate_files(paths)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    static NEXT_MTIME: AtomicU64 = AtomicU64::new(1_000_000);

    /// Every file gets its own modification time so equality has to come
    /// from the contents.
    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        let mtime = NEXT_MTIME.fetch_add(60, Ordering::SeqCst);
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime))
            .unwrap();
        path
    }

    #[test]
    fn test_files_equal() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.nc", b"same content");
        let b = write(&dir, "b.nc", b"same content");
        let c = write(&dir, "c.nc", b"diff content");
        let d = write(&dir, "d.nc", b"longer content");

        assert!(files_equal(&a, &b).unwrap());
        assert!(!files_equal(&a, &c).unwrap());
        assert!(!files_equal(&a, &d).unwrap());
        assert!(!files_equal(&a, dir.path()).unwrap());
        assert!(files_equal(&a, dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_large_files_are_compared_in_chunks() {
        let dir = TempDir::new().unwrap();
        let mut content = vec![7u8; 3 * CHUNK_SIZE + 11];
        let a = write(&dir, "a", &content);
        let b = write(&dir, "b", &content);
        *content.last_mut().unwrap() = 8;
        let c = write(&dir, "c", &content);
        assert!(files_equal(&a, &b).unwrap());
        assert!(!files_equal(&a, &c).unwrap());
    }

    #[test]
    fn test_filter_keeps_last_duplicate() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"1");
        let b = write(&dir, "b", b"2");
        let a_copy = write(&dir, "a_copy", b"1");
        let a_again = write(&dir, "a_again", b"1");

        let files = filter_duplicate_files(&[&a, &b, &a_copy, &a_again]).unwrap();
        assert_eq!(files, vec![b, a_again]);
    }

    #[test]
    fn test_with_unique_files() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"x");
        let b = write(&dir, "b", b"x");
        let count = with_unique_files(&[&a, &b], |files| files.len()).unwrap();
        assert_eq!(count, 1);

        // single entries are not even inspected
        let missing = dir.path().join("missing");
        let files = with_unique_files(&[&missing], |files| files).unwrap();
        assert_eq!(files, vec![missing]);
    }
}
