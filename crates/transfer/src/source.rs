use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::TransferError;

/// Read-only handle to a local file being uploaded.
///
/// Size and name are captured when the file is opened; every read reopens the
/// file, so a `SourceFile` is cheap to clone and safe to move into blocking
/// tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    name: String,
    size: u64,
}

impl SourceFile {
    /// Opens `path` and records its size.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(TransferError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::debug!(path = %path.display(), size = metadata.len(), "opened source file");
        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
        })
    }

    /// Reads exactly the bytes in `range`.
    ///
    /// Fails with `UnexpectedEof` if the file shrank since it was opened.
    pub fn read_range(&self, range: Range<u64>) -> Result<Vec<u8>, TransferError> {
        if range.end > self.size || range.start > range.end {
            return Err(TransferError::InvalidPlan(format!(
                "range {}..{} outside {}-byte file",
                range.start, range.end, self.size
            )));
        }
        let mut buf = buffer_for(range.end - range.start)?;
        let mut file = std::fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(range.start))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads the whole file.
    ///
    /// The whole file is buffered; fails instead of aborting when it does not
    /// fit in memory.
    pub fn read_all(&self) -> Result<Vec<u8>, TransferError> {
        self.read_range(0..self.size)
    }

    /// Local path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name (last path component).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes, as observed when opened.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Allocates a zeroed buffer of `len` bytes, failing if `len` does not fit in
/// the address space or cannot be allocated.
fn buffer_for(len: u64) -> Result<Vec<u8>, TransferError> {
    let too_large = || {
        TransferError::Io(std::io::Error::new(
            std::io::ErrorKind::OutOfMemory,
            format!("cannot buffer {len} bytes"),
        ))
    };
    let size = usize::try_from(len).map_err(|_| too_large())?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(size).map_err(|_| too_large())?;
    buf.resize(size, 0);
    Ok(buf)
}
