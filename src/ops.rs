//! Positioned file I/O for strata files.
//!
//! Everything above this module talks to storage through [`FileOps`]:
//! positioned reads and writes that never share a seek cursor, so any
//! number of readers can work the same file while one writer appends.
//! [`StdFileOps`] is the default backend over a plain [`std::fs::File`];
//! tests substitute their own implementations to inject failures.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Storage backend primitives.
///
/// Short reads and writes are allowed; callers loop. A returned length
/// of zero from `pread` means end of file.
pub trait FileOps: Send + Sync {
    /// Write `buf` at absolute offset `pos`, returning the number of
    /// bytes accepted.
    fn pwrite(&self, buf: &[u8], pos: u64) -> io::Result<usize>;

    /// Read into `buf` from absolute offset `pos`, returning the number
    /// of bytes filled.
    fn pread(&self, buf: &mut [u8], pos: u64) -> io::Result<usize>;

    /// Current length of the backing file in bytes.
    fn len(&self) -> io::Result<u64>;

    /// Flush written data to stable storage.
    fn sync(&self) -> io::Result<()>;
}

/// Default [`FileOps`] backend using the platform's positioned
/// read/write calls on a [`std::fs::File`].
pub struct StdFileOps {
    file: File,
}

impl StdFileOps {
    /// Create a new file, truncating any existing one.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(StdFileOps { file })
    }

    /// Open an existing file for reading and appending.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(StdFileOps { file })
    }

    /// Open an existing file read-only. Writes through this backend
    /// fail with the OS permission error.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(StdFileOps { file })
    }
}

impl From<File> for StdFileOps {
    fn from(file: File) -> Self {
        StdFileOps { file }
    }
}

impl FileOps for StdFileOps {
    #[cfg(unix)]
    fn pwrite(&self, buf: &[u8], pos: u64) -> io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file.write_at(buf, pos)
    }

    #[cfg(windows)]
    fn pwrite(&self, buf: &[u8], pos: u64) -> io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.file.seek_write(buf, pos)
    }

    #[cfg(unix)]
    fn pread(&self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file.read_at(buf, pos)
    }

    #[cfg(windows)]
    fn pread(&self, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.file.seek_read(buf, pos)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }
}
