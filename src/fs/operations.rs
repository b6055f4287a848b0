//! Stream handles owned by a copy task
//!
//! An [`InputHandle`] wraps a file opened read-only, an [`OutputHandle`] a
//! file opened create + truncate. Both are released explicitly through
//! `close` so that flush and close failures surface as errors instead of
//! being swallowed by `Drop`.

use crate::error::{retain_first, IoPhase, IoPhaseExt, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Read-only byte source backed by a regular file
#[derive(Debug)]
pub struct InputHandle {
    path: PathBuf,
    file: File,
}

impl InputHandle {
    /// Open `path` for reading
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Path the handle was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current length of the underlying file
    pub fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Whether the underlying file is empty
    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Release the handle
    pub fn close(self) -> Result<()> {
        close_file(self.file).in_phase(IoPhase::Close)
    }
}

impl Read for InputHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Write-only byte sink backed by a regular file
#[derive(Debug)]
pub struct OutputHandle {
    path: PathBuf,
    file: File,
}

impl OutputHandle {
    /// Create `path`, truncating any prior content
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Path the handle was opened at
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush, then release the handle
    pub fn close(mut self) -> Result<()> {
        self.file.flush().in_phase(IoPhase::Flush)?;
        close_file(self.file).in_phase(IoPhase::Close)
    }
}

impl Write for OutputHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Release both handles of a task.
///
/// Both handles are always closed; the output's failure is reported in
/// preference to the input's.
pub fn release_pair(input: InputHandle, output: OutputHandle) -> Result<()> {
    let output_closed = output.close();
    let input_closed = input.close();
    retain_first(output_closed, input_closed)
}

/// Close a file descriptor and report the kernel's verdict
#[cfg(unix)]
fn close_file(file: File) -> io::Result<()> {
    use std::os::unix::io::IntoRawFd;

    nix::unistd::close(file.into_raw_fd()).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn close_file(file: File) -> io::Result<()> {
    drop(file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_input_handle_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "in.txt", b"hello");

        let mut input = InputHandle::open(&path).unwrap();
        assert_eq!(input.len().unwrap(), 5);

        let mut contents = Vec::new();
        input.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"hello");
        input.close().unwrap();
    }

    #[test]
    fn test_input_handle_rejects_directory() {
        let dir = TempDir::new().unwrap();
        let err = InputHandle::open(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_output_handle_truncates() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "out.txt", b"previous contents");

        let mut output = OutputHandle::create(&path).unwrap();
        output.write_all(b"new").unwrap();
        output.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_output_handle_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = OutputHandle::create(&dir.path().join("no/such/dir/out.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_release_pair_closes_both() {
        let dir = TempDir::new().unwrap();
        let src = create_test_file(dir.path(), "in.txt", b"abc");
        let dst = dir.path().join("out.txt");

        let input = InputHandle::open(&src).unwrap();
        let output = OutputHandle::create(&dst).unwrap();
        release_pair(input, output).unwrap();

        assert!(dst.exists());
        assert_eq!(std::fs::metadata(&dst).unwrap().len(), 0);
    }
}
