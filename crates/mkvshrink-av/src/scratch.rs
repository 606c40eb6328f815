//! Per-job scratch file for captured probe diagnostics.
//!
//! A [`ScratchFile`] is created next to the input (or in a configured scratch
//! directory) with a name derived from the input plus a random component, so
//! concurrent jobs never collide. It is removed when closed or dropped, which
//! covers early returns and panics unwinding through the job.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Suffix appended to every scratch file name.
const SCRATCH_SUFFIX: &str = ".probe.txt";

/// A uniquely named capture file tied to one job.
///
/// # Example
///
/// ```no_run
/// use mkvshrink_av::ScratchFile;
/// use std::path::Path;
///
/// let scratch = ScratchFile::for_input(Path::new("/media/show.mkv"), None).unwrap();
/// // ... hand scratch.writer() to a child process as stderr ...
/// let text = scratch.read_to_string().unwrap();
/// scratch.close().unwrap();
/// ```
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    /// Create a scratch file for `input`.
    ///
    /// The file is placed in `dir` when given, otherwise in the input's own
    /// directory, and is named `<input file name>.<random>.probe.txt`.
    pub fn for_input(input: &Path, dir: Option<&Path>) -> mkvshrink_core::Result<Self> {
        let dir = match dir {
            Some(d) => d.to_path_buf(),
            None => input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let prefix = format!(
            "{}.",
            input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "probe".to_string())
        );

        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(SCRATCH_SUFFIX)
            .tempfile_in(&dir)
            .map_err(|e| mkvshrink_core::Error::scratch(dir.join(&prefix), e))?;

        tracing::trace!(path = %file.path().display(), "Created scratch file");
        Ok(Self { file })
    }

    /// Location of the scratch file on disk.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// A fresh handle suitable for a child process's stderr.
    pub fn writer(&self) -> mkvshrink_core::Result<File> {
        self.file
            .reopen()
            .map_err(|e| mkvshrink_core::Error::scratch(self.path(), e))
    }

    /// Read everything written so far, decoding invalid UTF-8 lossily.
    pub fn read_to_string(&self) -> mkvshrink_core::Result<String> {
        let mut handle = self.writer()?;
        handle
            .seek(SeekFrom::Start(0))
            .map_err(|e| mkvshrink_core::Error::scratch(self.path(), e))?;
        let mut bytes = Vec::new();
        handle
            .read_to_end(&mut bytes)
            .map_err(|e| mkvshrink_core::Error::scratch(self.path(), e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Remove the file, reporting a failure to do so.
    ///
    /// Dropping a `ScratchFile` also removes it but ignores errors.
    pub fn close(self) -> mkvshrink_core::Result<()> {
        let path = self.file.path().to_path_buf();
        self.file
            .close()
            .map_err(|e| mkvshrink_core::Error::scratch(path, e))
    }
}
