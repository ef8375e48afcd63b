//! Installing fetched artifacts on disk.
//!
//! The stream is copied into `<output>.part`, synced, optionally marked
//! executable, then atomically renamed over `<output>`. A reader of
//! `<output>` sees either the old artifact or the complete new one.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `app` -> `app.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Temp file receiving one artifact.
pub struct ArtifactWriter {
    file: BufWriter<File>,
    temp_path: PathBuf,
    written: u64,
}

impl ArtifactWriter {
    /// Create (or truncate) the temp file at `temp_path`.
    pub fn create(temp_path: &Path) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        Ok(ArtifactWriter {
            file: BufWriter::new(file),
            temp_path: temp_path.to_path_buf(),
            written: 0,
        })
    }

    /// Copy `reader` to the end of the temp file. Read errors (including
    /// gzip decoding errors) are returned as is.
    pub fn copy_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<u64> {
        let n = io::copy(reader, &mut self.file).context("failed to stream artifact to disk")?;
        self.written += n;
        Ok(n)
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flush, fsync, set permissions and rename over `final_path`.
    /// Fails if `final_path` is on a different filesystem.
    pub fn finalize(self, final_path: &Path, executable: bool) -> Result<()> {
        let temp_path = self.temp_path;
        let file = self
            .file
            .into_inner()
            .map_err(|e| e.into_error())
            .context("failed to flush artifact")?;
        file.sync_all().context("artifact sync failed")?;
        if executable {
            set_executable(&file)?;
        }
        drop(file);

        std::fs::rename(&temp_path, final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                temp_path.display(),
                final_path.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(unix)]
fn set_executable(file: &File) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o755))
        .context("failed to mark artifact executable")
}

#[cfg(not(unix))]
fn set_executable(_file: &File) -> Result<()> {
    Ok(())
}

/// Stream `reader` into `final_path` via a temp file. Returns bytes written.
///
/// An empty artifact is rejected and the temp file removed, so a truncated
/// download never replaces a working file.
pub fn install<R: Read + ?Sized>(reader: &mut R, final_path: &Path, executable: bool) -> Result<u64> {
    let tp = temp_path(final_path);
    let mut writer = ArtifactWriter::create(&tp)?;
    let outcome = writer.copy_from(reader).and_then(|n| {
        if n == 0 {
            anyhow::bail!("artifact is empty; keeping {}", final_path.display());
        }
        Ok(n)
    });
    let n = match outcome {
        Ok(n) => n,
        Err(e) => {
            drop(writer);
            let _ = std::fs::remove_file(&tp);
            return Err(e);
        }
    };
    writer.finalize(final_path, executable)?;
    tracing::info!(path = %final_path.display(), bytes = n, "artifact installed");
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("app"));
        assert_eq!(p.to_string_lossy(), "app.part");
        let p2 = temp_path(Path::new("/opt/app/app-linux.gz"));
        assert_eq!(p2.to_string_lossy(), "/opt/app/app-linux.gz.part");
    }

    #[test]
    fn install_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("app");
        std::fs::write(&out, b"old").unwrap();

        let n = install(&mut Cursor::new(b"new build".to_vec()), &out, false).unwrap();
        assert_eq!(n, 9);
        assert_eq!(std::fs::read(&out).unwrap(), b"new build");
        assert!(!temp_path(&out).exists());
    }

    #[test]
    fn empty_artifact_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("app");
        std::fs::write(&out, b"old").unwrap();

        assert!(install(&mut io::empty(), &out, false).is_err());
        assert_eq!(std::fs::read(&out).unwrap(), b"old");
        assert!(!temp_path(&out).exists());
    }

    #[test]
    fn read_error_keeps_previous_file() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt gzip"))
            }
        }
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("app");
        assert!(install(&mut Broken, &out, false).is_err());
        assert!(!out.exists());
        assert!(!temp_path(&out).exists());
    }

    #[cfg(unix)]
    #[test]
    fn executable_flag_sets_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("app");
        install(&mut Cursor::new(b"#!/bin/sh\n".to_vec()), &out, true).unwrap();
        let mode = std::fs::metadata(&out).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn writer_tracks_bytes_across_copies() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("out.part");
        let mut w = ArtifactWriter::create(&tp).unwrap();
        w.copy_from(&mut Cursor::new(b"abc".to_vec())).unwrap();
        w.copy_from(&mut Cursor::new(b"de".to_vec())).unwrap();
        assert_eq!(w.written(), 5);
        assert_eq!(w.temp_path(), tp.as_path());
        let final_p = dir.path().join("out.bin");
        w.finalize(&final_p, false).unwrap();
        assert_eq!(std::fs::read(&final_p).unwrap(), b"abcde");
    }
}
