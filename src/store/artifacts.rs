//! Per-experiment artifacts on disk.
//!
//! Layout: `<dir>/<name><extension>`. Presence of the file is the signal
//! that an experiment already ran, so writes go through a temporary file in
//! the same directory and are renamed into place only on success.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Directory of named, atomically written files.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    extension: &'static str,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, extension: &'static str) -> Self {
        Self {
            dir: dir.into(),
            extension,
        }
    }

    /// Whether `name` maps to a file directly inside the store directory.
    pub fn accepts(name: &str) -> bool {
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', std::path::MAIN_SEPARATOR])
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}{}", self.extension))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Write artifact `name` with `fill`.
    ///
    /// The artifact appears only once `fill` returns `Ok` and everything is
    /// flushed; on error no file is left under `name`.
    pub fn write<F>(&self, name: &str, fill: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> Result<()>,
    {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;

        let target = self.path(name);
        let temp = self.dir.join(format!(".{name}{}.tmp", self.extension));

        let result = (|| -> Result<()> {
            let file = File::create(&temp)
                .with_context(|| format!("Failed to create {}", temp.display()))?;
            let mut writer = BufWriter::new(file);
            fill(&mut writer)?;
            writer
                .into_inner()
                .map_err(|e| e.into_error())
                .and_then(|file| file.sync_all())
                .with_context(|| format!("Failed to flush {}", temp.display()))?;
            fs::rename(&temp, &target)
                .with_context(|| format!("Failed to move artifact into place: {}", target.display()))
        })();

        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }

    /// Open artifact `name` for reading, `None` when it does not exist.
    pub fn open(&self, name: &str) -> Result<Option<BufReader<File>>> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }
        let file =
            File::open(&path).with_context(|| format!("Failed to open artifact: {}", path.display()))?;
        Ok(Some(BufReader::new(file)))
    }
}

/// Write all of `bytes` in one call.
pub(crate) fn write_bytes(out: &mut impl Write, bytes: &[u8]) -> Result<()> {
    out.write_all(bytes).context("Failed to write artifact bytes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::io::Read;

    #[test]
    fn test_write_then_open() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ArtifactStore::new(dir.path().join("recs"), ".rec");
        assert!(!store.exists("a"));
        assert!(store.open("a")?.is_none());

        store.write("a", |w| write_bytes(w, b"hello\n"))?;
        assert!(store.exists("a"));
        assert_eq!(store.path("a"), dir.path().join("recs/a.rec"));

        let mut text = String::new();
        store.open("a")?.unwrap().read_to_string(&mut text)?;
        assert_eq!(text, "hello\n");
        Ok(())
    }

    #[test]
    fn test_names_stay_inside_the_directory() {
        assert!(ArtifactStore::accepts("ub-k10.q2"));
        assert!(ArtifactStore::accepts("..trailing"));
        for bad in ["", ".", "..", "a/b", "../x", "a\\b"] {
            assert!(!ArtifactStore::accepts(bad), "{bad:?}");
        }
    }

    #[test]
    fn test_failed_write_leaves_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ArtifactStore::new(dir.path(), ".rec");

        let result = store.write("broken", |w| {
            write_bytes(w, b"partial")?;
            bail!("generation failed")
        });
        assert!(result.is_err());
        assert!(!store.exists("broken"));
        assert_eq!(fs::read_dir(dir.path())?.count(), 0, "temp file removed");
        Ok(())
    }

    #[test]
    fn test_failed_rewrite_keeps_previous() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ArtifactStore::new(dir.path(), ".rec");
        store.write("x", |w| write_bytes(w, b"old"))?;
        let _ = store.write("x", |_| bail!("nope"));
        assert_eq!(fs::read_to_string(store.path("x"))?, "old");
        Ok(())
    }
}
