//! Storage boundary for single tables.
//!
//! Stages talk to [`TableStore`] only. [`IpcStore`] keeps every table as an
//! Arrow IPC file and writes through `<name>.arrow.tmp` + rename so a failed
//! write never leaves a torn table behind.

use anyhow::{Context, Result};
use polars::io::ipc::{IpcReader, IpcWriter};
use polars::prelude::{DataFrame, SerReader, SerWriter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait TableStore: Send + Sync {
    /// Read a table. A missing table is `Ok(None)`.
    fn read(&self, path: &Path) -> Result<Option<DataFrame>>;

    /// Replace a table atomically.
    fn write(&self, path: &Path, df: &mut DataFrame) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Move a table into `dir` as `<stem>_<label><ext>`, overwriting an
    /// earlier archive of the same label. Returns the archive path, or `None`
    /// when there was nothing to archive.
    fn archive(&self, path: &Path, dir: &Path, label: &str) -> Result<Option<PathBuf>>;
}

/// Arrow IPC files on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct IpcStore;

impl IpcStore {
    pub fn new() -> Self {
        Self
    }
}

/// `<dir>/<stem>_<label><ext>`
pub fn archive_path(path: &Path, dir: &Path, label: &str) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("table path without a file name: {}", path.display()))?;
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{label}.{ext}"),
        None => format!("{stem}_{label}"),
    };
    Ok(dir.join(name))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

impl TableStore for IpcStore {
    fn read(&self, path: &Path) -> Result<Option<DataFrame>> {
        if !path.exists() {
            debug!(path = %path.display(), "table not found");
            return Ok(None);
        }
        let file =
            fs::File::open(path).with_context(|| format!("opening table {}", path.display()))?;
        let df = IpcReader::new(file)
            .finish()
            .with_context(|| format!("reading table {}", path.display()))?;
        Ok(Some(df))
    }

    fn write(&self, path: &Path, df: &mut DataFrame) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let tmp = temp_path(path);
        let written = (|| -> Result<()> {
            let mut file = fs::File::create(&tmp)
                .with_context(|| format!("creating table file {}", tmp.display()))?;
            IpcWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("writing table {}", path.display()))?;
            Ok(())
        })();
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        fs::rename(&tmp, path)
            .with_context(|| format!("atomic rename: {} -> {}", tmp.display(), path.display()))?;
        debug!(path = %path.display(), rows = df.height(), "table written");
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn archive(&self, path: &Path, dir: &Path, label: &str) -> Result<Option<PathBuf>> {
        if !path.exists() {
            return Ok(None);
        }
        fs::create_dir_all(dir)
            .with_context(|| format!("creating archive directory {}", dir.display()))?;
        let target = archive_path(path, dir, label)?;
        if target.exists() {
            fs::remove_file(&target)
                .with_context(|| format!("replacing archive {}", target.display()))?;
        }
        fs::rename(path, &target)
            .with_context(|| format!("archiving {} -> {}", path.display(), target.display()))?;
        Ok(Some(target))
    }
}
