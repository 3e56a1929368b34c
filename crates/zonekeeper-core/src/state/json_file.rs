// # JSON Document Files
//
// Shared persistence for the file-backed stores (records, accounts, settings).
//
// ## Crash Recovery
//
// - Atomic writes: the document is written to `<path>.tmp`, flushed, then
//   renamed over `<path>`
// - Automatic backup: the previous file is copied to `<path>.backup` first
// - Corruption detection: a file that fails to parse is treated as corrupted
// - Recovery: falls back to the backup, restoring it over the corrupted file.
//   The backup predates the last write, so a recovered document is flagged
//   and the caller reports what may have been rolled back
//
// A read failure other than corruption (permissions, I/O) is returned to the
// caller instead of silently starting empty.
//
// ## Sharing a file between processes
//
// Every store holds an exclusive advisory lock on `<path>.lock` for the whole
// load, mutate and write cycle. Processes that share a document therefore
// never overwrite each other's changes with a stale copy.

use fs4::fs_std::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;

/// Outcome of reading one file from disk
enum ReadOutcome<T> {
    Missing,
    Parsed(T),
    Corrupted(serde_json::Error),
}

/// A document read by `load_with_recovery`
#[derive(Debug)]
pub(crate) struct Loaded<T> {
    pub(crate) doc: T,
    /// The main file was corrupted and this document came from the backup
    pub(crate) recovered: bool,
}

/// Exclusive lock on the `<path>.lock` file next to a document
///
/// Released when dropped.
#[derive(Debug)]
pub(crate) struct FileLock {
    _file: std::fs::File,
}

/// Block until this caller holds the lock for `path`
pub(crate) async fn lock_exclusive(path: &Path) -> Result<FileLock, Error> {
    let lock_path = lock_path(path);
    tokio::task::spawn_blocking(move || {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| {
                Error::Other(format!(
                    "Failed to open lock file {}: {}",
                    lock_path.display(),
                    e
                ))
            })?;
        FileExt::lock_exclusive(&file).map_err(|e| {
            Error::Other(format!("Failed to lock {}: {}", lock_path.display(), e))
        })?;
        Ok(FileLock { _file: file })
    })
    .await
    .map_err(|e| Error::Other(format!("lock task failed: {}", e)))?
}

/// Create the parent directory of `path` if needed
pub(crate) async fn ensure_parent_dir(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

/// Load a document, recovering from the backup if the main file is corrupted
///
/// Returns `Ok(None)` when neither file holds a usable document; the caller
/// starts from an empty state in that case. Callers hold the `FileLock`.
pub(crate) async fn load_with_recovery<T: DeserializeOwned>(
    path: &Path,
) -> Result<Option<Loaded<T>>, Error> {
    let err = match read_document(path).await? {
        ReadOutcome::Missing => {
            tracing::debug!("File does not exist yet: {}", path.display());
            return Ok(None);
        }
        ReadOutcome::Parsed(doc) => {
            return Ok(Some(Loaded {
                doc,
                recovered: false,
            }));
        }
        ReadOutcome::Corrupted(err) => err,
    };

    tracing::warn!(
        "{} appears corrupted: {}. Attempting recovery from backup.",
        path.display(),
        err
    );

    let backup = backup_path(path);
    match read_document(&backup).await {
        Ok(ReadOutcome::Parsed(doc)) => {
            tracing::error!(
                "Recovered {} from backup; the most recent change to it may be lost",
                path.display()
            );
            if let Err(restore_err) = fs::copy(&backup, path).await {
                tracing::error!(
                    "Failed to restore {} from backup: {}",
                    path.display(),
                    restore_err
                );
            }
            Ok(Some(Loaded {
                doc,
                recovered: true,
            }))
        }
        Ok(ReadOutcome::Missing) => {
            tracing::warn!("No backup file found. Starting with empty state.");
            Ok(None)
        }
        Ok(ReadOutcome::Corrupted(backup_err)) => {
            tracing::error!(
                "Backup also corrupted: {}. Starting with empty state.",
                backup_err
            );
            Ok(None)
        }
        Err(backup_err) => {
            tracing::error!(
                "Failed to read backup: {}. Starting with empty state.",
                backup_err
            );
            Ok(None)
        }
    }
}

async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<ReadOutcome<T>, Error> {
    if !path.exists() {
        return Ok(ReadOutcome::Missing);
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| Error::Other(format!("Failed to read {}: {}", path.display(), e)))?;

    Ok(match serde_json::from_str(&content) {
        Ok(doc) => ReadOutcome::Parsed(doc),
        Err(err) => ReadOutcome::Corrupted(err),
    })
}

/// Write a document atomically, keeping the previous file as backup
pub(crate) async fn write_atomic<T: Serialize>(path: &Path, doc: &T) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(doc)?;

    let temp = temp_path(path);
    {
        let mut file = fs::File::create(&temp).await.map_err(|e| {
            Error::Other(format!(
                "Failed to create temp file {}: {}",
                temp.display(),
                e
            ))
        })?;

        file.write_all(json.as_bytes()).await.map_err(|e| {
            Error::Other(format!(
                "Failed to write to temp file {}: {}",
                temp.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            Error::Other(format!(
                "Failed to flush temp file {}: {}",
                temp.display(),
                e
            ))
        })?;
    }

    if path.exists() {
        if let Err(e) = fs::copy(path, backup_path(path)).await {
            tracing::warn!("Failed to create backup of {}: {}", path.display(), e);
        }
    }

    fs::rename(&temp, path).await.map_err(|e| {
        Error::Other(format!(
            "Failed to rename {} to {}: {}",
            temp.display(),
            path.display(),
            e
        ))
    })?;

    tracing::trace!("Wrote {}", path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.to_path_buf();
    temp.set_extension("tmp");
    temp
}

fn lock_path(path: &Path) -> PathBuf {
    let mut lock = path.to_path_buf();
    lock.set_extension("lock");
    lock
}

/// Path of the backup kept next to `path`
pub(crate) fn backup_path(path: &Path) -> PathBuf {
    let mut backup = path.to_path_buf();
    backup.set_extension("backup");
    backup
}
