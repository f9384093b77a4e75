//! File Access
//!
//! Scheme-checked file reads used to load custom snippet directories.
//! Only `file://` URIs are served. A path that does not exist is reported
//! as [`FileStat::unknown`] rather than as an error, so optional files can
//! be probed without special-casing.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tower_lsp::lsp_types::Url;

/// Errors raised by a [`FileService`]
#[derive(Debug, Error)]
pub enum FileError {
    #[error("scheme '{0}' is not supported")]
    UnsupportedScheme(String),

    #[error("'{0}' does not name a local path")]
    InvalidPath(Url),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Classification of a path on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Unknown,
    File,
    Directory,
    SymbolicLink,
}

/// Metadata returned by [`FileService::stat`]
///
/// Times are milliseconds since the Unix epoch. Every numeric field is `-1`
/// when the path does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileType,
    pub ctime: i64,
    pub mtime: i64,
    pub size: i64,
}

impl FileStat {
    /// Descriptor for a path that could not be found
    pub fn unknown() -> Self {
        Self {
            kind: FileType::Unknown,
            ctime: -1,
            mtime: -1,
            size: -1,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileType::File
    }
}

/// Read access to the files backing extension directories
#[tower_lsp::async_trait]
pub trait FileService: Send + Sync {
    async fn read_file(&self, uri: &Url) -> Result<Vec<u8>, FileError>;
    async fn stat(&self, uri: &Url) -> Result<FileStat, FileError>;
}

/// [`FileService`] backed by the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileService;

impl LocalFileService {
    pub fn new() -> Self {
        Self
    }
}

fn local_path(uri: &Url) -> Result<PathBuf, FileError> {
    if uri.scheme() != "file" {
        return Err(FileError::UnsupportedScheme(uri.scheme().to_string()));
    }
    uri.to_file_path()
        .map_err(|_| FileError::InvalidPath(uri.clone()))
}

fn epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_millis()).unwrap_or(i64::MAX),
    }
}

#[tower_lsp::async_trait]
impl FileService for LocalFileService {
    async fn read_file(&self, uri: &Url) -> Result<Vec<u8>, FileError> {
        let path = local_path(uri)?;
        tokio::fs::read(&path)
            .await
            .map_err(|source| FileError::Io { path, source })
    }

    async fn stat(&self, uri: &Url) -> Result<FileStat, FileError> {
        let path = local_path(uri)?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(FileStat::unknown()),
            Err(source) => return Err(FileError::Io { path, source }),
        };

        let kind = if metadata.is_file() {
            FileType::File
        } else if metadata.is_dir() {
            FileType::Directory
        } else if tokio::fs::symlink_metadata(&path)
            .await
            .is_ok_and(|link| link.file_type().is_symlink())
        {
            FileType::SymbolicLink
        } else {
            FileType::Unknown
        };

        let mtime = metadata.modified().map(epoch_millis).unwrap_or(-1);
        // Not every platform records a birth time
        let ctime = metadata.created().map(epoch_millis).unwrap_or(mtime);

        Ok(FileStat {
            kind,
            ctime,
            mtime,
            size: i64::try_from(metadata.len()).unwrap_or(i64::MAX),
        })
    }
}
