//! # Storage
//!
//! Inputs and outputs may live on the local filesystem or in Amazon S3.
//! A path is classified once into a [`Location`]; the matching backend then
//! reads and writes whole objects as bytes.
//!
//! NetCDF files can only be opened from disk, so an S3 input is downloaded
//! into a temporary file first (see [`fetch_to_local`]).
//!
//! ```rust
//! use nc2geojson::storage::Location;
//!
//! let location = Location::parse("s3://era5/2024/t2m.nc")?;
//! assert!(location.is_remote());
//! assert!(!Location::parse("data/t2m.nc")?.is_remote());
//! # Ok::<(), nc2geojson::storage::StorageError>(())
//! ```

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use log::debug;
use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::fs;

const S3_SCHEME: &str = "s3://";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 download failed: {0}")]
    S3Get(#[from] SdkError<GetObjectError>),

    #[error("S3 upload failed: {0}")]
    S3Put(#[from] SdkError<PutObjectError>),

    #[error("S3 lookup failed: {0}")]
    S3Head(#[from] SdkError<HeadObjectError>),

    #[error("S3 body stream error: {0}")]
    ByteStream(String),

    #[error("invalid S3 location '{0}': expected s3://bucket/key")]
    InvalidS3Path(String),

    #[error("not found: {0}")]
    PathNotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("refusing to overwrite existing output: {0}")]
    AlreadyExists(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Where an input or output lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    S3 { bucket: String, key: String },
}

impl Location {
    /// Classifies `path`: `s3://bucket/key` is remote, anything else is local.
    pub fn parse(path: &str) -> StorageResult<Self> {
        let Some(rest) = path.strip_prefix(S3_SCHEME) else {
            return Ok(Location::Local(PathBuf::from(path)));
        };
        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Location::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => Err(StorageError::InvalidS3Path(path.to_string())),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Location::S3 { .. })
    }

    /// File name component, used for extension-based format detection.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Location::Local(path) => path.file_name().and_then(|name| name.to_str()),
            Location::S3 { key, .. } => key.rsplit('/').next(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::S3 { bucket, key } => write!(f, "{}{}/{}", S3_SCHEME, bucket, key),
        }
    }
}

/// Whole-object access to one kind of store.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    async fn read(&self, location: &Location) -> StorageResult<Vec<u8>>;

    /// Writes `data`, replacing any existing object.
    async fn write(&self, location: &Location, data: &[u8]) -> StorageResult<()>;

    async fn exists(&self, location: &Location) -> StorageResult<bool>;
}

fn local_path<'a>(location: &'a Location) -> StorageResult<&'a Path> {
    match location {
        Location::Local(path) => Ok(path.as_path()),
        other => Err(StorageError::InvalidS3Path(other.to_string())),
    }
}

fn map_io(err: std::io::Error, path: &Path) -> StorageError {
    match err.kind() {
        ErrorKind::NotFound => StorageError::PathNotFound(path.display().to_string()),
        ErrorKind::PermissionDenied => StorageError::PermissionDenied(path.display().to_string()),
        _ => StorageError::Io(err),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn read(&self, location: &Location) -> StorageResult<Vec<u8>> {
        let path = local_path(location)?;
        fs::read(path).await.map_err(|e| map_io(e, path))
    }

    async fn write(&self, location: &Location, data: &[u8]) -> StorageResult<()> {
        write_local_output(local_path(location)?, data, true)
    }

    async fn exists(&self, location: &Location) -> StorageResult<bool> {
        let path = local_path(location)?;
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io(e, path)),
        }
    }
}

/// S3 backend. Credentials and region come from the standard AWS chain.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    pub async fn new() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        S3Storage {
            client: S3Client::new(&config),
        }
    }

    fn bucket_and_key(location: &Location) -> StorageResult<(&str, &str)> {
        match location {
            Location::S3 { bucket, key } => Ok((bucket.as_str(), key.as_str())),
            Location::Local(path) => Err(StorageError::InvalidS3Path(path.display().to_string())),
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for S3Storage {
    async fn read(&self, location: &Location) -> StorageResult<Vec<u8>> {
        let (bucket, key) = Self::bucket_and_key(location)?;
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service) if service.err().is_no_such_key() => {
                    StorageError::PathNotFound(location.to_string())
                }
                _ => StorageError::S3Get(e),
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::ByteStream(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn write(&self, location: &Location, data: &[u8]) -> StorageResult<()> {
        let (bucket, key) = Self::bucket_and_key(location)?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(data.to_vec()))
            .send()
            .await?;
        Ok(())
    }

    async fn exists(&self, location: &Location) -> StorageResult<bool> {
        let (bucket, key) = Self::bucket_and_key(location)?;
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service)) if service.err().is_not_found() => Ok(false),
            Err(e) => Err(StorageError::S3Head(e)),
        }
    }
}

#[derive(Debug)]
pub enum Storage {
    Local(LocalStorage),
    S3(S3Storage),
}

impl Storage {
    /// Picks the backend for `location`. S3 clients are only built when needed.
    pub async fn for_location(location: &Location) -> Self {
        if location.is_remote() {
            Storage::S3(S3Storage::new().await)
        } else {
            Storage::Local(LocalStorage)
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for Storage {
    async fn read(&self, location: &Location) -> StorageResult<Vec<u8>> {
        match self {
            Storage::Local(backend) => backend.read(location).await,
            Storage::S3(backend) => backend.read(location).await,
        }
    }

    async fn write(&self, location: &Location, data: &[u8]) -> StorageResult<()> {
        match self {
            Storage::Local(backend) => backend.write(location, data).await,
            Storage::S3(backend) => backend.write(location, data).await,
        }
    }

    async fn exists(&self, location: &Location) -> StorageResult<bool> {
        match self {
            Storage::Local(backend) => backend.exists(location).await,
            Storage::S3(backend) => backend.exists(location).await,
        }
    }
}

/// An input available on local disk. Remote inputs keep their temporary
/// download alive for as long as this value lives.
#[derive(Debug)]
pub enum LocalInput {
    Path(PathBuf),
    Downloaded(NamedTempFile),
}

impl LocalInput {
    pub fn path(&self) -> &Path {
        match self {
            LocalInput::Path(path) => path.as_path(),
            LocalInput::Downloaded(file) => file.path(),
        }
    }
}

/// Makes `location` readable from disk, downloading it when remote.
pub async fn fetch_to_local(location: &Location) -> StorageResult<LocalInput> {
    match location {
        Location::Local(path) => {
            if !fs::try_exists(path).await.map_err(|e| map_io(e, path))? {
                return Err(StorageError::PathNotFound(path.display().to_string()));
            }
            Ok(LocalInput::Path(path.clone()))
        }
        Location::S3 { .. } => {
            let backend = Storage::for_location(location).await;
            let bytes = backend.read(location).await?;
            debug!("Downloaded {} bytes from {}", bytes.len(), location);

            let mut file = tempfile::Builder::new().suffix(".nc").tempfile()?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(LocalInput::Downloaded(file))
        }
    }
}

/// Writes `data` to a local file, creating parent directories as needed.
///
/// An existing file is kept, and `AlreadyExists` returned, unless `overwrite` is set.
pub fn write_local_output(path: &Path, data: &[u8], overwrite: bool) -> StorageResult<()> {
    if !overwrite && path.exists() {
        return Err(StorageError::AlreadyExists(path.display().to_string()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| map_io(e, parent))?;
    }
    std::fs::write(path, data).map_err(|e| map_io(e, path))
}

/// Writes `data` to `location`. Existing local files are kept unless `overwrite` is set.
pub async fn write_output(location: &Location, data: &[u8], overwrite: bool) -> StorageResult<()> {
    match location {
        Location::Local(path) => write_local_output(path, data, overwrite)?,
        Location::S3 { .. } => Storage::for_location(location).await.write(location, data).await?,
    }
    debug!("Wrote {} bytes to {}", data.len(), location);
    Ok(())
}
