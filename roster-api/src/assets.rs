//! Asset storage and inline image materialization
//!
//! Student images are stored as write-once named files in the uploads
//! directory and referenced from student records by name. Inline payloads
//! (`data:image/<type>;base64,<data>`) are decoded and written under a
//! scope-qualified unique name, so many rows of one import can be
//! materialized concurrently without collisions.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use roster_common::models::DEFAULT_STUDENT_IMAGE;
use roster_common::time::now_millis;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Placeholder image written at startup under [`DEFAULT_STUDENT_IMAGE`] (1x1 transparent PNG)
const DEFAULT_IMAGE_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Blob storage keyed by generated unique names
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// True if an asset with this name exists
    async fn exists(&self, name: &str) -> io::Result<bool>;

    /// Write a new asset; fails with `AlreadyExists` instead of overwriting
    async fn write(&self, name: &str, bytes: &[u8]) -> io::Result<()>;

    /// Remove an asset; returns false if it did not exist
    async fn delete(&self, name: &str) -> io::Result<bool>;
}

/// Asset store backed by a directory on disk
#[derive(Debug, Clone)]
pub struct DiskAssetStore {
    root: PathBuf,
}

impl DiskAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an asset name to a path, refusing anything but a plain file name
    fn path_for(&self, name: &str) -> io::Result<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid asset name: {:?}", name),
            ));
        }
        Ok(self.root.join(name))
    }

    /// Write the default student image if it is missing
    pub async fn ensure_default_image(&self) -> io::Result<()> {
        match self.write(DEFAULT_STUDENT_IMAGE, DEFAULT_IMAGE_PNG).await {
            Err(e) if e.kind() != io::ErrorKind::AlreadyExists => Err(e),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AssetStore for DiskAssetStore {
    async fn exists(&self, name: &str) -> io::Result<bool> {
        tokio::fs::try_exists(self.path_for(name)?).await
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_for(name)?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> io::Result<bool> {
        match tokio::fs::remove_file(self.path_for(name)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Inline image payload could not be decoded
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is not a base64 data URL")]
    NotDataUrl,

    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("invalid base64 data: {0}")]
    Base64(String),

    #[error("image data is empty")]
    Empty,
}

/// Materialization failed while decoding or while storing the bytes
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to store image: {0}")]
    Io(#[from] io::Error),
}

/// Decoded inline image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// File extension matching the declared media type
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Decode a `data:image/<type>;base64,<data>` payload
pub fn decode_inline_image(payload: &str) -> Result<DecodedImage, DecodeError> {
    let rest = payload
        .trim()
        .strip_prefix("data:")
        .ok_or(DecodeError::NotDataUrl)?;
    let (media_type, data) = rest.split_once(";base64,").ok_or(DecodeError::NotDataUrl)?;

    let extension = match media_type.trim().to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        other => return Err(DecodeError::UnsupportedType(other.to_string())),
    };

    // Spreadsheet cells and form fields sometimes wrap long payloads
    let data: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(data.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    Ok(DecodedImage { extension, bytes })
}

/// Unique asset name: `<scope>-<unix millis>-<random hex>.<ext>`
pub fn unique_asset_name(scope: Uuid, extension: &str) -> String {
    format!(
        "{}-{}-{:016x}.{}",
        scope,
        now_millis(),
        rand::random::<u64>(),
        extension
    )
}

/// Turns inline image payloads into stored assets
#[derive(Clone)]
pub struct ImageMaterializer {
    store: Arc<dyn AssetStore>,
}

impl ImageMaterializer {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self { store }
    }

    /// Decode `payload` and store it under a name unique within `scope`
    pub async fn materialize(&self, payload: &str, scope: Uuid) -> Result<String, MaterializeError> {
        let image = decode_inline_image(payload)?;
        let name = unique_asset_name(scope, image.extension);
        self.store.write(&name, &image.bytes).await?;
        tracing::debug!(asset = %name, bytes = image.bytes.len(), "Stored inline image");
        Ok(name)
    }
}
