//! Recipe image storage
//!
//! Clients upload images inline as `data:image/<ext>;base64,<payload>` URLs.
//! The store decodes them, writes the bytes somewhere durable and hands back
//! a reference that is saved on the owning row. Only data URLs are accepted:
//! keeping an existing reference is the caller's decision, made against the
//! row that owns it.

use crate::config::MediaConfig;
use crate::errors::{AppError, ErrorCode, Result, ValidationErrors};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Directory under the media root recipe images are written to
pub const RECIPE_IMAGE_DIR: &str = "recipes/images";

/// Directory under the media root user avatars are written to
pub const AVATAR_DIR: &str = "users/avatars";

/// What an image belongs to; decides where it is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Recipe,
    Avatar,
}

impl ImageKind {
    pub const ALL: [ImageKind; 2] = [ImageKind::Recipe, ImageKind::Avatar];

    pub fn dir(self) -> &'static str {
        match self {
            ImageKind::Recipe => RECIPE_IMAGE_DIR,
            ImageKind::Avatar => AVATAR_DIR,
        }
    }

    /// Payload field that carries this kind of image
    pub fn field(self) -> &'static str {
        match self {
            ImageKind::Recipe => "image",
            ImageKind::Avatar => "avatar",
        }
    }
}

/// Result of [`ImageStore::store`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Value to persist on the recipe or user
    pub reference: String,

    /// Whether this call wrote a new file
    pub fresh: bool,
}

impl StoredImage {
    /// An existing reference carried over unchanged
    pub fn kept(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            fresh: false,
        }
    }
}

/// Trait for recipe image storage backends
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Decode and persist an uploaded data URL
    async fn store(&self, kind: ImageKind, payload: &str) -> Result<StoredImage>;

    /// Remove a previously stored image; missing files and references this
    /// store did not produce are ignored
    async fn discard(&self, reference: &str) -> Result<()>;
}

/// Images on the local filesystem, served under a URL prefix
pub struct FsImageStore {
    root: PathBuf,
    url_prefix: String,
    max_bytes: usize,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(&config.root, &config.url, config.max_image_bytes)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path under the root for a reference this store produced: a single
    /// file name directly inside one of the image directories
    fn local_path(&self, reference: &str) -> Option<PathBuf> {
        let relative = reference
            .strip_prefix(self.url_prefix.as_str())?
            .strip_prefix('/')?;

        let (dir, file_name) = ImageKind::ALL.iter().find_map(|kind| {
            let file_name = relative.strip_prefix(kind.dir())?.strip_prefix('/')?;
            Some((kind.dir(), file_name))
        })?;

        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Some(self.root.join(dir).join(name)),
            _ => None,
        }
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn store(&self, kind: ImageKind, payload: &str) -> Result<StoredImage> {
        let invalid = |message: &str| -> AppError {
            ValidationErrors::single(kind.field(), ErrorCode::InvalidFormat, message).into()
        };

        if !payload.starts_with("data:") {
            return Err(invalid("expected a base64 data URL"));
        }

        let (extension, encoded) = parse_data_url(payload).map_err(invalid)?;

        // Base64 expands by 4/3; reject before decoding anything huge
        let estimated = encoded.len() / 4 * 3;
        if estimated > self.max_bytes + 3 {
            return Err(AppError::PayloadTooLarge {
                size: estimated,
                limit: self.max_bytes,
            });
        }

        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|_| invalid("image data is not valid base64"))?;
        if bytes.is_empty() {
            return Err(invalid("image data is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let dir = self.root.join(kind.dir());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), &bytes).await?;

        tracing::debug!(file = %file_name, kind = ?kind, bytes = bytes.len(), "Stored image");

        Ok(StoredImage {
            reference: format!("{}/{}/{}", self.url_prefix, kind.dir(), file_name),
            fresh: true,
        })
    }

    async fn discard(&self, reference: &str) -> Result<()> {
        let Some(path) = self.local_path(reference) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Split `data:image/<ext>;base64,<data>` into a file extension and the encoded data
fn parse_data_url(payload: &str) -> std::result::Result<(String, &str), &'static str> {
    let (header, encoded) = payload
        .split_once(";base64,")
        .ok_or("expected a base64 data URL")?;

    let extension = header
        .strip_prefix("data:image/")
        .ok_or("data URL is not an image")?
        .to_ascii_lowercase();

    let valid = !extension.is_empty()
        && extension.len() <= 10
        && extension.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        return Err("unsupported image type");
    }

    let extension = match extension.as_str() {
        "jpeg" => "jpg".to_string(),
        _ => extension,
    };

    Ok((extension, encoded))
}
