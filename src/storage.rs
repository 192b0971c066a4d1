/**
 * Media Storage
 * Folder-prefixed image objects on local disk, served back under the
 * public media base path. Content type is sniffed from magic bytes,
 * never trusted from the upload.
 */
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Hard cap per object.
pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// Every object lives under exactly one of these folders.
pub const ALLOWED_FOLDERS: &[&str] = &["projects", "blog", "avatars"];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("empty upload")]
    Empty,

    #[error("file exceeds the 5 MB limit")]
    TooLarge,

    #[error("file content is not a supported image format")]
    UnsupportedType,

    #[error("unusable file name")]
    InvalidName,

    #[error("unknown media folder `{0}`")]
    UnknownFolder(String),

    #[error("media storage I/O failed")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    pub url: String,
    pub filename: String,
    pub folder: String,
    pub size: usize,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaEntry {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
    public_base: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    /// Filesystem root, for serving the files back.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates and writes an object, returning where it ended up.
    /// The stored name prefixes a millisecond stamp to the sanitized
    /// original stem, and the extension follows the sniffed format.
    pub async fn put(
        &self,
        folder: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredMedia, MediaError> {
        if !ALLOWED_FOLDERS.contains(&folder) {
            return Err(MediaError::UnknownFolder(folder.to_string()));
        }
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if bytes.len() > MAX_FILE_BYTES {
            return Err(MediaError::TooLarge);
        }
        let (mime_type, extension) = detect_image(bytes).ok_or(MediaError::UnsupportedType)?;

        let stem = sanitize_stem(original_name);
        let filename = format!("{}-{stem}.{extension}", Utc::now().timestamp_millis());

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&filename), bytes).await?;

        tracing::info!(folder, filename = %filename, size = bytes.len(), "stored media object");
        Ok(StoredMedia {
            url: format!("{}/{folder}/{filename}", self.public_base),
            filename,
            folder: folder.to_string(),
            size: bytes.len(),
            mime_type: mime_type.to_string(),
        })
    }

    /// Removes one object. `Ok(false)` when it was already gone.
    pub async fn remove(&self, folder: &str, filename: &str) -> Result<bool, MediaError> {
        if !ALLOWED_FOLDERS.contains(&folder) {
            return Err(MediaError::UnknownFolder(folder.to_string()));
        }
        // The name must stay inside its folder.
        if filename.is_empty()
            || filename.contains("..")
            || filename.contains('/')
            || filename.contains('\\')
        {
            return Err(MediaError::InvalidName);
        }

        match tokio::fs::remove_file(self.root.join(folder).join(filename)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(MediaError::Io(err)),
        }
    }

    /// Removes the object a public URL points at. URLs outside our
    /// media base (external CDNs, absolute links) are not ours to
    /// delete and come back as `Ok(false)`.
    pub async fn remove_url(&self, url: &str) -> Result<bool, MediaError> {
        let Some(rest) = url.strip_prefix(&format!("{}/", self.public_base)) else {
            return Ok(false);
        };
        let Some((folder, filename)) = rest.split_once('/') else {
            return Ok(false);
        };
        if filename.is_empty() || filename.contains('/') {
            return Ok(false);
        }
        self.remove(folder, filename).await
    }

    /// Objects in one folder, newest first. A folder nothing has been
    /// uploaded to yet lists as empty.
    pub async fn list(&self, folder: &str) -> Result<Vec<MediaEntry>, MediaError> {
        if !ALLOWED_FOLDERS.contains(&folder) {
            return Err(MediaError::UnknownFolder(folder.to_string()));
        }

        let dir = self.root.join(folder);
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(MediaError::Io(err)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            let modified_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            entries.push(MediaEntry {
                url: format!("{}/{folder}/{filename}", self.public_base),
                filename,
                size: metadata.len(),
                modified_at,
            });
        }

        entries.sort_by(|a, b| b.modified_at.cmp(&a.modified_at).then(a.filename.cmp(&b.filename)));
        Ok(entries)
    }
}

/// Deletes the media objects behind a set of URLs, tolerating every
/// individual failure: entity deletion must not hinge on file cleanup.
pub async fn cleanup_assets<I, S>(media: &MediaStore, urls: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for url in urls {
        let url = url.as_ref();
        match media.remove_url(url).await {
            Ok(true) => tracing::debug!(url, "removed media object"),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(url, error = %err, "media cleanup failed; object may be orphaned");
            }
        }
    }
}

fn detect_image(bytes: &[u8]) -> Option<(&'static str, &'static str)> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(("image/jpeg", "jpg"));
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(("image/png", "png"));
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some(("image/gif", "gif"));
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some(("image/webp", "webp"));
    }
    None
}

/// Reduces an uploaded name to a safe lowercase stem: path components
/// and the original extension are dropped, everything non-alphanumeric
/// collapses to single hyphens.
fn sanitize_stem(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let stem = base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base);

    let mut cleaned = String::new();
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            cleaned.push(c.to_ascii_lowercase());
        } else if !cleaned.ends_with('-') {
            cleaned.push('-');
        }
    }
    let cleaned = cleaned.trim_matches('-');

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.chars().take(64).collect()
    }
}

// ===== Tests =====
