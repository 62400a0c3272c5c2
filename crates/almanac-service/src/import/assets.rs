//! Local storage for media fetched from other installations.

use std::future::Future;
use std::path::PathBuf;

use crate::error::{ServiceError, ServiceResult};

/// Stores files under names relative to a media root.
pub trait AssetStorage: Send + Sync {
    /// ## Summary
    /// Saves `content` at `name`, or at a free variant of it if `name` is taken.
    /// Returns the name actually used.
    fn save(&self, name: &str, content: &[u8]) -> impl Future<Output = ServiceResult<String>> + Send;

    /// Deletes the file at `name`. A missing file is not an error.
    fn remove(&self, name: &str) -> impl Future<Output = ServiceResult<()>> + Send;
}

/// Decodes `%XX` escapes. Malformed escapes are kept verbatim.
#[must_use]
pub fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(escape) = bytes.get(i + 1..i + 3)
            && let Ok([byte]) = hex::decode(escape).as_deref()
        {
            decoded.push(*byte);
            i += 3;
            continue;
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// ## Summary
/// The local name for a remote media path: its unquoted file name below `upload_dir`.
///
/// Returns `None` when the path has no usable file name.
#[must_use]
pub fn local_asset_name(upload_dir: &str, remote_path: &str) -> Option<String> {
    let filename = unquote(remote_path.rsplit('/').next()?);
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0'])
    {
        return None;
    }
    let dir = upload_dir.trim_matches('/');
    Some(if dir.is_empty() {
        filename
    } else {
        format!("{dir}/{filename}")
    })
}

/// Splits `a/b/name.ext` into (`a/b/name`, `.ext`).
fn split_extension(name: &str) -> (&str, &str) {
    let file_start = name.rfind('/').map_or(0, |i| i + 1);
    match name[file_start..].rfind('.') {
        Some(dot) if dot > 0 => name.split_at(file_start + dot),
        _ => (name, ""),
    }
}

/// `name`, then `stem_1.ext`, `stem_2.ext`, ...
pub fn name_candidates(name: &str) -> impl Iterator<Item = String> + '_ {
    let (stem, extension) = split_extension(name);
    std::iter::once(name.to_string())
        .chain((1_u32..).map(move |n| format!("{stem}_{n}{extension}")))
}

/// [`AssetStorage`] on the local file system.
#[derive(Debug, Clone)]
pub struct FsAssetStorage {
    root: PathBuf,
}

impl FsAssetStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetStorage for FsAssetStorage {
    #[tracing::instrument(skip(self, content), fields(bytes = content.len()))]
    async fn save(&self, name: &str, content: &[u8]) -> ServiceResult<String> {
        for candidate in name_candidates(name) {
            let path = self.root.join(&candidate);
            if tokio::fs::try_exists(&path).await? {
                continue;
            }
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, content).await?;
            tracing::debug!(path = %path.display(), "Asset stored");
            return Ok(candidate);
        }
        Err(ServiceError::ValidationError(format!("no free name for '{name}'")))
    }

    async fn remove(&self, name: &str) -> ServiceResult<()> {
        let path = self.root.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Asset removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
