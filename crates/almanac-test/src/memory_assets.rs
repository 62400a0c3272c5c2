//! An [`AssetStorage`] held in memory.

use std::collections::BTreeMap;
use std::sync::Mutex;

use almanac_service::error::{ServiceError, ServiceResult};
use almanac_service::import::AssetStorage;
use almanac_service::import::assets::name_candidates;

#[derive(Debug, Default)]
pub struct MemoryAssets {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    failing: bool,
}

impl MemoryAssets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A storage whose every save fails, like a read-only media root.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Stored files by name.
    #[must_use]
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        match self.files.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AssetStorage for MemoryAssets {
    async fn save(&self, name: &str, content: &[u8]) -> ServiceResult<String> {
        if self.failing {
            return Err(ServiceError::StorageError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "media root is read-only",
            )));
        }
        let mut files = match self.files.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(candidate) = name_candidates(name).find(|candidate| !files.contains_key(candidate))
        else {
            return Err(ServiceError::ValidationError(format!("no free name for '{name}'")));
        };
        files.insert(candidate.clone(), content.to_vec());
        Ok(candidate)
    }

    async fn remove(&self, name: &str) -> ServiceResult<()> {
        let mut files = match self.files.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        files.remove(name);
        Ok(())
    }
}
