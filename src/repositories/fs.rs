use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::EngineError;

use super::ModelArtifactStore;

/// Filesystem artifact store, one file per shop under a base directory.
///
/// Saves write to a temporary sibling and rename into place, so a
/// concurrent load observes either the previous artifact or the new one.
#[derive(Debug, Clone)]
pub struct FsModelArtifactStore {
    base_dir: PathBuf,
}

impl FsModelArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn artifact_path(&self, shop_id: Uuid) -> PathBuf {
        self.base_dir.join(format!("sales_model_{}.json", shop_id))
    }
}

#[async_trait]
impl ModelArtifactStore for FsModelArtifactStore {
    async fn load(&self, shop_id: Uuid) -> Result<Option<Vec<u8>>, EngineError> {
        let path = self.artifact_path(shop_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, shop_id: Uuid, bytes: &[u8]) -> Result<(), EngineError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        let path = self.artifact_path(shop_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, shop_id: Uuid) -> Result<(), EngineError> {
        let path = self.artifact_path(shop_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl AsRef<Path> for FsModelArtifactStore {
    fn as_ref(&self) -> &Path {
        &self.base_dir
    }
}
