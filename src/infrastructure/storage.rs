use crate::config::IntakeConfig;
use crate::services::storage::LocalStorageService;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// Creates the storage directory if needed (idempotent) and resolves it to an
/// absolute path so stored file paths handed to workers are absolute.
pub async fn setup_storage(config: &IntakeConfig) -> anyhow::Result<Arc<LocalStorageService>> {
    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create storage directory {}",
                config.storage_dir.display()
            )
        })?;

    let root = tokio::fs::canonicalize(&config.storage_dir)
        .await
        .with_context(|| format!("Failed to resolve {}", config.storage_dir.display()))?;

    info!("🗂️  Storage directory: {}", root.display());
    Ok(Arc::new(LocalStorageService::new(root)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::StorageService;

    #[tokio::test]
    async fn test_setup_storage_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = IntakeConfig {
            storage_dir: dir.path().join("nested").join("downloads"),
            ..IntakeConfig::default()
        };

        let first = setup_storage(&config).await.unwrap();
        let second = setup_storage(&config).await.unwrap();

        assert!(first.root().is_absolute());
        assert!(first.root().is_dir());
        assert_eq!(first.root(), second.root());
    }
}
