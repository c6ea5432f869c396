//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::warn;

/// Ensure expected directories exist; warn on missing optional ones.
///
/// The static asset directory is optional, the data directories are created.
pub async fn ensure_env(static_dir: &str, data_dirs: &[&str]) -> anyhow::Result<()> {
    if tokio::fs::metadata(static_dir).await.is_err() {
        warn!(%static_dir, "static assets directory not found; site pages may 404");
    }
    for dir in data_dirs {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {dir}: {e}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_env_creates_data_dirs() -> anyhow::Result<()> {
        let root = std::env::temp_dir().join(format!("cms_env_{}", uuid::Uuid::new_v4()));
        let data = root.join("data");
        let local = root.join("data/local");
        let data_s = data.to_string_lossy().to_string();
        let local_s = local.to_string_lossy().to_string();

        ensure_env("/definitely/missing/static", &[&data_s, &local_s]).await?;
        assert!(tokio::fs::metadata(&data).await?.is_dir());
        assert!(tokio::fs::metadata(&local).await?.is_dir());

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }
}
