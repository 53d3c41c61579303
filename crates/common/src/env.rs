//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::warn;

/// Ensure the data and upload directories exist; warn when the upload root had to be created.
pub async fn ensure_env(data_dir: &Path, upload_dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", data_dir.display()))?;
    if tokio::fs::metadata(upload_dir).await.is_err() {
        warn!(upload_dir = %upload_dir.display(), "upload directory not found; creating it");
        tokio::fs::create_dir_all(upload_dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", upload_dir.display()))?;
    }
    Ok(())
}
