//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so binaries can prepare the data and
//! upload directories from an `AppConfig` alone.

use std::path::Path;

/// Ensure the data file's directory and the upload root exist.
pub async fn ensure_env(cfg: &configs::AppConfig) -> anyhow::Result<()> {
    let data_dir = cfg
        .store
        .data_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    common::env::ensure_env(data_dir, &cfg.uploads.upload_dir).await
}
