use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-in-production";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
}

/// Deployment profile. Selected by `[app].env` or the `APP_ENV` variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Development,
    Production,
    Testing,
}

impl AppEnv {
    /// Unknown names fall back to development.
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: AppEnv,
    /// `compact` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_per_page")]
    pub properties_per_page: u32,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            env: AppEnv::default(),
            log_format: default_log_format(),
            properties_per_page: default_per_page(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default = "default_true")]
    pub backup_enabled: bool,
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            backup_enabled: true,
            max_backups: default_max_backups(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: i64,
    /// Accounts registered with one of these emails become super admins.
    #[serde(default)]
    pub super_admin_emails: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { secret_key: String::new(), token_ttl_hours: default_token_ttl(), super_admin_emails: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_content_length: default_max_content_length(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_app_name() -> String { "360 Emlak".into() }
fn default_log_format() -> String { "compact".into() }
fn default_per_page() -> u32 { 12 }
fn default_data_file() -> PathBuf { PathBuf::from("data/data.json") }
fn default_true() -> bool { true }
fn default_max_backups() -> usize { 5 }
fn default_token_ttl() -> i64 { 24 * 7 }
fn default_upload_dir() -> PathBuf { PathBuf::from("static/uploads") }
fn default_max_content_length() -> usize { 16 * 1024 * 1024 }
fn default_allowed_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "webp"].iter().map(|s| s.to_string()).collect()
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults when the file
    /// is absent, then apply environment overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) => match e.downcast_ref::<std::io::Error>() {
                Some(io) if io.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
                _ => return Err(e),
            },
        };
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Apply `APP_ENV`, `DATA_FILE`, `SECRET_KEY`, `SERVER_HOST`, `SERVER_PORT`, `LOG_FORMAT`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup("APP_ENV") {
            self.app.env = AppEnv::parse_lossy(&env);
        }
        if let Some(path) = lookup("DATA_FILE").filter(|p| !p.trim().is_empty()) {
            self.store.data_file = PathBuf::from(path);
        }
        if let Some(secret) = lookup("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(fmt) = lookup("LOG_FORMAT") {
            self.app.log_format = fmt;
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.store.validate()?;
        self.auth.normalize(self.app.env)?;
        if self.app.env == AppEnv::Testing && self.store.data_file == default_data_file() {
            self.store.data_file = PathBuf::from("data/test_data.json");
        }
        if self.app.properties_per_page == 0 {
            self.app.properties_per_page = default_per_page();
        }
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_file.as_os_str().is_empty() {
            return Err(anyhow!("store.data_file is empty"));
        }
        if self.data_file.file_name().is_none() {
            return Err(anyhow!("store.data_file must name a file, got {}", self.data_file.display()));
        }
        if self.backup_enabled && self.max_backups == 0 {
            return Err(anyhow!("store.max_backups must be >= 1 when backups are enabled"));
        }
        Ok(())
    }
}

impl AuthConfig {
    fn normalize(&mut self, env: AppEnv) -> Result<()> {
        if self.secret_key.trim().is_empty() {
            if env == AppEnv::Production {
                return Err(anyhow!("SECRET_KEY must be set in production"));
            }
            self.secret_key = DEV_SECRET_KEY.to_string();
        }
        if env == AppEnv::Production && self.secret_key == DEV_SECRET_KEY {
            return Err(anyhow!("the development secret key cannot be used in production"));
        }
        if self.token_ttl_hours <= 0 {
            self.token_ttl_hours = default_token_ttl();
        }
        for email in self.super_admin_emails.iter_mut() {
            *email = email.trim().to_lowercase();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_toml_uses_defaults() -> Result<()> {
        let mut cfg: AppConfig = toml::from_str("")?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.store.data_file, PathBuf::from("data/data.json"));
        assert!(cfg.store.backup_enabled);
        assert_eq!(cfg.store.max_backups, 5);
        assert_eq!(cfg.app.properties_per_page, 12);
        assert_eq!(cfg.auth.secret_key, DEV_SECRET_KEY);
        Ok(())
    }

    #[test]
    fn parses_store_section() -> Result<()> {
        let raw = r#"
            [store]
            data_file = "/var/lib/emlak/data.json"
            backup_enabled = false
            max_backups = 0
        "#;
        let mut cfg: AppConfig = toml::from_str(raw)?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.store.data_file, PathBuf::from("/var/lib/emlak/data.json"));
        assert!(!cfg.store.backup_enabled);
        Ok(())
    }

    #[test]
    fn zero_backups_rejected_when_enabled() {
        let mut cfg = AppConfig::default();
        cfg.store.max_backups = 0;
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn production_requires_secret() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(env_of(&[("APP_ENV", "production")]));
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.apply_overrides(env_of(&[("APP_ENV", "production"), ("SECRET_KEY", "s3cret")]));
        assert!(cfg.normalize_and_validate().is_ok());
    }

    #[test]
    fn testing_profile_switches_data_file() -> Result<()> {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(env_of(&[("APP_ENV", "testing")]));
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.store.data_file, PathBuf::from("data/test_data.json"));
        Ok(())
    }

    #[test]
    fn env_overrides_take_precedence() -> Result<()> {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(env_of(&[
            ("DATA_FILE", "/tmp/x.json"),
            ("SERVER_PORT", "9000"),
            ("SERVER_HOST", "0.0.0.0"),
        ]));
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.store.data_file, PathBuf::from("/tmp/x.json"));
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        Ok(())
    }

    #[test]
    fn load_from_file_reads_toml() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nhost = \"localhost\"\nport = 8181\n")?;
        let cfg = load_from_file(path.to_str().ok_or_else(|| anyhow!("utf8 path"))?)?;
        assert_eq!(cfg.server.port, 8181);
        assert_eq!(cfg.server.worker_threads, None);
        Ok(())
    }
}
