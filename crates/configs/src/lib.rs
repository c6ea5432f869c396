use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            worker_threads: Some(4),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Where documents and local collections live on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_local_dir")]
    pub local_dir: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Write documents through a temp file + rename instead of truncating in place.
    #[serde(default = "default_true")]
    pub atomic_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            local_dir: default_local_dir(),
            key_prefix: default_key_prefix(),
            atomic_writes: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_api_keys_file")]
    pub api_keys_file: String,
    #[serde(default = "default_true")]
    pub require_api_key_for_writes: bool,
    #[serde(default = "default_bootstrap_user")]
    pub bootstrap_user: String,
    /// Filled from `ADMIN_API_KEY`; never read from the TOML file.
    #[serde(skip)]
    pub bootstrap_key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_keys_file: default_api_keys_file(),
            require_api_key_for_writes: true,
            bootstrap_user: default_bootstrap_user(),
            bootstrap_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { format: default_log_format() } }
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_static_dir() -> String { "public".into() }
fn default_body_limit() -> usize { 50 * 1024 * 1024 }
fn default_data_dir() -> String { "data".into() }
fn default_local_dir() -> String { "data/local".into() }
fn default_key_prefix() -> String { "mhm_cms_".into() }
fn default_api_keys_file() -> String { "data/auth/api_keys.json".into() }
fn default_bootstrap_user() -> String { "admin".into() }
fn default_log_format() -> String { "compact".into() }
fn default_true() -> bool { true }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults plus
    /// environment overrides when the file is absent.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) => match e.downcast_ref::<std::io::Error>() {
                Some(io) if io.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
                _ => return Err(e),
            },
        };
        cfg.apply_env();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// 环境变量覆盖：SERVER_HOST / SERVER_PORT / DATA_DIR / ADMIN_API_KEY
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Ok(dir) = std::env::var("DATA_DIR") {
            self.storage.data_dir = dir;
        }
        if let Ok(key) = std::env::var("ADMIN_API_KEY") {
            if !key.trim().is_empty() {
                self.auth.bootstrap_key = Some(key);
            }
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.validate()?;
        self.logging.validate()?;
        self.check_layout()?;
        Ok(())
    }

    /// Every direct child of `data_dir` is served as a public document, so
    /// neither the key file nor the local collection files may live there.
    fn check_layout(&self) -> Result<()> {
        let data_dir = lexical(&self.storage.data_dir);
        if lexical(&self.storage.local_dir) == data_dir {
            return Err(anyhow!("storage.local_dir must not be storage.data_dir itself"));
        }
        let keys_parent = Path::new(&self.auth.api_keys_file)
            .parent()
            .map(lexical)
            .unwrap_or_default();
        if keys_parent == data_dir {
            return Err(anyhow!(
                "auth.api_keys_file must not sit directly in storage.data_dir ({})",
                self.storage.data_dir
            ));
        }
        Ok(())
    }
}

// `./data/` and `data` name the same directory.
fn lexical(p: impl AsRef<Path>) -> PathBuf {
    p.as_ref()
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        if self.body_limit_bytes == 0 {
            self.body_limit_bytes = default_body_limit();
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir is empty"));
        }
        if self.local_dir.trim().is_empty() {
            return Err(anyhow!("storage.local_dir is empty"));
        }
        // the prefix becomes part of on-disk file names
        if !self.key_prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(anyhow!("storage.key_prefix may only contain letters, digits, '-' or '_'"));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        match self.format.as_str() {
            "compact" | "json" => Ok(()),
            other => Err(anyhow!("logging.format must be `compact` or `json`, got `{other}`")),
        }
    }
}
