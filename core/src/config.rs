use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobStoreBackend {
    Memory,
    Supabase,
}

impl FromStr for BlobStoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "supabase" | "http" => Ok(Self::Supabase),
            other => bail!("unsupported blob store backend: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default)]
    pub frontend_origin: Option<String>,
    #[serde(default = "default_blob_store_backend")]
    pub blob_store_backend: BlobStoreBackend,
    #[serde(default)]
    pub storage_url: Option<String>,
    #[serde(default)]
    pub storage_key: Option<String>,
    #[serde(default = "default_storage_bucket")]
    pub storage_bucket: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            database_path: default_database_path(),
            database_max_connections: default_database_max_connections(),
            base_path: default_base_path(),
            frontend_origin: None,
            blob_store_backend: default_blob_store_backend(),
            storage_url: None,
            storage_key: None,
            storage_bucket: default_storage_bucket(),
        }
    }
}

impl AppConfig {
    const CONFIG_ENV: &'static str = "AGROCOOP_CONFIG_FILE";
    const BIND_ADDRESS_ENV: &'static str = "AGROCOOP_BIND_ADDRESS";
    const DATABASE_PATH_ENV: &'static str = "AGROCOOP_DATABASE_PATH";
    const DATABASE_MAX_CONNECTIONS_ENV: &'static str = "AGROCOOP_DATABASE_MAX_CONNECTIONS";
    const BASE_PATH_ENV: &'static str = "AGROCOOP_BASE_PATH";
    const FRONTEND_ORIGIN_ENV: &'static str = "AGROCOOP_FRONTEND_ORIGIN";
    const BLOB_STORE_BACKEND_ENV: &'static str = "AGROCOOP_BLOB_STORE_BACKEND";
    const STORAGE_URL_ENV: &'static str = "AGROCOOP_STORAGE_URL";
    const STORAGE_KEY_ENV: &'static str = "AGROCOOP_STORAGE_KEY";
    const STORAGE_BUCKET_ENV: &'static str = "AGROCOOP_STORAGE_BUCKET";

    /// Load configuration from defaults layered with optional config files and
    /// environment variables.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    pub fn load_with(config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::resolve_config_path(config_path)? {
            config = Self::from_file(&path)?;
        }

        config.apply_env()?;
        config.base_path = normalize_base_path(&config.base_path);

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = env::var(Self::BIND_ADDRESS_ENV) {
            self.bind_address = addr
                .parse()
                .with_context(|| format!("invalid {name}", name = Self::BIND_ADDRESS_ENV))?;
        }

        if let Ok(path) = env::var(Self::DATABASE_PATH_ENV) {
            self.database_path = path;
        }

        if let Ok(value) = env::var(Self::DATABASE_MAX_CONNECTIONS_ENV) {
            self.database_max_connections = value.trim().parse().with_context(|| {
                format!("invalid {name}", name = Self::DATABASE_MAX_CONNECTIONS_ENV)
            })?;
        }

        if let Ok(path) = env::var(Self::BASE_PATH_ENV) {
            self.base_path = path;
        }

        if let Ok(origin) = env::var(Self::FRONTEND_ORIGIN_ENV) {
            self.frontend_origin = non_empty(origin);
        }

        if let Ok(backend) = env::var(Self::BLOB_STORE_BACKEND_ENV) {
            self.blob_store_backend = backend.parse()?;
        }

        if let Ok(url) = env::var(Self::STORAGE_URL_ENV) {
            self.storage_url = non_empty(url);
        }

        if let Ok(key) = env::var(Self::STORAGE_KEY_ENV) {
            self.storage_key = non_empty(key);
        }

        if let Ok(bucket) = env::var(Self::STORAGE_BUCKET_ENV) {
            if let Some(bucket) = non_empty(bucket) {
                self.storage_bucket = bucket;
            }
        }

        Ok(())
    }

    fn resolve_config_path(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            return Self::validate_path(path);
        }

        if let Ok(path) = env::var(Self::CONFIG_ENV) {
            return Self::validate_path(PathBuf::from(path));
        }

        let mut candidates = vec![PathBuf::from("agrocoop.toml")];
        if let Some(dir) = Self::default_config_dir() {
            candidates.push(dir.join("config.toml"));
        }

        for candidate in candidates {
            if candidate.exists() {
                return Ok(Some(candidate));
            }
        }

        Ok(None)
    }

    fn validate_path(path: PathBuf) -> Result<Option<PathBuf>> {
        if path.exists() {
            Ok(Some(path))
        } else {
            Err(anyhow!(
                "configuration file does not exist: {}",
                path.display()
            ))
        }
    }

    fn default_config_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".agrocoop"))
    }
}

/// Ensures the prefix starts with `/` and has no trailing slash; `/` and the
/// empty string both collapse to no prefix.
pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }

    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_database_path() -> String {
    "./data/agrocoop.db".to_owned()
}

fn default_database_max_connections() -> u32 {
    4
}

fn default_base_path() -> String {
    "/api".to_owned()
}

fn default_blob_store_backend() -> BlobStoreBackend {
    BlobStoreBackend::Memory
}

fn default_storage_bucket() -> String {
    "cooperative".to_owned()
}

fn home_dir() -> Option<PathBuf> {
    if let Some(path) = env::var_os("HOME") {
        return Some(PathBuf::from(path));
    }

    if let Some(path) = env::var_os("USERPROFILE") {
        return Some(PathBuf::from(path));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn base_path_normalization() {
        assert_eq!(normalize_base_path("/api/"), "/api");
        assert_eq!(normalize_base_path("api"), "/api");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path("  "), "");
    }

    #[test]
    fn config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        writeln!(
            file,
            "database_path = \"/tmp/coop.db\"\nblob_store_backend = \"supabase\"\nstorage_bucket = \"files\""
        )
        .expect("write config");

        let config = AppConfig::from_file(file.path()).expect("parse config");
        assert_eq!(config.database_path, "/tmp/coop.db");
        assert_eq!(config.blob_store_backend, BlobStoreBackend::Supabase);
        assert_eq!(config.storage_bucket, "files");
        assert_eq!(config.base_path, "/api");
        assert_eq!(config.database_max_connections, 4);
    }

    #[test]
    fn blob_backend_parses_aliases() {
        assert_eq!(
            "In-Memory".parse::<BlobStoreBackend>().unwrap(),
            BlobStoreBackend::Memory
        );
        assert!("s3".parse::<BlobStoreBackend>().is_err());
    }
}
