//! Configuration loaded from the environment (and an optional `.env` file).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}: cannot parse {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

/// Which backend holds jobs, slots and caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    /// In-process; state is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Configuration for a single-server deployment.
#[derive(Clone, Debug)]
pub struct LocalConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: u16,
    /// Redis connection URL
    pub redis_url: String,
    pub store_backend: StoreBackend,
    /// Directory holding produced artifacts
    pub files_dir: PathBuf,
    /// Public path the files directory is served under
    pub media_url_prefix: String,
    /// Allowed CORS origins; `*` allows any
    pub allowed_origins: Vec<String>,
    pub max_concurrent_downloads: usize,
    pub download_workers: usize,
    pub job_ttl: Duration,
    pub slot_ttl: Duration,
    pub search_cache_ttl: Duration,
    pub audio_cache_ttl: Duration,
    pub search_max_results: usize,
    /// Bound on every backing-store call
    pub store_timeout: Duration,
    /// yt-dlp executable
    pub ytdlp_bin: PathBuf,
    pub download_attempts: u32,
    pub fragment_retries: u32,
    /// Artifacts older than this are deleted at startup
    pub file_retention: Duration,
}

impl LocalConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let parsed = |name: &'static str, default: &str| -> Result<u64, ConfigError> {
            let value = var(name, default);
            value
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        };
        let positive = |name: &'static str, default: &str| -> Result<u64, ConfigError> {
            match parsed(name, default)? {
                0 => Err(ConfigError::Zero { name }),
                n => Ok(n),
            }
        };

        let port_value = var("PORT", "3000");
        let port = port_value.parse().map_err(|_| ConfigError::Invalid {
            name: "PORT",
            value: port_value,
        })?;

        let backend_value = var("STORE_BACKEND", "redis");
        let store_backend = backend_value.parse().map_err(|_| ConfigError::Invalid {
            name: "STORE_BACKEND",
            value: backend_value,
        })?;

        let prefix_value = var("MEDIA_URL_PREFIX", "/media/files");
        let media_url_prefix = prefix_value.trim_end_matches('/').to_string();
        if !media_url_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                name: "MEDIA_URL_PREFIX",
                value: prefix_value,
            });
        }

        let allowed_origins = var("ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let max_concurrent_downloads = positive("MAX_CONCURRENT_DOWNLOADS", "5")? as usize;
        // Defaults to one worker per download slot.
        let download_workers =
            positive("DOWNLOAD_WORKERS", &max_concurrent_downloads.to_string())? as usize;

        Ok(Self {
            addr: var("ADDR", "127.0.0.1"),
            port,
            redis_url: var("REDIS_URL", "redis://127.0.0.1/"),
            store_backend,
            files_dir: PathBuf::from(var("FILES_DIR", "./media/files")),
            media_url_prefix,
            allowed_origins,
            max_concurrent_downloads,
            download_workers,
            job_ttl: Duration::from_secs(positive("JOB_TTL_SECS", "172800")?),
            slot_ttl: Duration::from_secs(positive("SLOT_TTL_SECS", "7200")?),
            search_cache_ttl: Duration::from_secs(positive("SEARCH_CACHE_TTL_SECS", "3600")?),
            audio_cache_ttl: Duration::from_secs(positive("AUDIO_CACHE_TTL_SECS", "86400")?),
            search_max_results: positive("SEARCH_MAX_RESULTS", "6")? as usize,
            store_timeout: Duration::from_millis(positive("STORE_TIMEOUT_MS", "2000")?),
            ytdlp_bin: PathBuf::from(var("YTDLP_BIN", "yt-dlp")),
            download_attempts: positive("DOWNLOAD_ATTEMPTS", "3")? as u32,
            fragment_retries: parsed("FRAGMENT_RETRIES", "3")? as u32,
            file_retention: Duration::from_secs(positive("FILE_RETENTION_HOURS", "24")? * 3600),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<LocalConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LocalConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.store_backend, StoreBackend::Redis);
        assert_eq!(config.max_concurrent_downloads, 5);
        assert_eq!(config.download_workers, 5);
        assert_eq!(config.job_ttl, Duration::from_secs(48 * 3600));
        assert_eq!(config.slot_ttl, Duration::from_secs(2 * 3600));
        assert_eq!(config.search_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.audio_cache_ttl, Duration::from_secs(24 * 3600));
        assert_eq!(config.search_max_results, 6);
        assert_eq!(config.media_url_prefix, "/media/files");
        assert_eq!(config.allowed_origins, vec!["*".to_string()]);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STORE_BACKEND", "Memory"),
            ("MAX_CONCURRENT_DOWNLOADS", "2"),
            ("DOWNLOAD_WORKERS", "4"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
            ("MEDIA_URL_PREFIX", "/files/"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.max_concurrent_downloads, 2);
        assert_eq!(config.download_workers, 4);
        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.media_url_prefix, "/files");
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert_eq!(
            load(&[("MAX_CONCURRENT_DOWNLOADS", "many")]).unwrap_err(),
            ConfigError::Invalid {
                name: "MAX_CONCURRENT_DOWNLOADS",
                value: "many".to_string()
            }
        );
        assert_eq!(
            load(&[("MAX_CONCURRENT_DOWNLOADS", "0")]).unwrap_err(),
            ConfigError::Zero {
                name: "MAX_CONCURRENT_DOWNLOADS"
            }
        );
        assert!(load(&[("STORE_BACKEND", "postgres")]).is_err());
        assert!(load(&[("PORT", "99999")]).is_err());
        assert!(load(&[("MEDIA_URL_PREFIX", "media")]).is_err());
    }
}
