//! Configuration loading and validation

use anyhow::{bail, Result};
use neoview_core::{classify_block, classify_block_strict, Segment, SerializerConfig, Verdict};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub serializer: SerializerConfig,
    #[serde(default)]
    pub consistency: ConsistencyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory with front-end files served for unmatched routes
    #[serde(default)]
    pub static_dir: Option<String>,
    /// TLS configuration (optional - enables HTTPS when present)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: None,
            tls: None,
        }
    }
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM format)
    pub cert: String,
    /// Path to private key file (PEM format)
    pub key: String,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory for downloaded recording files
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Limit for establishing an upstream connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Longest silence tolerated while reading an upstream response
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

impl CacheConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./download_cache")
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    /// Compare both signal kinds on every segment at block level
    #[serde(default)]
    pub strict: bool,
}

/// Block-level verdict using the configured check
pub fn block_verdict(config: &ConsistencyConfig, segments: &[Segment]) -> Verdict {
    if config.strict {
        classify_block_strict(segments)
    } else {
        classify_block(segments)
    }
}

impl Config {
    fn validate(&self) -> Result<()> {
        if !self.serializer.is_valid() {
            bail!(
                "Invalid serializer.datetime_format: {:?}",
                self.serializer.datetime_format
            );
        }
        if self.cache.connect_timeout_secs == 0 || self.cache.read_timeout_secs == 0 {
            bail!("cache.connect_timeout_secs and cache.read_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&temp_dir.path().join("neoview.toml")).unwrap();

        assert_eq!(config.daemon.bind, "0.0.0.0:8000");
        assert_eq!(config.cache.dir, PathBuf::from("./download_cache"));
        assert_eq!(config.cache.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.cache.read_timeout(), Duration::from_secs(30));
        assert!(!config.consistency.strict);
        assert!(config.daemon.tls.is_none());
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("neoview.toml");
        std::fs::write(
            &path,
            r#"
[daemon]
bind = "127.0.0.1:9000"
static_dir = "web"

[cache]
dir = "/var/cache/neoview"
read_timeout_secs = 120

[serializer]
datetime_format = "%Y-%m-%d %H:%M:%S%.6f"

[consistency]
strict = true
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.daemon.bind, "127.0.0.1:9000");
        assert_eq!(config.daemon.static_dir.as_deref(), Some("web"));
        assert_eq!(config.cache.dir, PathBuf::from("/var/cache/neoview"));
        assert_eq!(config.cache.connect_timeout_secs, 10);
        assert_eq!(config.cache.read_timeout(), Duration::from_secs(120));
        assert_eq!(config.serializer.datetime_format, "%Y-%m-%d %H:%M:%S%.6f");
        assert!(config.consistency.strict);
    }

    #[test]
    fn test_block_verdict_follows_strict_flag() {
        use neoview_core::{AnalogSignal, IrregularlySampledSignal};

        let analog = AnalogSignal {
            name: None,
            units: "mV".to_string(),
            sampling_rate: 1000.0,
            t_start: 0.0,
            time_units: "s".to_string(),
            channels: vec![vec![0.0; 4]],
        };
        let irregular = IrregularlySampledSignal {
            name: None,
            units: "mV".to_string(),
            time_units: "s".to_string(),
            times: vec![0.0, 0.5],
            channels: vec![vec![1.0, 2.0]],
        };
        // Same analog count; only the second segment has an irregular signal
        let segments = vec![
            Segment {
                analog_signals: vec![analog.clone()],
                ..Default::default()
            },
            Segment {
                analog_signals: vec![analog],
                irregular_signals: vec![irregular],
                ..Default::default()
            },
        ];

        let plain = ConsistencyConfig { strict: false };
        let strict = ConsistencyConfig { strict: true };
        assert_eq!(block_verdict(&plain, &segments), Verdict::Consistent);
        assert_eq!(block_verdict(&strict, &segments), Verdict::Unspecified);
    }

    #[test]
    fn test_zero_read_timeout_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("neoview.toml");
        std::fs::write(&path, "[cache]\nread_timeout_secs = 0\n").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_invalid_datetime_format_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("neoview.toml");
        std::fs::write(&path, "[serializer]\ndatetime_format = \"%Y-%Q\"\n").unwrap();

        assert!(load_config(&path).is_err());
    }
}
