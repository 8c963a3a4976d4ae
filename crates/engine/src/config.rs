//! Store configuration via `pancarte.toml`
//!
//! Every field has a default, so a config file only needs the settings it
//! changes. Programmatic callers use the `with_*` setters instead.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use pancarte_core::{Error, Result};
use pancarte_durability::{get_codec, PartitionDepth, StorageCodec};

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "pancarte.toml";

/// Default size threshold, in values.
pub const DEFAULT_CACHE_SIZE: u64 = 10_000_000_000;

/// Default lateness margin: 5 minutes.
pub const DEFAULT_LATENESS_MARGIN_MS: u64 = 300_000;

/// Store configuration loaded from `pancarte.toml`.
///
/// # Example
///
/// ```toml
/// location = "/var/lib/pancarte"
/// cache_size = 1000000
/// lateness_margin_ms = 60000
/// partitioning_depth = 4
/// codec = "zstd"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PancarteConfig {
    /// Root directory of the block tree.
    #[serde(default = "default_location")]
    pub location: PathBuf,
    /// Values buffered before the buffer starts draining.
    #[serde(default = "default_cache_size")]
    pub cache_size: u64,
    /// How late a record may arrive and still join its generation.
    #[serde(default = "default_lateness_margin_ms")]
    pub lateness_margin_ms: u64,
    /// Calendar components in partition paths, 1 (year) to 6 (second).
    #[serde(default = "default_partitioning_depth")]
    pub partitioning_depth: u8,
    /// Codec for new blocks: `"identity"` or `"zstd"`.
    #[serde(default = "default_codec")]
    pub codec: String,
}

fn default_location() -> PathBuf {
    PathBuf::from("pancarte-data")
}

fn default_cache_size() -> u64 {
    DEFAULT_CACHE_SIZE
}

fn default_lateness_margin_ms() -> u64 {
    DEFAULT_LATENESS_MARGIN_MS
}

fn default_partitioning_depth() -> u8 {
    PartitionDepth::DEFAULT.get() as u8
}

fn default_codec() -> String {
    "identity".to_string()
}

impl Default for PancarteConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            cache_size: default_cache_size(),
            lateness_margin_ms: default_lateness_margin_ms(),
            partitioning_depth: default_partitioning_depth(),
            codec: default_codec(),
        }
    }
}

impl PancarteConfig {
    /// Default settings rooted at `location`.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Set the size threshold.
    pub fn with_cache_size(mut self, cache_size: u64) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Set the lateness margin.
    ///
    /// The margin is kept in whole milliseconds; a partial millisecond
    /// rounds up, so a non-zero margin never becomes zero.
    pub fn with_lateness_margin(mut self, margin: Duration) -> Self {
        let mut millis = margin.as_millis();
        if margin.subsec_nanos() % 1_000_000 != 0 {
            millis += 1;
        }
        self.lateness_margin_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    /// Set the partition depth.
    pub fn with_partitioning_depth(mut self, depth: u8) -> Self {
        self.partitioning_depth = depth;
        self
    }

    /// Set the codec for new blocks.
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Lateness margin as a duration.
    pub fn lateness_margin(&self) -> Duration {
        Duration::from_millis(self.lateness_margin_ms)
    }

    /// Partition depth, checked.
    pub fn partition_depth(&self) -> Result<PartitionDepth> {
        PartitionDepth::new(self.partitioning_depth).ok_or_else(|| {
            Error::Config(format!(
                "partitioning_depth must be between {} and {}, got {}",
                PartitionDepth::MIN,
                PartitionDepth::MAX,
                self.partitioning_depth
            ))
        })
    }

    /// Codec instance for new blocks.
    pub fn storage_codec(&self) -> Result<Box<dyn StorageCodec>> {
        get_codec(&self.codec).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an empty location, a zero cache size, a
    /// depth outside 1..=6 or an unknown codec.
    pub fn validate(&self) -> Result<()> {
        if self.location.as_os_str().is_empty() {
            return Err(Error::Config("location must not be empty".to_string()));
        }
        if self.cache_size == 0 {
            return Err(Error::Config("cache_size must be at least 1".to_string()));
        }
        self.partition_depth()?;
        self.storage_codec()?;
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Pancarte store configuration
#
# Root directory of the block tree. Relative paths are resolved against
# the directory holding this file.
location = "pancarte-data"

# Values buffered before a flush is attempted (lf = 1 per record,
# hf = 1 per sample).
cache_size = 10000000000

# How late a record may arrive, in milliseconds, and still be written
# together with its neighbours.
lateness_margin_ms = 300000

# Partition directory depth: 1 = year ... 4 = hour (default) ... 6 = second
partitioning_depth = 4

# Block codec: "identity" (default) or "zstd"
codec = "identity"
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// A relative `location` is resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut config: PancarteConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        if config.location.is_relative() {
            if let Some(parent) = path.parent() {
                config.location = parent.join(&config.location);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = PancarteConfig::default();
        assert_eq!(config.cache_size, 10_000_000_000);
        assert_eq!(config.lateness_margin(), Duration::from_secs(300));
        assert_eq!(config.partitioning_depth, 4);
        assert_eq!(config.codec, "identity");
        config.validate().unwrap();
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: PancarteConfig = toml::from_str("cache_size = 3").unwrap();
        assert_eq!(config.cache_size, 3);
        assert_eq!(config.lateness_margin_ms, DEFAULT_LATENESS_MARGIN_MS);
        assert_eq!(config.location, PathBuf::from("pancarte-data"));
    }

    #[test]
    fn default_toml_parses_to_default() {
        let config: PancarteConfig = toml::from_str(PancarteConfig::default_toml()).unwrap();
        assert_eq!(config, PancarteConfig::default());
    }

    #[test]
    fn builder_setters() {
        let config = PancarteConfig::new("/tmp/x")
            .with_cache_size(3)
            .with_lateness_margin(Duration::ZERO)
            .with_partitioning_depth(6)
            .with_codec("zstd");
        config.validate().unwrap();
        assert_eq!(config.partition_depth().unwrap().get(), 6);
        assert_eq!(config.storage_codec().unwrap().codec_id(), "zstd");
        assert_eq!(config.lateness_margin_ms, 0);
    }

    #[test]
    fn sub_millisecond_margin_rounds_up() {
        let config = PancarteConfig::new("/tmp/x");
        let margin = |d| config.clone().with_lateness_margin(d).lateness_margin();
        assert_eq!(margin(Duration::from_micros(900)), Duration::from_millis(1));
        assert_eq!(margin(Duration::from_nanos(1)), Duration::from_millis(1));
        assert_eq!(margin(Duration::from_micros(1_500)), Duration::from_millis(2));
        assert_eq!(margin(Duration::from_millis(250)), Duration::from_millis(250));
        assert_eq!(margin(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let base = PancarteConfig::new("/tmp/x");
        for bad in [
            base.clone().with_cache_size(0),
            base.clone().with_partitioning_depth(0),
            base.clone().with_partitioning_depth(7),
            base.clone().with_codec("lz4"),
            PancarteConfig::new(""),
        ] {
            assert!(matches!(bad.validate(), Err(Error::Config(_))), "{:?}", bad);
        }
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        PancarteConfig::write_default_if_missing(&path).unwrap();
        let config = PancarteConfig::from_file(&path).unwrap();
        assert_eq!(config.location, dir.path().join("pancarte-data"));
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "cache_size = 42\n").unwrap();

        PancarteConfig::write_default_if_missing(&path).unwrap();
        assert_eq!(PancarteConfig::from_file(&path).unwrap().cache_size, 42);
    }

    #[test]
    fn from_file_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "partitioning_depth = 9\n").unwrap();
        assert!(PancarteConfig::from_file(&path).is_err());

        std::fs::write(&path, "cache_size = \"lots\"\n").unwrap();
        assert!(PancarteConfig::from_file(&path).is_err());
    }

    #[test]
    fn write_to_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = PancarteConfig::new(dir.path().join("blocks")).with_codec("zstd");
        config.write_to_file(&path).unwrap();
        assert_eq!(PancarteConfig::from_file(&path).unwrap(), config);
    }
}
