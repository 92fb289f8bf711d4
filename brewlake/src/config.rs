//! Lake layout and tuning knobs.
//!
//! Values resolve in layers: built-in defaults, then an optional TOML file,
//! then `BREWLAKE_*` environment variables, then command line flags.

use std::fs;
use std::path::{Path, PathBuf};

use brewlake_dataset::PartitionPath;
use brewlake_dimension::DimensionPaths;
use brewlake_result::{Error, Result};
use brewlake_types::BatchId;
use brewlake_types::schema::BATCH;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LAKE_ROOT: &str = "data_lake_mock";
pub const DEFAULT_FILES_PER_BATCH: usize = 10;
pub const DEFAULT_SCAN_CHUNK_SIZE: usize = 65_536;

pub const ENV_LAKE_ROOT: &str = "BREWLAKE_LAKE_ROOT";
pub const ENV_RAW_DIR: &str = "BREWLAKE_RAW_DIR";
pub const ENV_DIM_DIR: &str = "BREWLAKE_DIM_DIR";
pub const ENV_FACT_DIR: &str = "BREWLAKE_FACT_DIR";
pub const ENV_GOLD_DIR: &str = "BREWLAKE_GOLD_DIR";
pub const ENV_SIGNAL_DIR: &str = "BREWLAKE_SIGNAL_DIR";
pub const ENV_FILES_PER_BATCH: &str = "BREWLAKE_FILES_PER_BATCH";
pub const ENV_SCAN_CHUNK_SIZE: &str = "BREWLAKE_SCAN_CHUNK_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LakeConfig {
    pub raw_dir: PathBuf,
    pub dim_dir: PathBuf,
    pub fact_dir: PathBuf,
    pub gold_dir: PathBuf,
    pub signal_dir: PathBuf,
    /// Raw files read into one fact write.
    pub files_per_batch: usize,
    /// Rows per chunk when scanning the fact store.
    pub scan_chunk_size: usize,
}

impl Default for LakeConfig {
    fn default() -> Self {
        Self::rooted_at(DEFAULT_LAKE_ROOT)
    }
}

/// Overrides from the command line. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub lake_root: Option<PathBuf>,
    pub raw_dir: Option<PathBuf>,
    pub dim_dir: Option<PathBuf>,
    pub fact_dir: Option<PathBuf>,
    pub gold_dir: Option<PathBuf>,
    pub signal_dir: Option<PathBuf>,
    pub files_per_batch: Option<usize>,
    pub scan_chunk_size: Option<usize>,
}

fn parse_count(name: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        Error::InvalidArgumentError(format!("{name} must be a positive integer, got '{value}'"))
    })
}

impl LakeConfig {
    /// Standard layout below `root`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            raw_dir: root.join("raw"),
            dim_dir: root.join("silver").join("dim"),
            fact_dir: root.join("silver").join("fact"),
            gold_dir: root.join("gold"),
            signal_dir: root.join("signals"),
            files_per_batch: DEFAULT_FILES_PER_BATCH,
            scan_chunk_size: DEFAULT_SCAN_CHUNK_SIZE,
        }
    }

    /// Point every directory at the standard layout below `root`.
    fn reroot(&mut self, root: impl AsRef<Path>) {
        let rooted = Self::rooted_at(root);
        self.raw_dir = rooted.raw_dir;
        self.dim_dir = rooted.dim_dir;
        self.fact_dir = rooted.fact_dir;
        self.gold_dir = rooted.gold_dir;
        self.signal_dir = rooted.signal_dir;
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::InvalidArgumentError(format!("invalid configuration: {e}")))
    }

    /// Read a TOML configuration file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::storage("read", path, e))?;
        toml::from_str(&contents).map_err(|e| {
            Error::InvalidArgumentError(format!("invalid configuration in {}: {e}", path.display()))
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::unexpected("serializing configuration", e))
    }

    /// Apply `BREWLAKE_*` variables from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by variable name.
    ///
    /// `BREWLAKE_LAKE_ROOT` resets every directory to the standard layout
    /// below it before the per-directory variables are applied.
    pub fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(root) = lookup(ENV_LAKE_ROOT) {
            self.reroot(root);
        }
        let dirs = [
            (ENV_RAW_DIR, &mut self.raw_dir),
            (ENV_DIM_DIR, &mut self.dim_dir),
            (ENV_FACT_DIR, &mut self.fact_dir),
            (ENV_GOLD_DIR, &mut self.gold_dir),
            (ENV_SIGNAL_DIR, &mut self.signal_dir),
        ];
        for (name, slot) in dirs {
            if let Some(value) = lookup(name) {
                *slot = PathBuf::from(value);
            }
        }
        if let Some(value) = lookup(ENV_FILES_PER_BATCH) {
            self.files_per_batch = parse_count(ENV_FILES_PER_BATCH, &value)?;
        }
        if let Some(value) = lookup(ENV_SCAN_CHUNK_SIZE) {
            self.scan_chunk_size = parse_count(ENV_SCAN_CHUNK_SIZE, &value)?;
        }
        Ok(self)
    }

    pub fn apply_update(&mut self, update: ConfigUpdate) {
        if let Some(root) = update.lake_root {
            self.reroot(root);
        }
        if let Some(dir) = update.raw_dir {
            self.raw_dir = dir;
        }
        if let Some(dir) = update.dim_dir {
            self.dim_dir = dir;
        }
        if let Some(dir) = update.fact_dir {
            self.fact_dir = dir;
        }
        if let Some(dir) = update.gold_dir {
            self.gold_dir = dir;
        }
        if let Some(dir) = update.signal_dir {
            self.signal_dir = dir;
        }
        if let Some(n) = update.files_per_batch {
            self.files_per_batch = n;
        }
        if let Some(n) = update.scan_chunk_size {
            self.scan_chunk_size = n;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.files_per_batch == 0 {
            return Err(Error::InvalidArgumentError(
                "files_per_batch must be at least 1".into(),
            ));
        }
        if self.scan_chunk_size == 0 {
            return Err(Error::InvalidArgumentError(
                "scan_chunk_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn dimension_paths(&self) -> DimensionPaths {
        DimensionPaths::in_dir(&self.dim_dir)
    }

    /// Output directory of the gold summary computed on `day`.
    pub fn gold_batch_dir(&self, day: &BatchId) -> PathBuf {
        PartitionPath::new()
            .with(BATCH, Some(day.as_str()))
            .to_path(&self.gold_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_follow_lake_layout() {
        let config = LakeConfig::default();
        assert_eq!(config.raw_dir, Path::new("data_lake_mock/raw"));
        assert_eq!(config.dim_dir, Path::new("data_lake_mock/silver/dim"));
        assert_eq!(config.fact_dir, Path::new("data_lake_mock/silver/fact"));
        assert_eq!(config.files_per_batch, 10);
        assert_eq!(config.scan_chunk_size, 65_536);
        config.validate().unwrap();
    }

    #[test]
    fn toml_fills_missing_keys_with_defaults() {
        let config =
            LakeConfig::from_toml_str("files_per_batch = 3\nfact_dir = \"/tmp/fact\"\n").unwrap();
        assert_eq!(config.files_per_batch, 3);
        assert_eq!(config.fact_dir, Path::new("/tmp/fact"));
        assert_eq!(config.raw_dir, LakeConfig::default().raw_dir);
    }

    #[test]
    fn unknown_toml_keys_are_rejected() {
        let err = LakeConfig::from_toml_str("fact_root = \"x\"").unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentError(_)));
    }

    #[test]
    fn env_overrides_apply_after_root() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_LAKE_ROOT, "/lake"),
            (ENV_GOLD_DIR, "/published/gold"),
            (ENV_FILES_PER_BATCH, "4"),
        ]);
        let config = LakeConfig::default()
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.raw_dir, Path::new("/lake/raw"));
        assert_eq!(config.gold_dir, Path::new("/published/gold"));
        assert_eq!(config.files_per_batch, 4);
    }

    #[test]
    fn bad_numeric_override_is_rejected() {
        let err = LakeConfig::default()
            .apply_vars(|name| (name == ENV_SCAN_CHUNK_SIZE).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_SCAN_CHUNK_SIZE));

        let mut config = LakeConfig::default();
        config.apply_update(ConfigUpdate {
            files_per_batch: Some(0),
            ..ConfigUpdate::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = LakeConfig::rooted_at("/srv/lake");
        let text = config.to_toml_string().unwrap();
        assert_eq!(LakeConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn gold_output_is_partitioned_by_day() {
        let config = LakeConfig::rooted_at("/lake");
        let day = BatchId::new("2025-09-27").unwrap();
        assert_eq!(config.gold_batch_dir(&day), Path::new("/lake/gold/batch=2025-09-27"));
    }
}
