use crate::config::{RandomnessConfig, SaveOptions};
use crate::constants::{record, seed};
use crate::device::Device;
use crate::error::{HelperError, Result};
use crate::logging::{LogConfig, LogFormat};
use crate::serialization::RecordFormat;
use crate::utils::error_helpers::ParseErrorMapper;
use crate::utils::file_io::{read_file_string, write_file_string};
use std::path::Path;

/// Settings shared by training scripts, loadable from TOML or JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelperConfigFile {
    #[serde(default)]
    pub seed: SeedConfigSection,

    #[serde(default)]
    pub checkpoint: CheckpointConfigSection,

    #[serde(default)]
    pub logging: LoggingConfigSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfigSection {
    /// Seed applied to every generator (default: 1234)
    pub seed: u64,

    /// Deterministic accelerator kernels (default: true)
    pub deterministic: bool,

    /// Kernel auto-tuning, only honoured when not deterministic (default: false)
    pub benchmark: bool,

    /// Export hash-seed / determinism environment variables (default: true)
    pub set_env_vars: bool,

    /// Accelerators to seed, e.g. ["cuda:0"]; detected when absent
    pub accelerators: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfigSection {
    /// "binary" or "json" (default: "binary")
    pub format: String,

    /// Zero the 12 low bits of every value (default: false)
    pub quantise: bool,

    /// xz preset 0-9 for binary records (default: 7)
    pub compression_level: u32,

    /// Save every N steps when using the checkpoint manager (default: 1000)
    pub interval: usize,

    /// Device optimizer state is moved to on restore (default: "cpu")
    pub device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfigSection {
    /// trace, debug, info, warn or error (default: "info")
    pub level: String,

    /// compact, pretty or json (default: "compact")
    pub format: String,
}

impl Default for SeedConfigSection {
    fn default() -> Self {
        Self {
            seed: seed::DEFAULT_SEED,
            deterministic: true,
            benchmark: false,
            set_env_vars: true,
            accelerators: None,
        }
    }
}

impl Default for CheckpointConfigSection {
    fn default() -> Self {
        Self {
            format: "binary".to_string(),
            quantise: false,
            compression_level: record::DEFAULT_COMPRESSION_LEVEL,
            interval: 1000,
            device: "cpu".to_string(),
        }
    }
}

impl Default for LoggingConfigSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl HelperConfigFile {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = read_file_string(path)?;
        toml::from_str(&contents).map_parse_err("Failed to parse TOML config")
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = read_file_string(path)?;
        serde_json::from_str(&contents).map_parse_err("Failed to parse JSON config")
    }

    /// Picks the parser from the file extension; anything but `.json` is TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| HelperError::Encode(format!("Failed to serialize to TOML: {}", e)))?;
        write_file_string(path, &contents)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| HelperError::Encode(format!("Failed to serialize to JSON: {}", e)))?;
        write_file_string(path, &contents)
    }

    pub fn to_randomness_config(&self) -> Result<RandomnessConfig> {
        let accelerators = match &self.seed.accelerators {
            Some(names) => Some(
                names
                    .iter()
                    .map(|name| name.parse::<Device>())
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };
        let config = RandomnessConfig {
            seed: self.seed.seed,
            deterministic: self.seed.deterministic,
            benchmark: self.seed.benchmark,
            set_env_vars: self.seed.set_env_vars,
            accelerators,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_save_options(&self) -> Result<SaveOptions> {
        let options = SaveOptions {
            format: RecordFormat::from_str(&self.checkpoint.format)?,
            quantise: self.checkpoint.quantise,
            compression_level: self.checkpoint.compression_level,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn restore_device(&self) -> Result<Device> {
        self.checkpoint.device.parse()
    }

    pub fn to_log_config(&self) -> Result<LogConfig> {
        let level = self
            .logging
            .level
            .parse::<tracing::Level>()
            .map_parse_err("Invalid log level")?;
        Ok(LogConfig {
            level,
            format: LogFormat::from_str(&self.logging.format)?,
        })
    }

    pub fn generate_default() -> Self {
        Self {
            seed: SeedConfigSection::default(),
            checkpoint: CheckpointConfigSection::default(),
            logging: LoggingConfigSection::default(),
        }
    }

    /// Example configuration with comments
    pub fn create_example_toml() -> String {
        r#"# model-helpers configuration

[seed]
# Seed applied to the general, array and framework generators
seed = 1234

# Deterministic accelerator kernels
deterministic = true

# Kernel auto-tuning; only honoured when deterministic = false
benchmark = false

# Export PYTHONHASHSEED (and TF_DETERMINISTIC_OPS for the alternate framework)
set_env_vars = true

# Accelerators to seed; detected when omitted
# accelerators = ["cuda:0", "cuda:1"]

[checkpoint]
# "binary" (xz-compressed bincode) or "json"
format = "binary"

# Zero the 12 least significant bits of every value to shrink files
quantise = false

# xz preset, 0-9
compression_level = 7

# Save every N steps when using the checkpoint manager
interval = 1000

# Device optimizer state is moved to when restoring
device = "cpu"

[logging]
# trace, debug, info, warn or error
level = "info"

# compact, pretty or json
format = "compact"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = HelperConfigFile::generate_default();
        assert_eq!(config.seed.seed, 1234);
        assert_eq!(config.checkpoint.format, "binary");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_example_toml_parses_to_defaults() {
        let parsed: HelperConfigFile = toml::from_str(&HelperConfigFile::create_example_toml()).unwrap();
        let defaults = HelperConfigFile::generate_default();
        assert_eq!(parsed.seed.seed, defaults.seed.seed);
        assert_eq!(parsed.checkpoint.compression_level, defaults.checkpoint.compression_level);
        assert_eq!(parsed.logging.format, defaults.logging.format);
    }

    #[test]
    fn test_save_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = HelperConfigFile::generate_default();
        config.seed.seed = 7;
        config.to_toml_file(&path).unwrap();

        let loaded = HelperConfigFile::from_file(&path).unwrap();
        assert_eq!(loaded.seed.seed, 7);
    }

    #[test]
    fn test_save_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = HelperConfigFile::generate_default();
        config.checkpoint.format = "json".to_string();
        config.to_json_file(&path).unwrap();

        let loaded = HelperConfigFile::from_file(&path).unwrap();
        assert_eq!(loaded.to_save_options().unwrap().format, RecordFormat::Json);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let parsed: HelperConfigFile = toml::from_str("[seed]\nseed = 3\n").unwrap();
        assert_eq!(parsed.seed.seed, 3);
        assert!(parsed.seed.deterministic);
        assert_eq!(parsed.checkpoint.interval, 1000);
    }

    #[test]
    fn test_conversions() {
        let mut config = HelperConfigFile::generate_default();
        config.seed.accelerators = Some(vec!["cuda:1".to_string()]);
        config.checkpoint.device = "gpu".to_string();

        let randomness = config.to_randomness_config().unwrap();
        assert_eq!(randomness.accelerators(), vec![Device::Cuda(1)]);
        assert_eq!(config.restore_device().unwrap(), Device::Cuda(0));
        assert_eq!(config.to_log_config().unwrap().level, tracing::Level::INFO);

        config.checkpoint.format = "yaml".to_string();
        assert!(config.to_save_options().is_err());
        config.logging.level = "loud".to_string();
        assert!(config.to_log_config().is_err());
    }
}
