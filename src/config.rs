//! Configuration loading using Figment.
//!
//! Configuration is layered:
//! 1. Built-in defaults ([`SppConfig::default`])
//! 2. TOML file: the path given with `--config`, else `spp-nidaq.toml` in
//!    the working directory when it exists
//! 3. Environment variables prefixed with `SPP_NIDAQ_`; nested keys use
//!    double underscores (`SPP_NIDAQ_LOGGING__LEVEL=debug`,
//!    `SPP_NIDAQ_SIMULATED__SEED=7`)
//!
//! # Example
//! ```toml
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [backend]
//! kind = "simulated"
//!
//! [simulated]
//! mode = "realistic"
//! waveform = "sine"
//! seed = 42
//!
//! [[simulated.devices]]
//! name = "Dev1"
//! ai_channels = 16
//! max_voltage = 10.0
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{DaqBackend, SimulatedBackend, SimulatedDevice, SimulationMode, Waveform};
use crate::logging::{self, LoggingConfig};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "spp-nidaq.toml";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "SPP_NIDAQ_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SppConfig {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Backend selection
    #[serde(default)]
    pub backend: BackendConfig,
    /// Simulated backend settings
    #[serde(default)]
    pub simulated: SimulatedConfig,
}

/// Which backend serves the commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process simulation
    #[default]
    Simulated,
    /// NI-DAQmx driver (requires the `hardware` feature)
    Daqmx,
}

/// `[backend]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend implementation
    #[serde(default)]
    pub kind: BackendKind,
}

/// `[simulated]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedConfig {
    /// Timing behaviour
    #[serde(default)]
    pub mode: SimulationMode,
    /// Seed for the noise generator; random when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Synthesized signal
    #[serde(default)]
    pub waveform: Waveform,
    /// Simulated devices
    #[serde(default = "default_devices")]
    pub devices: Vec<SimulatedDevice>,
}

fn default_devices() -> Vec<SimulatedDevice> {
    vec![SimulatedDevice::default()]
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            mode: SimulationMode::default(),
            seed: None,
            waveform: Waveform::default(),
            devices: default_devices(),
        }
    }
}

impl SppConfig {
    /// Load configuration from defaults, file and environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file: PathBuf = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let mut figment = Figment::from(Serialized::defaults(SppConfig::default()));
        if file.exists() {
            debug!(path = %file.display(), "Loading configuration file");
            figment = figment.merge(Toml::file(&file));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: SppConfig = figment
            .extract()
            .context("Failed to extract configuration")?;
        config
            .validate()
            .map_err(|e| anyhow!(e))
            .context("Configuration validation failed")?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        logging::parse_level(&self.logging.level)?;

        if self.simulated.devices.is_empty() {
            return Err("At least one simulated device is required".to_string());
        }

        let mut names = HashSet::new();
        for device in &self.simulated.devices {
            if device.name.trim().is_empty() || device.name.contains('/') {
                return Err(format!("Invalid device name '{}'", device.name));
            }
            if !names.insert(device.name.to_ascii_lowercase()) {
                return Err(format!("Duplicate device name: {}", device.name));
            }
            if device.ai_channels == 0 {
                return Err(format!(
                    "Device '{}' must have at least one analog input channel",
                    device.name
                ));
            }
            if !(device.max_voltage.is_finite() && device.max_voltage > 0.0) {
                return Err(format!(
                    "Device '{}' has invalid max_voltage {}. Must be positive",
                    device.name, device.max_voltage
                ));
            }
        }

        Ok(())
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Construct the configured backend.
    pub fn build_backend(&self) -> Result<Box<dyn DaqBackend>> {
        match self.backend.kind {
            BackendKind::Simulated => {
                let sim = &self.simulated;
                let backend = SimulatedBackend::builder()
                    .devices(sim.devices.iter().cloned())
                    .mode(sim.mode)
                    .waveform(sim.waveform)
                    .seed(sim.seed)
                    .build();
                Ok(Box::new(backend))
            }
            BackendKind::Daqmx => daqmx_backend(),
        }
    }
}

#[cfg(feature = "hardware")]
fn daqmx_backend() -> Result<Box<dyn DaqBackend>> {
    Ok(Box::new(crate::backend::DaqmxBackend::new()))
}

#[cfg(not(feature = "hardware"))]
fn daqmx_backend() -> Result<Box<dyn DaqBackend>> {
    bail!("The daqmx backend is not available: rebuild with `--features hardware`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = SppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend.kind, BackendKind::Simulated);
        assert_eq!(config.simulated.devices, vec![SimulatedDevice::default()]);
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let file = write_config(
            r#"
            [logging]
            level = "debug"
            format = "json"

            [simulated]
            mode = "realistic"
            waveform = "counter"
            seed = 9

            [[simulated.devices]]
            name = "PXI1Slot2"
            ai_channels = 16
            "#,
        );

        let config = SppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, logging::LogFormat::Json);
        assert_eq!(config.simulated.mode, SimulationMode::Realistic);
        assert_eq!(config.simulated.waveform, Waveform::Counter);
        assert_eq!(config.simulated.seed, Some(9));
        assert_eq!(config.simulated.devices.len(), 1);
        assert_eq!(config.simulated.devices[0].name, "PXI1Slot2");
        assert_eq!(config.simulated.devices[0].ai_channels, 16);
        assert_eq!(config.simulated.devices[0].max_voltage, 10.0);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let file = write_config("[logging]\nlevel = \"info\"\n");
        std::env::set_var("SPP_NIDAQ_LOGGING__LEVEL", "trace");
        let result = SppConfig::load(Some(file.path()));
        std::env::remove_var("SPP_NIDAQ_LOGGING__LEVEL");

        assert_eq!(result.unwrap().logging.level, "trace");
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        let err = SppConfig::load(Some(Path::new("/nonexistent/spp-nidaq.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_rejected() {
        let file = write_config("[logging]\nlevel = \"chatty\"\n");
        assert!(SppConfig::load(Some(file.path())).is_err());

        let file = write_config("[backend]\nkind = \"usb\"\n");
        assert!(SppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_device_validation() {
        let mut config = SppConfig::default();
        config.simulated.devices.push(SimulatedDevice::new("dev1"));
        assert!(config.validate().unwrap_err().contains("Duplicate device name"));

        let mut config = SppConfig::default();
        config.simulated.devices[0].ai_channels = 0;
        assert!(config.validate().is_err());

        let mut config = SppConfig::default();
        config.simulated.devices[0].max_voltage = -1.0;
        assert!(config.validate().is_err());

        let mut config = SppConfig::default();
        config.simulated.devices.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_output_reloads() {
        let mut config = SppConfig::default();
        config.simulated.seed = Some(3);
        let text = config.to_toml().unwrap();
        assert!(text.contains("[logging]"));
        assert!(text.contains("kind = \"simulated\""));

        let reparsed: SppConfig = toml::from_str(&text).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_build_simulated_backend() {
        let backend = SppConfig::default().build_backend().unwrap();
        assert_eq!(backend.name(), "simulated");
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn test_daqmx_requires_hardware_feature() {
        let mut config = SppConfig::default();
        config.backend.kind = BackendKind::Daqmx;
        let Err(err) = config.build_backend() else {
            panic!("daqmx backend built without the hardware feature");
        };
        assert!(err.to_string().contains("--features hardware"));
    }
}
