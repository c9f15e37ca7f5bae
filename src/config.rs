use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub audio: AudioConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
}

/// Audio playback configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BACKEND_URL.to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CHARLA_BACKEND_URL → backend.base_url
    /// - CHARLA_AUDIO_DEVICE → audio.device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("CHARLA_BACKEND_URL")
            && !url.is_empty()
        {
            self.backend.base_url = url;
        }

        if let Ok(device) = std::env::var("CHARLA_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/charla/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("charla")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_charla_env() {
        remove_env("CHARLA_BACKEND_URL");
        remove_env("CHARLA_AUDIO_DEVICE");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, defaults::BACKEND_URL);
        assert_eq!(config.audio.device, None);
        assert_eq!(config.audio.sample_rate, 24_000);
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [backend]
            base_url = "https://tutor.example.com"

            [audio]
            device = "pipewire"
            sample_rate = 48000
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.backend.base_url, "https://tutor.example.com");
        assert_eq!(config.audio.device, Some("pipewire".to_string()));
        assert_eq!(config.audio.sample_rate, 48000);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [backend]
            base_url = "http://10.0.0.2:5000"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.backend.base_url, "http://10.0.0.2:5000");
        assert_eq!(config.audio.device, None);
        assert_eq!(config.audio.sample_rate, 24_000);
    }

    #[test]
    fn test_env_override_backend_url() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_charla_env();

        set_env("CHARLA_BACKEND_URL", "http://192.168.1.10:5000");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.backend.base_url, "http://192.168.1.10:5000");
        assert_eq!(config.audio.device, None); // Not overridden

        clear_charla_env();
    }

    #[test]
    fn test_env_override_device() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_charla_env();

        set_env("CHARLA_AUDIO_DEVICE", "pulse");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.audio.device, Some("pulse".to_string()));

        clear_charla_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_charla_env();

        set_env("CHARLA_BACKEND_URL", "");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.backend.base_url, defaults::BACKEND_URL);

        clear_charla_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [backend
            base_url = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();

        assert!(path_str.contains(".config"));
        assert!(path_str.contains("charla"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_charla_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_fails_on_invalid_toml() {
        let invalid_toml = r#"
            [backend
            base_url = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(Config::load_or_default(temp_file.path()).is_err());
    }
}
