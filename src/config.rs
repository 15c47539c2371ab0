use crate::error::{AgroError, Result};
use crate::models::WeatherQuery;
use dialoguer::{Input, Password};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 8;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub weather: WeatherApiConfig,
    #[serde(default)]
    pub default_location: DefaultLocationConfig,
    #[serde(default)]
    pub ai: Option<GeminiConfig>,
    #[serde(default)]
    pub mail: Option<MailConfig>,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct WeatherApiConfig {
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl WeatherApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for WeatherApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherApiConfig")
            .field("api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Location queried for plots registered without coordinates.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DefaultLocationConfig {
    pub city: String,
    pub country: String,
}

impl DefaultLocationConfig {
    pub fn query(&self) -> WeatherQuery {
        WeatherQuery::Place {
            city: self.city.clone(),
            country: self.country.clone(),
        }
    }
}

impl Default for DefaultLocationConfig {
    fn default() -> Self {
        Self {
            city: "San Miguel".into(),
            country: "SV".into(),
        }
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("enabled", &self.enabled)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl MailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("from", &self.from)
            .field("enabled", &self.enabled)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_gemini_model() -> String {
    "gemini-2.5-pro".into()
}

impl Config {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => p,
            None => Self::find_config_path()?,
        };

        if !config_path.exists() {
            return Err(AgroError::Config(format!(
                "Config file not found at {:?}. Run `agrowatch init` to set up.",
                config_path
            )));
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| AgroError::Config(format!("Failed to read config: {}", e)))?;

        Self::parse(&config_str)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content)?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| AgroError::Config(format!("Failed to parse config: {}", e)))?;

        if config.weather.api_key.trim().is_empty() {
            return Err(AgroError::Config(
                "weather.api_key is empty - set WEATHER_API_KEY".into(),
            ));
        }

        Ok(config)
    }

    /// Search for config.yaml in standard locations.
    /// Returns the path of the first found config, or the XDG default path if none found.
    fn find_config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("agrowatch").join("config.yaml");
            if xdg_config.exists() {
                return Ok(xdg_config);
            }
        }

        Self::default_config_path()
    }

    /// Default path for writing new config files (~/.config/agrowatch/config.yaml).
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AgroError::Config("Cannot determine config directory".into()))?
            .join("agrowatch");
        Ok(config_dir.join("config.yaml"))
    }

    /// Run interactive setup prompts and write config to disk.
    /// Returns the loaded Config and the path it was written to.
    pub fn setup_interactive(target: Option<PathBuf>) -> Result<(Self, PathBuf)> {
        println!();
        println!("Let's set up agrowatch!");
        println!();

        println!("WeatherAPI");
        let weather_key: String = Password::new()
            .with_prompt("  API key")
            .interact()?;

        println!();

        println!("Default location (used for plots without coordinates)");
        let city: String = Input::new()
            .with_prompt("  City")
            .default("San Miguel".into())
            .interact_text()?;

        let country: String = Input::new()
            .with_prompt("  Country code")
            .default("SV".into())
            .interact_text()?;

        println!();

        println!("Gemini assistant (leave API key blank to skip)");
        let ai_key: String = Input::new()
            .with_prompt("  API key")
            .default(String::new())
            .allow_empty(true)
            .interact_text()?;

        let ai = if ai_key.is_empty() {
            None
        } else {
            Some(GeminiConfig {
                api_key: ai_key,
                model: default_gemini_model(),
                enabled: true,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            })
        };

        println!();

        println!("Mail relay (leave URL blank to skip notifications)");
        let mail_url: String = Input::new()
            .with_prompt("  URL")
            .default(String::new())
            .allow_empty(true)
            .interact_text()?;

        let mail = if mail_url.is_empty() {
            None
        } else {
            let api_key: String = Password::new()
                .with_prompt("  API key")
                .allow_empty_password(true)
                .interact()?;

            let from: String = Input::new()
                .with_prompt("  From address")
                .interact_text()?;

            Some(MailConfig {
                api_url: mail_url,
                api_key,
                from,
                enabled: true,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            })
        };

        println!();

        let config = Config {
            weather: WeatherApiConfig {
                api_key: weather_key,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            default_location: DefaultLocationConfig { city, country },
            ai,
            mail,
        };

        let config_path = match target {
            Some(p) => p,
            None => Self::default_config_path()?,
        };
        config.write_to(&config_path)?;

        println!("Configuration saved to {}", config_path.display());
        println!();

        Ok((config, config_path))
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)
            .map_err(|e| AgroError::Config(format!("Failed to serialize config: {}", e)))?;

        let content = format!(
            "# agrowatch configuration\n# Generated by `agrowatch init`\n# Environment variable substitution (${{VAR}}) is supported.\n\n{}",
            yaml
        );
        std::fs::write(path, content)?;
        Ok(())
    }

    fn substitute_env_vars(content: &str) -> Result<String> {
        let mut result = content.to_string();

        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| AgroError::Config(format!("Invalid substitution pattern: {}", e)))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        Ok(result)
    }

    pub fn data_dir(data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = data_dir_override {
            std::fs::create_dir_all(dir)?;
            return Ok(dir.clone());
        }

        if let Ok(dir) = std::env::var("AGROWATCH_DATA_DIR") {
            let p = PathBuf::from(dir);
            std::fs::create_dir_all(&p)?;
            return Ok(p);
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| AgroError::Config("Cannot determine data directory".into()))?
            .join("agrowatch");

        std::fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn db_path(data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        Ok(Self::data_dir(data_dir_override)?.join("agrowatch.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
weather:
  api_key: abc123
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.weather.timeout_secs, 8);
        assert_eq!(config.default_location.city, "San Miguel");
        assert_eq!(config.default_location.country, "SV");
        assert!(config.ai.is_none());
        assert!(config.mail.is_none());
    }

    #[test]
    fn full_config_parses() {
        let yaml = r#"
weather:
  api_key: abc123
  timeout_secs: 3
default_location:
  city: Santa Ana
  country: SV
ai:
  api_key: gem
mail:
  api_url: https://mail.example.com/send
  api_key: key
  from: alerts@example.com
  enabled: false
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.weather.timeout(), Duration::from_secs(3));
        let ai = config.ai.unwrap();
        assert_eq!(ai.model, "gemini-2.5-pro");
        assert!(ai.enabled);
        let mail = config.mail.unwrap();
        assert!(!mail.enabled);
        assert_eq!(mail.from, "alerts@example.com");
        assert_eq!(
            config.default_location.query(),
            WeatherQuery::Place {
                city: "Santa Ana".into(),
                country: "SV".into()
            }
        );
    }

    #[test]
    fn empty_weather_key_is_rejected() {
        let yaml = "weather:\n  api_key: \"\"\n";
        assert!(matches!(Config::parse(yaml), Err(AgroError::Config(_))));
    }

    #[test]
    fn env_vars_are_substituted() {
        std::env::set_var("AGROWATCH_TEST_WEATHER_KEY", "from-env");
        let yaml = "weather:\n  api_key: ${AGROWATCH_TEST_WEATHER_KEY}\n";
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.weather.api_key, "from-env");
    }

    #[test]
    fn unknown_env_vars_are_left_in_place() {
        let out = Config::substitute_env_vars("key: ${AGROWATCH_TEST_UNSET_VAR_XYZ}").unwrap();
        assert_eq!(out, "key: ${AGROWATCH_TEST_UNSET_VAR_XYZ}");
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = Config::parse(MINIMAL).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("abc123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn write_then_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = Config::parse(MINIMAL).unwrap();
        config.write_to(&path).unwrap();

        let loaded = Config::load(Some(path)).unwrap();
        assert_eq!(loaded.weather.api_key, "abc123");
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(dir.path().join("absent.yaml")));
        assert!(matches!(result, Err(AgroError::Config(_))));
    }

    #[test]
    fn data_dir_override_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data");
        let resolved = Config::data_dir(Some(&target)).unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
        assert_eq!(
            Config::db_path(Some(&target)).unwrap(),
            target.join("agrowatch.db")
        );
    }
}
