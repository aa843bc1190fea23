//! Layered configuration: defaults, config file, environment, flags.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use gantry_admin::{AdminConfig, DEFAULT_ADMIN_URL};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable overriding `admin_url`.
pub const ENV_ADMIN_URL: &str = "GANTRY_ADMIN_URL";
/// Environment variable overriding `timeout`, in seconds.
pub const ENV_TIMEOUT: &str = "GANTRY_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GantryConfig {
    /// Root of the gateway admin API.
    pub admin_url: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Extra headers sent with every admin request.
    pub headers: BTreeMap<String, String>,
    /// Credential plugins listed for every consumer when fetching state.
    pub credential_plugins: Vec<String>,
}

impl Default for GantryConfig {
    fn default() -> Self {
        Self {
            admin_url: DEFAULT_ADMIN_URL.to_string(),
            timeout: 30,
            headers: BTreeMap::new(),
            credential_plugins: ["key-auth", "basic-auth", "hmac-auth", "jwt", "oauth2"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl GantryConfig {
    /// Resolve the full layering. `lookup` reads environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer fails to load or the result is invalid.
    pub fn resolve(
        file: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
        admin_url: Option<&str>,
    ) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        if let Some(url) = admin_url {
            config.admin_url = url.to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, TOML unless the extension is `.json`. Absent keys
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))
        }
    }

    /// Override settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unparsable value.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(ENV_ADMIN_URL) {
            self.admin_url = value;
        }
        if let Some(value) = lookup(ENV_TIMEOUT) {
            self.timeout = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {ENV_TIMEOUT} value: {value}"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.timeout == 0 {
            bail!("timeout must be at least one second");
        }
        self.base_url().map(|_| ())
    }

    fn base_url(&self) -> Result<Url> {
        Url::parse(&self.admin_url).map_err(|e| anyhow!("Invalid admin URL {}: {e}", self.admin_url))
    }

    /// Settings for the admin client.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin URL is invalid.
    pub fn admin(&self) -> Result<AdminConfig> {
        let config = AdminConfig::new(self.base_url()?).timeout(Duration::from_secs(self.timeout));
        Ok(self
            .headers
            .iter()
            .fold(config, |config, (name, value)| config.header(name, value)))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Write;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_no_config_file_returns_defaults() {
        let config = GantryConfig::resolve(None, no_env, None).unwrap();
        assert_eq!(config, GantryConfig::default());
        assert_eq!(config.admin_url, "http://localhost:8001");
        assert_eq!(config.credential_plugins.len(), 5);
    }

    #[test]
    fn test_toml_file_merges_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "admin_url = \"http://gateway:8001\"\n\n[headers]\nKong-Admin-Token = \"secret\""
        )
        .unwrap();

        let config = GantryConfig::resolve(Some(file.path()), no_env, None).unwrap();
        assert_eq!(config.admin_url, "http://gateway:8001");
        assert_eq!(config.timeout, 30);
        assert_eq!(
            config.headers.get("Kong-Admin-Token").map(String::as_str),
            Some("secret")
        );
    }

    #[test]
    fn test_json_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"timeout": 5, "credential_plugins": ["jwt"]}}"#).unwrap();

        let config = GantryConfig::load(file.path()).unwrap();
        assert_eq!(config.timeout, 5);
        assert_eq!(config.credential_plugins, ["jwt"]);
    }

    #[test]
    fn test_env_then_flag_override_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "admin_url = \"http://from-file:8001\"\ntimeout = 10").unwrap();

        let env = |key: &str| match key {
            ENV_ADMIN_URL => Some("http://from-env:8001".to_string()),
            ENV_TIMEOUT => Some("7".to_string()),
            _ => None,
        };

        let config = GantryConfig::resolve(Some(file.path()), env, None).unwrap();
        assert_eq!(config.admin_url, "http://from-env:8001");
        assert_eq!(config.timeout, 7);

        let config =
            GantryConfig::resolve(Some(file.path()), env, Some("http://from-flag:8001")).unwrap();
        assert_eq!(config.admin_url, "http://from-flag:8001");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let env = |key: &str| (key == ENV_TIMEOUT).then(|| "soon".to_string());
        assert!(GantryConfig::resolve(None, env, None).is_err());
        assert!(GantryConfig::resolve(None, no_env, Some("not a url")).is_err());

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "timeout = \"thirty\"").unwrap();
        assert!(GantryConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_admin_config_carries_settings() {
        let mut config = GantryConfig::default();
        config.timeout = 3;
        config.headers.insert("X-Team".to_string(), "edge".to_string());

        let admin = config.admin().unwrap();
        assert_eq!(admin.timeout, Duration::from_secs(3));
        assert_eq!(admin.base_url.as_str(), "http://localhost:8001/");
        assert_eq!(admin.headers.get("X-Team").map(String::as_str), Some("edge"));
    }
}
