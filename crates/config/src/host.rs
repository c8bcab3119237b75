//! Host-level operating configuration: the bundler/object-store endpoints,
//! the debounce interval and the transport's maximum payload size. These are
//! operator-facing knobs, distinct from the per-session [`Options`](crate::options::Options)
//! an embedder passes to `construct`.

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Maximum payload size the transport will accept for a single publish, in
/// bytes. Spilling to object storage keeps every publish under this bound.
pub const MAX_PAYLOAD_BYTES: usize = 31_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub bundler_url: String,
    pub bundler_cdn_url: String,
    pub object_store_url: String,
    pub expo_api_url: String,
    pub debounce_interval_ms: u64,
    pub bundler_poll_interval_ms: u64,
    pub bundler_poll_max_attempts: u32,
    pub verbose: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bundler_url: "https://snackager.expo.io".to_string(),
            bundler_cdn_url: "https://ducts.expo.io".to_string(),
            object_store_url: "https://snack-code-uploads.s3.us-west-1.amazonaws.com".to_string(),
            expo_api_url: "https://exp.host".to_string(),
            debounce_interval_ms: 500,
            bundler_poll_interval_ms: 5_000,
            bundler_poll_max_attempts: 30,
            verbose: false,
        }
    }
}

impl HostConfig {
    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_interval_ms)
    }

    pub fn bundler_poll_interval(&self) -> Duration {
        Duration::from_millis(self.bundler_poll_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("bundler_url", &self.bundler_url),
            ("bundler_cdn_url", &self.bundler_cdn_url),
            ("object_store_url", &self.object_store_url),
            ("expo_api_url", &self.expo_api_url),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                exn::bail!(ErrorKind::Invalid(format!("{field} must be an http(s) URL, got {value:?}")));
            }
        }
        if self.debounce_interval_ms == 0 {
            exn::bail!(ErrorKind::Invalid("debounce_interval_ms must be positive".to_string()));
        }
        if self.bundler_poll_max_attempts == 0 {
            exn::bail!(ErrorKind::Invalid("bundler_poll_max_attempts must be positive".to_string()));
        }
        Ok(())
    }

    /// Locates the default config file, if one exists, under the platform's
    /// standard config directory (`~/.config/snack/config.toml` on Linux).
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "expo", "snack").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads configuration by layering, in increasing precedence: built-in
    /// defaults, an optional config file, then `SNACK_`-prefixed environment
    /// variables. The merged result is validated eagerly.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(HostConfig::default()));

        if let Some(path) = config_path.cloned().or_else(Self::default_config_path)
            && path.exists()
        {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(&path)),
                Some("json") => figment.merge(Json::file(&path)),
                _ => figment.merge(Toml::file(&path)),
            };
        }

        let config: HostConfig =
            figment.merge(Env::prefixed("SNACK_")).extract().or_raise(|| ErrorKind::Load("failed to extract host configuration".to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        assert!(HostConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_http_url() {
        let mut config = HostConfig::default();
        config.bundler_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_takes_precedence_over_file() {
        let mut file = NamedTempFile::with_suffix(".toml").expect("create temp config");
        writeln!(file, "debounce_interval_ms = 250").expect("write temp config");

        // SAFETY: test-only, single-threaded env mutation scoped to this test.
        unsafe { std::env::set_var("SNACK_DEBOUNCE_INTERVAL_MS", "750") };
        let config = HostConfig::load(Some(&file.path().to_path_buf())).expect("load config");
        unsafe { std::env::remove_var("SNACK_DEBOUNCE_INTERVAL_MS") };

        assert_eq!(config.debounce_interval_ms, 750);
    }

    #[test]
    fn file_override_is_applied_when_no_env_var_set() {
        let mut file = NamedTempFile::with_suffix(".toml").expect("create temp config");
        writeln!(file, "bundler_poll_max_attempts = 10").expect("write temp config");
        let config = HostConfig::load(Some(&file.path().to_path_buf())).expect("load config");
        assert_eq!(config.bundler_poll_max_attempts, 10);
    }
}
