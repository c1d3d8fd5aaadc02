//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration: how to reach the remote scheduling system.
///
/// Run-specific settings (member, dates, caps, tickets) live in the params
/// file passed to each command, not here.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API host, e.g. `na.myconnectwise.net`.
    pub site: Option<String>,
    pub company: Option<String>,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub client_id: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("site", &self.site)
            .field("company", &self.company)
            .field("public_key", &self.public_key.as_ref().map(|_| "[REDACTED]"))
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TD_*)
        figment = figment.merge(Env::prefixed("TD_"));

        figment.extract()
    }

    /// Assembles API credentials, naming whatever is missing.
    pub fn credentials(&self) -> Result<td_api::ClientConfig> {
        let mut missing = Vec::new();
        let mut take = |value: &Option<String>, name: &'static str| {
            value.clone().unwrap_or_else(|| {
                missing.push(name);
                String::new()
            })
        };

        let credentials = td_api::ClientConfig {
            site: take(&self.site, "site"),
            company: take(&self.company, "company"),
            public_key: take(&self.public_key, "public_key"),
            private_key: take(&self.private_key, "private_key"),
            client_id: take(&self.client_id, "client_id"),
        };

        if missing.is_empty() {
            Ok(credentials)
        } else {
            bail!(
                "missing API credentials: {} (set TD_* environment variables or config.toml)",
                missing.join(", ")
            );
        }
    }
}

/// Returns the platform-specific config directory for td.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("td"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Config {
        Config {
            site: Some("na.myconnectwise.net".to_string()),
            company: Some("acme".to_string()),
            public_key: Some("pub-key-value".to_string()),
            private_key: Some("s3cret".to_string()),
            client_id: Some("client".to_string()),
        }
    }

    #[test]
    fn credentials_assemble_when_complete() {
        let credentials = full().credentials().unwrap();
        assert_eq!(credentials.site, "na.myconnectwise.net");
        assert_eq!(credentials.company, "acme");
    }

    #[test]
    fn credentials_name_every_missing_field() {
        let mut config = full();
        config.public_key = None;
        config.client_id = None;
        let err = config.credentials().unwrap_err().to_string();
        assert!(err.contains("public_key"));
        assert!(err.contains("client_id"));
        assert!(!err.contains("private_key"));
    }

    #[test]
    fn debug_redacts_keys() {
        let debug = format!("{:?}", full());
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("pub-key-value"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("na.myconnectwise.net"));
    }
}
