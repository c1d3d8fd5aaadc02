//! CLI subcommand implementations.

pub mod calendar;
pub mod dispatch;
pub mod tickets;

use std::path::Path;

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Format, Toml};
use td_core::DispatchParams;

use crate::Config;

/// Builds the API client from configuration.
fn client(config: &Config) -> Result<td_api::Client> {
    let credentials = config.credentials()?;
    td_api::Client::new(&credentials).context("failed to create API client")
}

/// Loads and validates run parameters from a TOML file.
pub fn load_params(path: &Path) -> Result<DispatchParams> {
    if !path.exists() {
        bail!("params file {} not found", path.display());
    }
    let params: DispatchParams = Figment::from(Toml::file(path))
        .extract()
        .with_context(|| format!("failed to load dispatch parameters from {}", path.display()))?;
    params.validate()?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use td_core::{ActivityPolicy, DuplicatePolicy};

    use super::*;

    fn write_params(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("params.toml");
        std::fs::write(&path, content).unwrap();
        (temp, path)
    }

    #[test]
    fn params_load_from_toml() {
        let (_temp, path) = write_params(
            r#"
            member = "tchristensen"
            start_date = "2017-07-12"
            end_date = "2017-07-14"
            timezone = "America/Los_Angeles"
            daily_cap = 9.0
            total_cap = 10.0
            activity = true
            duplicates = "subtract"
            dry_run = true

            [[tickets]]
            id = "339429"

            [[tickets]]
            id = "340224"
            hours = 4.0
            "#,
        );

        let params = load_params(&path).unwrap();
        assert_eq!(params.member.as_str(), "tchristensen");
        assert_eq!(params.timezone, chrono_tz::America::Los_Angeles);
        assert_eq!(params.activity, ActivityPolicy::BuiltinFilter);
        assert_eq!(params.duplicates, DuplicatePolicy::Subtract);
        assert_eq!(params.tickets.len(), 2);
        assert_eq!(params.tickets[1].hours, Some(4.0));
        assert!(params.dry_run);
    }

    #[test]
    fn params_accept_status_list_activity() {
        let (_temp, path) = write_params(
            r#"
            member = "tchristensen"
            start_date = "2017-07-12"
            timezone = "UTC"
            activity = ["new", "in progress"]

            [[tickets]]
            id = "339429"
            "#,
        );

        let params = load_params(&path).unwrap();
        assert!(matches!(params.activity, ActivityPolicy::AnyOf(_)));
    }

    #[test]
    fn unknown_duplicate_policy_is_a_config_error() {
        let (_temp, path) = write_params(
            r#"
            member = "tchristensen"
            start_date = "2017-07-12"
            timezone = "UTC"
            duplicates = "replace"

            [[tickets]]
            id = "339429"
            "#,
        );

        let err = load_params(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load dispatch parameters"));
    }

    #[test]
    fn missing_params_file_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let err = load_params(&temp.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn invalid_caps_are_rejected_at_load() {
        let (_temp, path) = write_params(
            r#"
            member = "tchristensen"
            start_date = "2017-07-12"
            timezone = "UTC"
            daily_cap = 0.0

            [[tickets]]
            id = "339429"
            "#,
        );
        assert!(load_params(&path).is_err());
    }
}
