//! Runtime settings read from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;

use crate::error::Result;
use crate::fonts::FONTS_DIR_ENV;
use crate::recommend::{HttpRecommendationClient, DEFAULT_TIMEOUT};

pub const DATA_DIR_ENV: &str = "AURINE_DATA_DIR";
pub const OUTPUT_DIR_ENV: &str = "AURINE_OUTPUT_DIR";
pub const LOGO_PATH_ENV: &str = "AURINE_LOGO_PATH";
pub const RECOMMENDATIONS_URL_ENV: &str = "AURINE_RECOMMENDATIONS_URL";
pub const RECOMMENDATIONS_API_KEY_ENV: &str = "AURINE_RECOMMENDATIONS_API_KEY";
pub const RECOMMENDATIONS_TIMEOUT_ENV: &str = "AURINE_RECOMMENDATIONS_TIMEOUT_SECS";

const DEFAULT_DATA_DIR: &str = ".aurine";
const DEFAULT_OUTPUT_DIR: &str = ".";

/// Settings shared by the CLI commands.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Explicit font directory; `None` lets [`crate::fonts`] search the usual places.
    pub fonts_dir: Option<PathBuf>,
    /// Directory holding `documentHistory.json`.
    pub data_dir: PathBuf,
    /// Where exported files are written.
    pub output_dir: PathBuf,
    /// Logo drawn in document headers.
    pub logo_path: Option<PathBuf>,
    /// Recommendation service endpoint; without it the default bullets are used.
    pub recommendations_url: Option<String>,
    pub recommendations_api_key: Option<String>,
    pub recommendations_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fonts_dir: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            logo_path: None,
            recommendations_url: None,
            recommendations_api_key: None,
            recommendations_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Reads every `AURINE_*` variable, keeping defaults for unset or blank ones.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let recommendations_timeout = match value(RECOMMENDATIONS_TIMEOUT_ENV) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(
                        "Ignoring {}={:?}; expected a positive number of seconds",
                        RECOMMENDATIONS_TIMEOUT_ENV, raw
                    );
                    defaults.recommendations_timeout
                }
            },
            None => defaults.recommendations_timeout,
        };

        Self {
            fonts_dir: value(FONTS_DIR_ENV).map(PathBuf::from),
            data_dir: value(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            output_dir: value(OUTPUT_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            logo_path: value(LOGO_PATH_ENV).map(PathBuf::from),
            recommendations_url: value(RECOMMENDATIONS_URL_ENV),
            recommendations_api_key: value(RECOMMENDATIONS_API_KEY_ENV),
            recommendations_timeout,
        }
    }

    /// Builds the HTTP recommendation client when an endpoint is configured.
    pub fn recommendation_client(&self) -> Result<Option<HttpRecommendationClient>> {
        let Some(url) = &self.recommendations_url else {
            return Ok(None);
        };
        let mut client =
            HttpRecommendationClient::with_timeout(url.clone(), self.recommendations_timeout)?;
        if let Some(key) = &self.recommendations_api_key {
            client = client.with_api_key(key.clone());
        }
        Ok(Some(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn unset_variables_keep_defaults() {
        assert_eq!(config(&[]), Config::default());
        assert_eq!(config(&[(OUTPUT_DIR_ENV, "   ")]).output_dir, PathBuf::from("."));
    }

    #[test]
    fn variables_override_defaults() {
        let config = config(&[
            (DATA_DIR_ENV, "/var/lib/aurine"),
            (RECOMMENDATIONS_URL_ENV, "http://localhost:9000/recommend"),
            (RECOMMENDATIONS_TIMEOUT_ENV, "5"),
        ]);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/aurine"));
        assert_eq!(
            config.recommendations_url.as_deref(),
            Some("http://localhost:9000/recommend")
        );
        assert_eq!(config.recommendations_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_timeout_falls_back() {
        let config = config(&[(RECOMMENDATIONS_TIMEOUT_ENV, "soon")]);
        assert_eq!(config.recommendations_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn client_only_exists_with_an_endpoint() {
        assert!(config(&[]).recommendation_client().expect("client").is_none());
    }
}
