//! Logic for loading client configuration in to an object model
use std::path::Path;
use std::time::Duration;

use displaydoc::Display;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use typed_builder::TypedBuilder;

/// Environment variable consulted for the default endpoint.
pub const ENDPOINT_ENV: &str = "GRAPHQL_ENDPOINT";

const FALLBACK_ENDPOINT: &str = "http://127.0.0.1:4000/graphql";

/// Configuration loading errors.
#[derive(Error, Display, Debug)]
pub enum ConfigurationError {
    /// could not read configuration file '{path}': {error}
    Io {
        /// The file that could not be read.
        path: String,
        /// The underlying error.
        error: std::io::Error,
    },

    /// could not deserialize configuration: {0}
    Yaml(#[from] serde_yaml::Error),
}

/// The configuration for the client.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct Configuration {
    /// The url requests are posted to.
    /// Defaults to `$GRAPHQL_ENDPOINT`, then to http://127.0.0.1:4000/graphql
    #[serde(default = "default_endpoint")]
    #[builder(default = default_endpoint(), setter(into))]
    pub endpoint: String,

    /// Headers sent with every request.
    #[serde(default)]
    #[builder(default)]
    pub headers: IndexMap<String, String>,

    /// Request timeout, in humantime format (`30s`, `1m 30s`).
    #[serde(default, with = "humantime_serde")]
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,

    /// Check responses against the shape of the request before processing them.
    #[serde(default)]
    #[builder(default)]
    pub validate_response_shape: bool,
}

fn default_endpoint() -> String {
    std::env::var(ENDPOINT_ENV).unwrap_or_else(|_| FALLBACK_ENDPOINT.to_owned())
}

impl Default for Configuration {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Configuration {
    /// Parse a yaml document. An empty document yields the defaults.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigurationError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|error| ConfigurationError::Io {
            path: path.display().to_string(),
            error,
        })?;
        Self::from_yaml(&raw)
    }

    /// Apply per-request overrides.
    ///
    /// Scalar options are replaced. Headers are merged, an override replacing any
    /// header with the same name regardless of case.
    pub fn merged(&self, overrides: &ConfigurationOverrides) -> Configuration {
        let mut merged = self.clone();
        if let Some(endpoint) = &overrides.endpoint {
            merged.endpoint = endpoint.clone();
        }
        for (name, value) in &overrides.headers {
            merged
                .headers
                .retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            merged.headers.insert(name.clone(), value.clone());
        }
        if let Some(timeout) = overrides.timeout {
            merged.timeout = Some(timeout);
        }
        if let Some(validate) = overrides.validate_response_shape {
            merged.validate_response_shape = validate;
        }
        merged
    }
}

/// Options overriding the client configuration for a single request.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct ConfigurationOverrides {
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub endpoint: Option<String>,

    #[serde(default)]
    #[builder(default)]
    pub headers: IndexMap<String, String>,

    #[serde(default, with = "humantime_serde")]
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,

    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub validate_response_shape: Option<bool>,
}
