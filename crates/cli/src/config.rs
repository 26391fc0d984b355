//! Runner configuration file for `bqspec`.
//!
//! # Example
//!
//! ```toml
//! [bigquery]
//! project = "my-project"
//! location = "EU"
//! timeout_secs = 120
//! max_results = 10000
//! # endpoint = "http://localhost:9050/bigquery/v2"
//! ```
//!
//! The access token is never read from the file: it comes from
//! `BQSPEC_ACCESS_TOKEN`, falling back to `GOOGLE_OAUTH_ACCESS_TOKEN`.

use std::path::Path;
use std::time::Duration;

use bqspec_eval::BigQueryConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "bqspec.toml";

const TOKEN_VARS: &[&str] = &["BQSPEC_ACCESS_TOKEN", "GOOGLE_OAUTH_ACCESS_TOKEN"];
const PROJECT_VAR: &str = "GOOGLE_CLOUD_PROJECT";

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub bigquery: BigQuerySettings,
}

/// `[bigquery]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BigQuerySettings {
    pub project: Option<String>,
    /// REST base URL, for emulators and proxies.
    pub endpoint: Option<String>,
    pub location: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_results: Option<u32>,
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Load the configuration.
///
/// An explicit path must exist. Without one, `bqspec.toml` in the working
/// directory is used when present, otherwise defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, String> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                read_config(default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Read and parse a config TOML file from `path`.
pub fn read_config(path: &Path) -> Result<Config, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), "loaded config");
    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

/// Resolve BigQuery connection settings from the process environment.
pub fn resolve_bigquery(
    config: &Config,
    project_flag: Option<&str>,
) -> Result<BigQueryConfig, String> {
    resolve_bigquery_with(config, project_flag, |name| std::env::var(name).ok())
}

/// Resolve connection settings with an explicit environment lookup.
///
/// Project precedence: `--project`, config file, `GOOGLE_CLOUD_PROJECT`.
pub fn resolve_bigquery_with(
    config: &Config,
    project_flag: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<BigQueryConfig, String> {
    let settings = &config.bigquery;

    let project = project_flag
        .map(str::to_string)
        .or_else(|| settings.project.clone())
        .or_else(|| env(PROJECT_VAR))
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            format!(
                "no BigQuery project: pass --project, set [bigquery] project in {} or set {}",
                DEFAULT_CONFIG_FILE, PROJECT_VAR
            )
        })?;

    let access_token = TOKEN_VARS
        .iter()
        .find_map(|var| env(var).filter(|t| !t.is_empty()))
        .ok_or_else(|| format!("no access token: set {}", TOKEN_VARS.join(" or ")))?;

    let mut resolved = BigQueryConfig::new(project, access_token);
    if let Some(endpoint) = &settings.endpoint {
        resolved.endpoint = endpoint.clone();
    }
    resolved.location = settings.location.clone();
    if let Some(secs) = settings.timeout_secs {
        resolved.timeout = Duration::from_secs(secs);
    }
    resolved.max_results = settings.max_results;
    Ok(resolved)
}
