//! Configuration management for ubicheck.
//!
//! Reads configuration from environment variables (a `.env` file is loaded
//! into the environment by `main` first). The full environment snapshot is
//! kept as well, because the build-system variables are recorded in the
//! run metadata.

use std::collections::BTreeMap;
use std::ffi::OsString;

/// Interpreter used when the ubireader console scripts are not on PATH.
pub const DEFAULT_PYTHON: &str = "python3";

/// Variable prefix of the build system whose settings are recorded.
pub const DEFAULT_ENV_PREFIX: &str = "BR2_";

/// ubicheck configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Python interpreter for `-m ubireader.scripts.*` (UBICHECK_PYTHON)
    pub python: String,
    /// Build-system variable prefix (UBICHECK_ENV_PREFIX)
    pub env_prefix: String,
    /// Every variable visible to the process, sorted by name.
    pub env: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Non-UTF-8 names and values are decoded lossily rather than
    /// aborting the run.
    pub fn load() -> Self {
        Self::from_vars(lossy_vars(std::env::vars_os()))
    }

    /// Build configuration from an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env: BTreeMap<String, String> = vars.into_iter().collect();

        let python = env
            .get("UBICHECK_PYTHON")
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_PYTHON.to_string());

        let env_prefix = env
            .get("UBICHECK_ENV_PREFIX")
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_ENV_PREFIX.to_string());

        Self {
            python,
            env_prefix,
            env,
        }
    }
}

fn lossy_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter().map(|(k, v)| {
        (
            k.to_string_lossy().into_owned(),
            v.to_string_lossy().into_owned(),
        )
    })
}
