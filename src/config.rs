//! Run configuration resolved from CI inputs.
//!
//! Inputs arrive as environment variables. Most are accepted under two
//! names, `INPUT_<NAME>` (set by the CI runner) and the bare `<NAME>`; the
//! first non-empty value wins. The resulting [`Config`] is built once and
//! never mutated afterwards.
use crate::error::{PublishError, Result};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_VERSION_REGEX: &str = r"^\s*<Version>(.*)</Version>\s*$";
pub const DEFAULT_TAG_FORMAT: &str = "v*";
pub const DEFAULT_NUGET_SOURCE: &str = "https://api.nuget.org";
pub const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30 * 60;

/// Read access to named variables; the process environment in production.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub project_file: PathBuf,
    pub configuration: Option<String>,
    pub platform: Option<String>,
    pub package_name: Option<String>,
    pub version_file: PathBuf,
    pub version_regex: Regex,
    pub static_version: Option<String>,
    pub tag_commit: bool,
    pub tag_format: String,
    pub nuget_key: Option<String>,
    pub nuget_source: String,
    pub nuspec_file: Option<String>,
    pub include_symbols: bool,
    pub registry_timeout: Duration,
    pub command_timeout: Duration,
    /// Treat any `error` line in push output as fatal even on exit code 0.
    pub fail_on_error_output: bool,
    /// File receiving `KEY=value` outputs; legacy stdout commands when unset.
    pub output_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env(env: &impl EnvSource) -> Result<Self> {
        let inputs = Inputs { env };

        let project_file = inputs
            .prefixed("PROJECT_FILE_PATH")
            .map(PathBuf::from)
            .ok_or(PublishError::MissingInput {
                name: "PROJECT_FILE_PATH",
            })?;
        let version_file = inputs
            .either("VERSION_FILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| project_file.clone());

        let regex_raw = inputs
            .either("VERSION_REGEX")
            .unwrap_or_else(|| DEFAULT_VERSION_REGEX.to_string());
        let version_regex = RegexBuilder::new(&regex_raw)
            .multi_line(true)
            .build()
            .map_err(|err| PublishError::invalid("VERSION_REGEX", &regex_raw, err))?;

        Ok(Config {
            project_file,
            configuration: inputs.prefixed("BUILD_CONFIGURATION"),
            platform: inputs.prefixed("BUILD_PLATFORM"),
            package_name: inputs.either("PACKAGE_NAME"),
            version_file,
            version_regex,
            static_version: inputs.either("VERSION_STATIC"),
            tag_commit: inputs.flag("TAG_COMMIT", true)?,
            tag_format: inputs
                .either("TAG_FORMAT")
                .unwrap_or_else(|| DEFAULT_TAG_FORMAT.to_string()),
            nuget_key: inputs.either("NUGET_KEY"),
            nuget_source: inputs
                .either("NUGET_SOURCE")
                .unwrap_or_else(|| DEFAULT_NUGET_SOURCE.to_string()),
            nuspec_file: inputs.prefixed("NUSPEC_FILE"),
            include_symbols: inputs.flag("INCLUDE_SYMBOLS", false)?,
            registry_timeout: inputs.seconds("REGISTRY_TIMEOUT", DEFAULT_REGISTRY_TIMEOUT_SECS)?,
            command_timeout: inputs.seconds("COMMAND_TIMEOUT", DEFAULT_COMMAND_TIMEOUT_SECS)?,
            fail_on_error_output: inputs.flag("FAIL_ON_ERROR_OUTPUT", false)?,
            output_file: inputs.plain("GITHUB_OUTPUT").map(PathBuf::from),
        })
    }

    /// Registry base URL without a trailing slash.
    pub fn source_base(&self) -> &str {
        self.nuget_source.trim_end_matches('/')
    }
}

struct Inputs<'a, E> {
    env: &'a E,
}

impl<E: EnvSource> Inputs<'_, E> {
    fn plain(&self, key: &str) -> Option<String> {
        self.env.var(key).filter(|value| !value.is_empty())
    }

    fn prefixed(&self, name: &str) -> Option<String> {
        self.plain(&format!("INPUT_{name}"))
    }

    fn either(&self, name: &str) -> Option<String> {
        self.prefixed(name).or_else(|| self.plain(name))
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool> {
        let Some(raw) = self.either(name) else {
            return Ok(default);
        };
        serde_json::from_str::<bool>(raw.trim())
            .map_err(|_| PublishError::invalid(name, &raw, "expected true or false"))
    }

    fn seconds(&self, name: &'static str, default: u64) -> Result<Duration> {
        let Some(raw) = self.either(name) else {
            return Ok(Duration::from_secs(default));
        };
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(PublishError::invalid(
                name,
                &raw,
                "expected a positive number of seconds",
            )),
        }
    }
}
