//! Version resolution: a static override, or the first capture group of the
//! version regex applied to the version file.
use crate::config::Config;
use crate::error::{PublishError, Result};
use regex::Regex;
use std::fs;

pub fn resolve_version(config: &Config) -> Result<String> {
    if let Some(version) = &config.static_version {
        tracing::info!(%version, "using static version");
        return Ok(version.clone());
    }

    let path = config.version_file.as_path();
    if path != config.project_file && !path.is_file() {
        return Err(PublishError::VersionFileNotFound {
            path: path.to_path_buf(),
        });
    }
    tracing::info!(
        version_file = %path.display(),
        version_regex = %config.version_regex,
        "extracting version"
    );

    let content = fs::read_to_string(path).map_err(|err| PublishError::io("read", path, err))?;
    extract_version(&config.version_regex, &content).ok_or_else(|| {
        PublishError::VersionNotExtracted {
            path: path.to_path_buf(),
        }
    })
}

/// Capture group 1 of the first match; `None` when there is no match, no
/// such group, or the group matched nothing.
pub fn extract_version(regex: &Regex, content: &str) -> Option<String> {
    let captures = regex.captures(content)?;
    let version = captures.get(1)?.as_str();
    (!version.is_empty()).then(|| version.to_string())
}
