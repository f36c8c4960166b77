//! NuGet flat-container lookups.
//!
//! `GET {source}/v3-flatcontainer/{id}/index.json` answers 404 for a package
//! the registry has never seen and 200 with `{"versions": [...]}` otherwise.
use crate::error::{PublishError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};

/// Published versions of a package, as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryIndex {
    Unknown,
    Listed(Vec<String>),
}

impl RegistryIndex {
    /// Exact string match; no semantic version comparison.
    pub fn contains(&self, version: &str) -> bool {
        match self {
            RegistryIndex::Unknown => false,
            RegistryIndex::Listed(versions) => versions.iter().any(|v| v == version),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexBody {
    versions: Vec<String>,
}

pub trait RegistryLookup {
    fn index(&self, package: &str) -> Result<RegistryIndex>;
}

/// Blocking client for a NuGet v3 source.
pub struct NugetRegistry {
    base: String,
    agent: ureq::Agent,
    timeout: Duration,
}

impl NugetRegistry {
    pub fn new(base: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        NugetRegistry {
            base: base.trim_end_matches('/').to_string(),
            agent,
            timeout,
        }
    }
}

impl RegistryLookup for NugetRegistry {
    fn index(&self, package: &str) -> Result<RegistryIndex> {
        let url = index_url(&self.base, package);
        let start = Instant::now();
        let mut response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Timeout(_)) => {
                return Err(PublishError::Timeout {
                    what: format!("GET {url}"),
                    after: self.timeout,
                })
            }
            Err(err) => {
                return Err(PublishError::Network {
                    url,
                    message: err.to_string(),
                })
            }
        };
        let status = response.status().as_u16();
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            status,
            %url,
            "registry index fetched"
        );

        match status {
            404 => Ok(RegistryIndex::Unknown),
            200 => {
                let body: IndexBody = response.body_mut().read_json().map_err(|err| {
                    PublishError::RegistryBody {
                        url: url.clone(),
                        message: err.to_string(),
                    }
                })?;
                Ok(RegistryIndex::Listed(body.versions))
            }
            status => Err(PublishError::RegistryStatus { url, status }),
        }
    }
}

pub fn index_url(base: &str, package: &str) -> String {
    format!(
        "{}/v3-flatcontainer/{}/index.json",
        base.trim_end_matches('/'),
        package.to_lowercase()
    )
}

/// Publish endpoint handed to `dotnet nuget push --source`.
pub fn push_source(base: &str) -> String {
    format!("{}/v3/index.json", base.trim_end_matches('/'))
}

/// Package id from the project file name with its last extension removed.
pub fn derive_package_name(project_file: &Path) -> Option<String> {
    project_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}
