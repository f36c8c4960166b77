//! The publish run: version, registry check, then build, pack, push and tag
//! when the version is new.
use crate::ci::{
    warning_annotation, OutputSink, OUTPUT_PACKAGE_NAME, OUTPUT_PACKAGE_PATH,
    OUTPUT_SYMBOLS_PACKAGE_NAME, OUTPUT_SYMBOLS_PACKAGE_PATH,
};
use crate::config::Config;
use crate::dotnet;
use crate::error::{PublishError, Result};
use crate::process::{Captured, CommandRunner};
use crate::registry::{derive_package_name, RegistryLookup};
use crate::scan::{remove_stale_packages, ArtifactSet};
use crate::tagger::tag_commit;
use crate::version::resolve_version;
use std::path::Path;

/// Programs used for the external steps.
#[derive(Debug, Clone)]
pub struct Tools {
    pub dotnet: String,
    pub git: String,
}

#[derive(Debug)]
pub enum Outcome {
    /// The registry already lists this version; nothing ran.
    AlreadyPublished { package: String, version: String },
    /// Built and packed, but no API key was configured.
    PackedOnly {
        package: String,
        version: String,
        artifacts: ArtifactSet,
    },
    Published {
        package: String,
        version: String,
        artifacts: ArtifactSet,
        tag: Option<String>,
    },
}

pub struct Publisher<'a> {
    pub config: &'a Config,
    pub registry: &'a dyn RegistryLookup,
    pub runner: &'a dyn CommandRunner,
    pub tools: &'a Tools,
    pub outputs: OutputSink,
}

impl Publisher<'_> {
    pub fn run(&self) -> Result<Outcome> {
        let project = self.config.project_file.as_path();
        if !project.is_file() {
            return Err(PublishError::ProjectFileNotFound {
                path: project.to_path_buf(),
            });
        }
        tracing::info!(project = %project.display(), "project file");

        let version = resolve_version(self.config)?;
        tracing::info!(%version, "version");

        let package = match &self.config.package_name {
            Some(name) => name.clone(),
            None => derive_package_name(project).ok_or_else(|| {
                PublishError::invalid(
                    "PACKAGE_NAME",
                    "",
                    "cannot derive a package name from the project file",
                )
            })?,
        };
        tracing::info!(%package, "package name");

        let index = self.registry.index(&package)?;
        if index.contains(&version) {
            tracing::info!(%package, %version, "version already exists, nothing to publish");
            return Ok(Outcome::AlreadyPublished { package, version });
        }
        tracing::info!(%package, %version, "✨ found new version");

        self.build_and_publish(package, version)
    }

    fn build_and_publish(&self, package: String, version: String) -> Result<Outcome> {
        let config = self.config;
        let dotnet = self.tools.dotnet.as_str();
        let project_dir = project_dir(&config.project_file);

        let removed = remove_stale_packages(project_dir)?;
        tracing::debug!(count = removed.len(), "stale packages removed");

        self.runner.run(&dotnet::build(dotnet, config))?;
        self.runner.run(&dotnet::pack(dotnet, config))?;

        let artifacts = ArtifactSet::discover(project_dir)?;
        let generated: Vec<String> = artifacts
            .all()
            .map(|path| path.display().to_string())
            .collect();
        tracing::info!(packages = %generated.join(", "), "generated package(s)");
        if artifacts.packages.is_empty() {
            return Err(PublishError::NoPackage {
                dir: project_dir.to_path_buf(),
            });
        }

        let Some(api_key) = config.nuget_key.as_deref() else {
            let message = "NUGET_KEY not given";
            println!("{}", warning_annotation(message));
            tracing::warn!("{message}, skipping push");
            return Ok(Outcome::PackedOnly {
                package,
                version,
                artifacts,
            });
        };

        tracing::info!(source = %config.source_base(), "pushing to registry");
        for path in &artifacts.packages {
            let captured = self.runner.capture(&dotnet::push(dotnet, config, path, api_key))?;
            print!("{}", captured.output);
            self.check_push(&captured)?;
        }

        self.emit_artifact_outputs(&artifacts)?;

        let tag = if config.tag_commit {
            Some(tag_commit(
                self.runner,
                &self.tools.git,
                &config.tag_format,
                &version,
                &self.outputs,
            )?)
        } else {
            None
        };

        Ok(Outcome::Published {
            package,
            version,
            artifacts,
            tag,
        })
    }

    /// A failed push is fatal. An `error` line in a successful push is only
    /// fatal when strict output scanning is enabled.
    fn check_push(&self, captured: &Captured) -> Result<()> {
        let error_line = first_error_line(&captured.output);
        if !captured.success {
            let message = error_line
                .map(str::to_string)
                .unwrap_or_else(|| format!("dotnet nuget push failed with {}", captured.status));
            return Err(PublishError::PublishRejected { message });
        }
        if let Some(line) = error_line {
            if self.config.fail_on_error_output {
                return Err(PublishError::PublishRejected {
                    message: line.to_string(),
                });
            }
            println!("{}", warning_annotation(line));
            tracing::warn!(line, "push succeeded but reported an error line");
        }
        Ok(())
    }

    fn emit_artifact_outputs(&self, artifacts: &ArtifactSet) -> Result<()> {
        if let Some(package) = artifacts.primary() {
            self.outputs.emit(OUTPUT_PACKAGE_NAME, &file_name(package))?;
            self.outputs
                .emit(OUTPUT_PACKAGE_PATH, &package.display().to_string())?;
        }
        if let Some(symbols) = artifacts.symbols_package() {
            self.outputs
                .emit(OUTPUT_SYMBOLS_PACKAGE_NAME, &file_name(symbols))?;
            self.outputs
                .emit(OUTPUT_SYMBOLS_PACKAGE_PATH, &symbols.display().to_string())?;
        }
        Ok(())
    }
}

fn project_dir(project_file: &Path) -> &Path {
    project_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Text from the first `error` to the end of its line.
pub fn first_error_line(output: &str) -> Option<&str> {
    let start = output.find("error")?;
    let rest = &output[start..];
    let end = rest.find(|c: char| c == '\n' || c == '\r').unwrap_or(rest.len());
    Some(&rest[..end])
}
