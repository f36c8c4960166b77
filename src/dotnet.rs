//! Argument lists for the `dotnet` build, pack and push steps.
use crate::config::Config;
use crate::process::Invocation;
use crate::registry::push_source;
use std::path::Path;

fn project_arg(config: &Config) -> String {
    config.project_file.display().to_string()
}

fn with_platform(invocation: Invocation, config: &Config) -> Invocation {
    match &config.platform {
        Some(platform) => invocation.arg(format!("-property:Platform={platform}")),
        None => invocation,
    }
}

pub fn build(dotnet: &str, config: &Config) -> Invocation {
    let invocation = Invocation::new(dotnet)
        .arg("build")
        .opt_pair("--configuration", config.configuration.as_deref())
        .arg(project_arg(config));
    with_platform(invocation, config)
}

pub fn pack(dotnet: &str, config: &Config) -> Invocation {
    let mut invocation = Invocation::new(dotnet).arg("pack");
    if config.include_symbols {
        invocation = invocation
            .arg("--include-symbols")
            .arg("-property:SymbolPackageFormat=snupkg");
    }
    if let Some(nuspec) = &config.nuspec_file {
        invocation = invocation.arg(format!("-property:NuspecFile={nuspec}"));
    }
    let invocation = invocation
        .arg("--no-build")
        .opt_pair("--configuration", config.configuration.as_deref())
        .arg(project_arg(config));
    with_platform(invocation, config)
}

pub fn push(dotnet: &str, config: &Config, package: &Path, api_key: &str) -> Invocation {
    let invocation = Invocation::new(dotnet)
        .arg("nuget")
        .arg("push")
        .arg(package.display().to_string())
        .arg("--source")
        .arg(push_source(config.source_base()))
        .arg("--api-key")
        .secret(api_key)
        .arg("--skip-duplicate");
    if config.include_symbols {
        invocation
    } else {
        invocation.arg("--no-symbols")
    }
}
