//! CLI argument parsing.
//!
//! The run itself is driven by CI inputs in the environment; flags only pick
//! the external programs and the log level.
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "nupub",
    version,
    about = "Build, pack and publish a NuGet package when its version is new",
    after_help = "Inputs are read from INPUT_<NAME> or <NAME> environment variables:\n  PROJECT_FILE_PATH, BUILD_CONFIGURATION, BUILD_PLATFORM, PACKAGE_NAME,\n  VERSION_FILE_PATH, VERSION_REGEX, VERSION_STATIC, TAG_COMMIT, TAG_FORMAT,\n  NUGET_KEY, NUGET_SOURCE, NUSPEC_FILE, INCLUDE_SYMBOLS, REGISTRY_TIMEOUT,\n  COMMAND_TIMEOUT, FAIL_ON_ERROR_OUTPUT\n\nOutputs go to $GITHUB_OUTPUT when set, otherwise ::set-output commands."
)]
pub struct RootArgs {
    /// Program used for build, pack and push
    #[arg(long, value_name = "PATH", default_value = "dotnet")]
    pub dotnet: String,

    /// Program used to create and push the tag
    #[arg(long, value_name = "PATH", default_value = "git")]
    pub git: String,

    /// Emit debug logs (RUST_LOG overrides)
    #[arg(long, short)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_defaults() {
        let args = RootArgs::try_parse_from(["nupub"]).expect("parse");
        assert_eq!(args.dotnet, "dotnet");
        assert_eq!(args.git, "git");
        assert!(!args.verbose);
    }

    #[test]
    fn tool_overrides() {
        let args = RootArgs::try_parse_from(["nupub", "--dotnet", "/opt/dotnet/dotnet", "-v"])
            .expect("parse");
        assert_eq!(args.dotnet, "/opt/dotnet/dotnet");
        assert!(args.verbose);
    }
}
