//! Shared test infrastructure for integration tests.
//!
//! Runs the built `nupub` binary against a project in a temp directory, with
//! shell-script stand-ins for `dotnet` and `git` and a `wiremock` registry.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAKE_DOTNET: &str = r#"#!/bin/sh
echo "dotnet $*" >> "$NUPUB_FAKE_LOG"
case "$1" in
  pack)
    mkdir -p "$NUPUB_FAKE_PACK_DIR"
    : > "$NUPUB_FAKE_PACK_DIR/$NUPUB_FAKE_PACKAGE"
    ;;
  nuget)
    printf '%s\n' "$NUPUB_FAKE_PUSH_OUTPUT"
    exit "${NUPUB_FAKE_PUSH_EXIT:-0}"
    ;;
esac
exit 0
"#;

const FAKE_GIT: &str = r#"#!/bin/sh
echo "git $*" >> "$NUPUB_FAKE_LOG"
exit 0
"#;

/// Flat-container index path for the `Foo.csproj` fixture project.
pub const INDEX_PATH: &str = "/v3-flatcontainer/foo/index.json";

/// Registry answering exactly one `GET` of the fixture package index.
pub struct StubRegistry {
    pub base_url: String,
    server: MockServer,
    runtime: Runtime,
}

impl StubRegistry {
    pub fn start(status: u16, body: &str) -> Self {
        let runtime = Runtime::new().expect("tokio runtime");
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path(INDEX_PATH))
                .respond_with(
                    ResponseTemplate::new(status).set_body_raw(body.to_string(), "application/json"),
                )
                .expect(1)
                .mount(&server)
                .await;
            server
        });
        Self {
            base_url: server.uri(),
            server,
            runtime,
        }
    }

    /// Paths of the requests the registry received, in order.
    pub fn requests(&self) -> Vec<String> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .iter()
            .map(|request| request.url.path().to_string())
            .collect()
    }
}

/// A project directory plus fake tools and the environment for one run.
pub struct Project {
    pub dir: TempDir,
    env: Vec<(String, String)>,
}

impl Project {
    /// `Foo.csproj` declaring `version`, with fake tools installed.
    pub fn new(version: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("Foo.csproj"),
            format!(
                "<Project Sdk=\"Microsoft.NET.Sdk\">\n  <PropertyGroup>\n    <Version>{version}</Version>\n  </PropertyGroup>\n</Project>\n"
            ),
        )
        .expect("write project");
        install_script(&dir.path().join("tools/dotnet"), FAKE_DOTNET);
        install_script(&dir.path().join("tools/git"), FAKE_GIT);

        let mut project = Self {
            env: Vec::new(),
            dir,
        };
        let root = project.dir.path().to_path_buf();
        project
            .set("INPUT_PROJECT_FILE_PATH", &root.join("Foo.csproj").display().to_string())
            .set("GITHUB_OUTPUT", &root.join("github_output").display().to_string())
            .set("NUPUB_FAKE_LOG", &root.join("calls.log").display().to_string())
            .set("NUPUB_FAKE_PACK_DIR", &root.join("bin/Release").display().to_string())
            .set("NUPUB_FAKE_PACKAGE", &format!("Foo.{version}.nupkg"))
            .set("NUPUB_FAKE_PUSH_OUTPUT", "Your package was pushed.");
        project
    }

    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.retain(|(existing, _)| existing != key);
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Run `nupub` with only this project's environment plus `PATH`.
    pub fn run(&self) -> Output {
        let tools = self.root().join("tools");
        let mut command = Command::new(env!("CARGO_BIN_EXE_nupub"));
        command
            .arg("--dotnet")
            .arg(tools.join("dotnet"))
            .arg("--git")
            .arg(tools.join("git"))
            .env_clear()
            .env("PATH", std::env::var_os("PATH").unwrap_or_default())
            .env("RUST_LOG", "nupub=info")
            .current_dir(self.root());
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command.output().expect("run nupub")
    }

    /// External commands the fake tools saw, one per line.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.root().join("calls.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn outputs(&self) -> String {
        fs::read_to_string(self.root().join("github_output")).unwrap_or_default()
    }

    pub fn package_path(&self, name: &str) -> PathBuf {
        self.root().join("bin/Release").join(name)
    }
}

fn install_script(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().expect("script parent")).expect("create tools dir");
    fs::write(path, contents).expect("write script");
    let mut perms = fs::metadata(path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod script");
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
