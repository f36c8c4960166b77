//! Source-control tagging of the published version.
use crate::ci::{OutputSink, OUTPUT_VERSION};
use crate::error::Result;
use crate::process::{CommandRunner, Invocation};

/// Replace the first `*` in `format` with `version`.
pub fn tag_name(format: &str, version: &str) -> String {
    format.replacen('*', version, 1)
}

/// Create and push the tag, then report it as the `VERSION` output.
pub fn tag_commit(
    runner: &dyn CommandRunner,
    git: &str,
    format: &str,
    version: &str,
    outputs: &OutputSink,
) -> Result<String> {
    let tag = tag_name(format, version);
    tracing::info!(%tag, "✨ creating new tag");

    runner.run(&Invocation::new(git).arg("tag").arg(&tag))?;
    runner.run(&Invocation::new(git).arg("push").arg("origin").arg(&tag))?;

    outputs.emit(OUTPUT_VERSION, &tag)?;
    Ok(tag)
}
