//! CI runner conventions: log annotations and step outputs.
use crate::error::{PublishError, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

pub const OUTPUT_VERSION: &str = "VERSION";
pub const OUTPUT_PACKAGE_NAME: &str = "PACKAGE_NAME";
pub const OUTPUT_PACKAGE_PATH: &str = "PACKAGE_PATH";
pub const OUTPUT_SYMBOLS_PACKAGE_NAME: &str = "SYMBOLS_PACKAGE_NAME";
pub const OUTPUT_SYMBOLS_PACKAGE_PATH: &str = "SYMBOLS_PACKAGE_PATH";

pub fn error_annotation(message: &str) -> String {
    format!("##[error]😭 {message}")
}

pub fn warning_annotation(message: &str) -> String {
    format!("##[warning]😢 {message}")
}

/// Where step outputs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    /// Append `KEY=value` lines to the runner's output file.
    File(PathBuf),
    /// Print legacy `::set-output` commands on stdout.
    Command,
}

impl OutputSink {
    pub fn new(output_file: Option<PathBuf>) -> Self {
        match output_file {
            Some(path) => OutputSink::File(path),
            None => OutputSink::Command,
        }
    }

    pub fn emit(&self, key: &str, value: &str) -> Result<()> {
        tracing::debug!(key, value, "step output");
        match self {
            OutputSink::File(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|err| PublishError::io("open output file", path, err))?;
                writeln!(file, "{}", output_line(key, value))
                    .map_err(|err| PublishError::io("write output file", path, err))
            }
            OutputSink::Command => {
                println!("{}", set_output_command(key, value));
                Ok(())
            }
        }
    }
}

pub fn output_line(key: &str, value: &str) -> String {
    format!("{key}={value}")
}

pub fn set_output_command(key: &str, value: &str) -> String {
    format!("::set-output name={key}::{value}")
}
