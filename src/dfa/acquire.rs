use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;
use thiserror::Error;

const DEFAULT_RE2C: &str = "re2c";
const RE2C_ENV: &str = "RE2C";
const DOT_EXTENSION: &str = "dot";
const UTF8_MARKER: &str = "utf8";

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("unable to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: io::Error,
    },
    #[error("unable to run {program}: {source}")]
    Spawn {
        program: String,
        source: io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("{program} produced non UTF-8 output")]
    Utf8 {
        program: String,
    },
}

/// How re2c is invoked for non-graph inputs
#[derive(Debug, Clone, PartialEq)]
pub struct Re2cConfig {
    pub program: String,
    pub utf8: bool,
}

impl Re2cConfig {
    /// `RE2C` overrides the program; UTF-8 mode is picked when the path
    /// mentions `utf8`.
    pub fn for_path(path: &Path) -> Self {
        Self {
            program: env::var(RE2C_ENV).unwrap_or_else(|_| DEFAULT_RE2C.to_owned()),
            utf8: path.to_string_lossy().contains(UTF8_MARKER),
        }
    }

    pub(crate) fn args(&self, path: &Path) -> Vec<String> {
        let mut args = vec!["-D".to_owned()];
        if self.utf8 {
            args.push("-8".to_owned());
        }
        args.push(path.to_string_lossy().into_owned());
        args
    }
}

fn is_graph_file(path: &Path) -> bool {
    path.extension().map_or(false, |e| e == DOT_EXTENSION)
}

/// Returns the graph text for `path`: `.dot` files are read as is, anything
/// else is fed to re2c and its standard output returned.
pub fn graph_text(path: &Path, config: &Re2cConfig) -> Result<String, AcquireError> {
    if is_graph_file(path) {
        return fs::read_to_string(path)
            .map_err(|source| AcquireError::Io { path: path.to_owned(), source });
    }

    let args = config.args(path);
    info!("=> running {} {}", config.program, args.join(" "));
    let output = Command::new(&config.program)
        .args(&args)
        .output()
        .map_err(|source| AcquireError::Spawn { program: config.program.clone(), source })?;
    if !output.status.success() {
        return Err(AcquireError::ToolFailed {
            program: config.program.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    String::from_utf8(output.stdout)
        .map_err(|_| AcquireError::Utf8 { program: config.program.clone() })
}
