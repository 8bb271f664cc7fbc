//! Toolkit layout: where the prepare tool and the fixed driver sources
//! live relative to a toolkit root.

use crate::domain::{BuildError, BuildResult, CompilerSelection};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ToolkitLayout {
    root: PathBuf,
}

impl ToolkitLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prepare_executable(&self) -> PathBuf {
        self.root.join("bin").join("prepare")
    }

    pub fn driver_source(&self, compiler: &CompilerSelection) -> PathBuf {
        self.root.join(compiler.driver_source())
    }

    /// Returns the prepare executable, building it first via
    /// `make -C <root>` when it is absent.
    pub fn ensure_prepare_tool(&self) -> BuildResult<PathBuf> {
        let executable = self.prepare_executable();
        if executable.is_file() {
            return Ok(executable);
        }

        warn!(
            path = %executable.display(),
            "no prepare executable found, running make"
        );
        let status = Command::new("make")
            .arg("-C")
            .arg(&self.root)
            .status()
            .map_err(|source| {
                BuildError::pipeline(
                    "RUN.MAKE",
                    format!(
                        "failed to execute make in '{}': {}",
                        self.root.display(),
                        source
                    ),
                )
            })?;
        if !status.success() {
            return Err(BuildError::pipeline(
                "RUN.MAKE",
                format!("make failed in '{}'", self.root.display()),
            ));
        }
        if !executable.is_file() {
            return Err(BuildError::pipeline(
                "RUN.MAKE",
                format!(
                    "make completed but produced no prepare executable at '{}'",
                    executable.display()
                ),
            ));
        }
        Ok(executable)
    }
}
