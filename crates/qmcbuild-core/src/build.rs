//! Build context: wires the parameter set, constants emitter, artifact
//! stager, and pipeline runner into one build invocation.
//!
//! Fixed order: ensure build directory → open log → emit constants →
//! stage observables → prepare → compile → write the build report. The
//! log is owned for the whole pipeline and closed on return or unwind.

use crate::domain::{BuildError, BuildResult, BuildStage, CompilerSelection};
use crate::emit;
use crate::params::ParameterSet;
use crate::pipeline::{BuildLog, ExternalInvocation, PipelineRunner, StageReport};
use crate::stage;
use crate::toolkit::ToolkitLayout;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const BUILD_REPORT_FILE_NAME: &str = "build-report.json";

pub struct BuildContext {
    params: ParameterSet,
    output_executable: PathBuf,
    compiler: CompilerSelection,
    build_dir: PathBuf,
    toolkit: ToolkitLayout,
}

impl BuildContext {
    pub fn new(
        params: ParameterSet,
        output_executable: impl Into<PathBuf>,
        compiler: CompilerSelection,
        build_dir: impl Into<PathBuf>,
        toolkit: ToolkitLayout,
    ) -> Self {
        Self {
            params,
            output_executable: output_executable.into(),
            compiler,
            build_dir: build_dir.into(),
            toolkit,
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Runs the full configuration-to-artifact pipeline and returns the
    /// build report. Every failure is fatal to this invocation; the
    /// report and the log stay behind in the build directory.
    pub fn build(&self) -> BuildResult<BuildReport> {
        let started = Local::now();

        if self.build_dir.exists() {
            warn!(
                build_dir = %self.build_dir.display(),
                "build directory already exists, overwriting intermediates"
            );
        } else {
            fs::create_dir_all(&self.build_dir).map_err(|source| {
                BuildError::io_system(
                    "IO.BUILD_DIR",
                    format!(
                        "failed to create build directory '{}': {}",
                        self.build_dir.display(),
                        source
                    ),
                )
            })?;
        }

        let prepare_executable = self.toolkit.ensure_prepare_tool()?;
        let mut log = BuildLog::create(&self.build_dir, &started)?;

        let constants_file = emit::emit(&self.params, &self.build_dir)?;
        let staged_observables =
            stage::stage_observables(self.params.custom_observable_files(), &self.build_dir)?;

        let hamiltonian = absolute_path(self.params.hamiltonian_file())?;
        let output_executable = absolute_path(&self.output_executable)?;

        let invocations = [
            self.prepare_invocation(&prepare_executable, &hamiltonian, &staged_observables),
            self.compile_invocation(&output_executable),
        ];

        let mut runner = PipelineRunner::new();
        let stage_reports = runner.run(&invocations, &mut log)?;

        let report = BuildReport::new(
            started.to_rfc3339(),
            self.compiler.mode_name(),
            &stage_reports,
            constants_file,
            staged_observables,
            log.path().to_path_buf(),
            output_executable,
        );
        report.write(&self.build_dir.join(BUILD_REPORT_FILE_NAME))?;
        Ok(report)
    }

    fn prepare_invocation(
        &self,
        prepare_executable: &Path,
        hamiltonian: &Path,
        staged_observables: &[String],
    ) -> ExternalInvocation {
        let mut invocation = ExternalInvocation::new(
            BuildStage::Prepare,
            prepare_executable.as_os_str(),
            &self.build_dir,
        )
        .arg(hamiltonian.as_os_str());
        for staged in staged_observables {
            invocation = invocation.arg(staged);
        }
        invocation
    }

    fn compile_invocation(&self, output_executable: &Path) -> ExternalInvocation {
        ExternalInvocation::new(
            BuildStage::Compile,
            self.compiler.command(),
            &self.build_dir,
        )
        .arg("-O3")
        .arg("-std=c++11")
        .arg("-o")
        .arg(output_executable.as_os_str())
        .arg("-I")
        .arg(self.toolkit.root().as_os_str())
        .arg("-I")
        .arg(".")
        .arg(self.toolkit.driver_source(&self.compiler))
    }
}

fn absolute_path(path: &Path) -> BuildResult<PathBuf> {
    std::path::absolute(path).map_err(|source| {
        BuildError::io_system(
            "IO.PATH",
            format!("failed to absolutize '{}': {}", path.display(), source),
        )
    })
}

/// Machine-readable summary of one build invocation, written next to
/// the other generated artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub started_at: String,
    pub compiler_mode: String,
    pub stages: Vec<StageSummary>,
    pub constants_file: PathBuf,
    pub staged_observables: Vec<String>,
    pub log_file: PathBuf,
    pub output_executable: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSummary {
    pub name: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl BuildReport {
    fn new(
        started_at: String,
        compiler_mode: &str,
        stage_reports: &[StageReport],
        constants_file: PathBuf,
        staged_observables: Vec<String>,
        log_file: PathBuf,
        output_executable: PathBuf,
    ) -> Self {
        Self {
            started_at,
            compiler_mode: compiler_mode.to_string(),
            stages: stage_reports
                .iter()
                .map(|report| StageSummary {
                    name: report.stage.label().to_string(),
                    exit_code: report.exit_code,
                    success: report.success(),
                })
                .collect(),
            constants_file,
            staged_observables,
            log_file,
            output_executable,
        }
    }

    fn write(&self, path: &Path) -> BuildResult<()> {
        let rendered = serde_json::to_string_pretty(self).map_err(|source| {
            BuildError::io_system(
                "IO.BUILD_REPORT",
                format!("failed to serialize build report: {}", source),
            )
        })?;
        fs::write(path, rendered).map_err(|source| {
            BuildError::io_system(
                "IO.BUILD_REPORT",
                format!(
                    "failed to write build report '{}': {}",
                    path.display(),
                    source
                ),
            )
        })
    }
}
