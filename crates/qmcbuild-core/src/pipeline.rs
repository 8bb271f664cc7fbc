//! Pipeline runner: ordered, blocking invocations of the external
//! toolchain with per-stage log sections and fail-fast error surfacing.
//!
//! Each stage's captured stdout is echoed to the operator and appended
//! to the build log; stderr goes to the log only. A nonzero exit halts
//! the pipeline before the next stage spawns. No retries, no timeouts.

use crate::domain::{BuildError, BuildResult, BuildStage};
use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// One external-tool invocation, executed with `cwd` as its working
/// directory.
#[derive(Debug, Clone)]
pub struct ExternalInvocation {
    pub stage: BuildStage,
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
}

impl ExternalInvocation {
    pub fn new(
        stage: BuildStage,
        program: impl Into<OsString>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn render_command(&self) -> String {
        let mut rendered = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(&arg.to_string_lossy());
        }
        rendered
    }
}

/// Captured outcome of one completed stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: BuildStage,
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl StageReport {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Append-only, timestamp-named log owned by one build invocation for
/// its full lifetime. Closed on drop, including error unwinds.
#[derive(Debug)]
pub struct BuildLog {
    path: PathBuf,
    file: File,
}

impl BuildLog {
    pub fn create(build_dir: &Path, started: &DateTime<Local>) -> BuildResult<Self> {
        let path = build_dir.join(format!(
            "compile_{}.log",
            started.format("%Y-%m-%dT%H-%M-%S")
        ));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| {
                BuildError::io_system(
                    "IO.BUILD_LOG",
                    format!("failed to open build log '{}': {}", path.display(), source),
                )
            })?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn begin_section(&mut self, stage: BuildStage) -> BuildResult<()> {
        let header = format!("\nXXX {}\n{}\n", stage.label(), "#".repeat(80));
        self.append(header.as_bytes())
    }

    fn append_output(&mut self, output: &Output) -> BuildResult<()> {
        self.append(b"STDOUT:\n")?;
        self.append(&output.stdout)?;
        self.append(b"STDERR:\n")?;
        self.append(&output.stderr)
    }

    fn append(&mut self, bytes: &[u8]) -> BuildResult<()> {
        self.file.write_all(bytes).map_err(|source| {
            BuildError::io_system(
                "IO.BUILD_LOG",
                format!(
                    "failed to append to build log '{}': {}",
                    self.path.display(),
                    source
                ),
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Preparing,
    Compiling,
    Done,
    Failed(BuildStage),
}

/// Executes the ordered stage invocations of one build.
#[derive(Debug)]
pub struct PipelineRunner {
    state: PipelineState,
}

impl PipelineRunner {
    pub fn new() -> Self {
        Self {
            state: PipelineState::NotStarted,
        }
    }

    pub const fn state(&self) -> PipelineState {
        self.state
    }

    pub fn run(
        &mut self,
        invocations: &[ExternalInvocation],
        log: &mut BuildLog,
    ) -> BuildResult<Vec<StageReport>> {
        let mut reports = Vec::with_capacity(invocations.len());
        for invocation in invocations {
            self.state = running_state(invocation.stage);
            log.begin_section(invocation.stage)?;
            debug!(
                stage = invocation.stage.as_str(),
                command = %invocation.render_command(),
                "spawning external tool"
            );

            let output = match Command::new(&invocation.program)
                .args(&invocation.args)
                .current_dir(&invocation.cwd)
                .output()
            {
                Ok(output) => output,
                Err(source) => {
                    self.state = PipelineState::Failed(invocation.stage);
                    return Err(BuildError::pipeline_stage(
                        invocation.stage,
                        "RUN.SPAWN",
                        format!(
                            "failed to execute '{}': {}",
                            invocation.program.to_string_lossy(),
                            source
                        ),
                    ));
                }
            };

            print!("{}", String::from_utf8_lossy(&output.stdout));
            log.append_output(&output)?;

            if !output.status.success() {
                self.state = PipelineState::Failed(invocation.stage);
                return Err(BuildError::pipeline_stage(
                    invocation.stage,
                    failure_code(invocation.stage),
                    format!(
                        "{} stage failed with {}; check the log at '{}'",
                        invocation.stage.label(),
                        status_text(&output),
                        log.path().display()
                    ),
                ));
            }

            reports.push(StageReport {
                stage: invocation.stage,
                exit_code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        self.state = PipelineState::Done;
        Ok(reports)
    }
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new()
    }
}

const fn running_state(stage: BuildStage) -> PipelineState {
    match stage {
        BuildStage::Prepare => PipelineState::Preparing,
        BuildStage::Compile => PipelineState::Compiling,
    }
}

const fn failure_code(stage: BuildStage) -> &'static str {
    match stage {
        BuildStage::Prepare => "RUN.PREPARE",
        BuildStage::Compile => "RUN.COMPILE",
    }
}

fn status_text(output: &Output) -> String {
    output.status.code().map_or_else(
        || "termination by signal".to_string(),
        |code| format!("exit code {}", code),
    )
}

#[cfg(test)]
mod tests {
    use super::{BuildLog, ExternalInvocation, PipelineRunner, PipelineState};
    use crate::domain::{BuildErrorCategory, BuildStage};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("script should be writable");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("script should be executable");
        path
    }

    fn open_log(dir: &Path) -> BuildLog {
        BuildLog::create(dir, &chrono::Local::now()).expect("log should open")
    }

    #[test]
    fn successful_pipeline_logs_both_stages() {
        let temp = TempDir::new().expect("tempdir should be created");
        let prepare = write_script(temp.path(), "prepare.sh", "echo from prepare\necho prep-warning >&2");
        let compile = write_script(temp.path(), "compile.sh", "echo from compile");
        let mut log = open_log(temp.path());

        let invocations = [
            ExternalInvocation::new(BuildStage::Prepare, prepare.as_os_str(), temp.path()),
            ExternalInvocation::new(BuildStage::Compile, compile.as_os_str(), temp.path()),
        ];

        let mut runner = PipelineRunner::new();
        let reports = runner
            .run(&invocations, &mut log)
            .expect("pipeline should succeed");

        assert_eq!(runner.state(), PipelineState::Done);
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|report| report.success()));

        let log_content = fs::read_to_string(log.path()).unwrap();
        assert!(log_content.contains("XXX Preparing"));
        assert!(log_content.contains("XXX Compiling"));
        assert!(log_content.contains("from prepare"));
        assert!(log_content.contains("prep-warning"));
        assert!(log_content.contains("from compile"));
    }

    #[test]
    fn failed_prepare_stage_halts_before_compile() {
        let temp = TempDir::new().expect("tempdir should be created");
        let prepare = write_script(temp.path(), "prepare.sh", "echo broken input >&2\nexit 3");
        let compile = write_script(temp.path(), "compile.sh", "touch compiled.marker");
        let mut log = open_log(temp.path());

        let invocations = [
            ExternalInvocation::new(BuildStage::Prepare, prepare.as_os_str(), temp.path()),
            ExternalInvocation::new(BuildStage::Compile, compile.as_os_str(), temp.path()),
        ];

        let mut runner = PipelineRunner::new();
        let error = runner
            .run(&invocations, &mut log)
            .expect_err("prepare failure must abort the pipeline");

        assert_eq!(error.stage(), Some(BuildStage::Prepare));
        assert_eq!(error.code(), "RUN.PREPARE");
        assert_eq!(error.category(), BuildErrorCategory::PipelineError);
        assert!(error.message().contains("Preparing"));
        assert!(error.message().contains("exit code 3"));
        assert_eq!(runner.state(), PipelineState::Failed(BuildStage::Prepare));
        assert!(
            !temp.path().join("compiled.marker").exists(),
            "compile stage must never run after a prepare failure"
        );

        let log_content = fs::read_to_string(log.path()).unwrap();
        assert!(log_content.contains("broken input"));
    }

    #[test]
    fn unspawnable_tool_surfaces_the_os_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut log = open_log(temp.path());
        let invocations = [ExternalInvocation::new(
            BuildStage::Prepare,
            "/definitely/not/a/real/tool",
            temp.path(),
        )];

        let mut runner = PipelineRunner::new();
        let error = runner
            .run(&invocations, &mut log)
            .expect_err("unspawnable program must fail");
        assert_eq!(error.code(), "RUN.SPAWN");
        assert_eq!(error.stage(), Some(BuildStage::Prepare));
        assert_eq!(runner.state(), PipelineState::Failed(BuildStage::Prepare));
    }

    #[test]
    fn invocation_args_accumulate_in_order() {
        let invocation = ExternalInvocation::new(BuildStage::Compile, "g++", ".")
            .arg("-O3")
            .arg("-o")
            .arg("sim");
        assert_eq!(invocation.args.len(), 3);
        assert_eq!(invocation.render_command(), "g++ -O3 -o sim");
    }
}
