use super::BuildStage;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildErrorCategory {
    Success,
    ConfigurationError,
    StagingError,
    PipelineError,
    IoSystemError,
}

impl BuildErrorCategory {
    pub const fn exit_contract(self) -> ExitContract {
        match self {
            Self::Success => ExitContract {
                exit_code: 0,
                category_name: "Success",
                class: "SUCCESS",
            },
            Self::ConfigurationError => ExitContract {
                exit_code: 2,
                category_name: "ConfigurationError",
                class: "CONFIG_FATAL",
            },
            Self::StagingError => ExitContract {
                exit_code: 3,
                category_name: "StagingError",
                class: "STAGE_FATAL",
            },
            Self::PipelineError => ExitContract {
                exit_code: 4,
                category_name: "PipelineError",
                class: "RUN_FATAL",
            },
            Self::IoSystemError => ExitContract {
                exit_code: 5,
                category_name: "IoSystemError",
                class: "IO_FATAL",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_contract().exit_code
    }

    pub const fn category_name(self) -> &'static str {
        self.exit_contract().category_name
    }

    pub const fn class(self) -> &'static str {
        self.exit_contract().class
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

/// Stable mapping between an error category and the process exit surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitContract {
    pub exit_code: i32,
    pub category_name: &'static str,
    pub class: &'static str,
}

/// The single fatal error type of a build invocation. Carries a stable
/// machine code (`CONFIG.TYPE_MISMATCH` style) and, for pipeline
/// failures, the stage that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildError {
    category: BuildErrorCategory,
    code: &'static str,
    message: String,
    stage: Option<BuildStage>,
}

impl BuildError {
    pub fn new(
        category: BuildErrorCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
            stage: None,
        }
    }

    pub fn configuration(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(BuildErrorCategory::ConfigurationError, code, message)
    }

    pub fn staging(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(BuildErrorCategory::StagingError, code, message)
    }

    pub fn pipeline(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(BuildErrorCategory::PipelineError, code, message)
    }

    pub fn pipeline_stage(
        stage: BuildStage,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category: BuildErrorCategory::PipelineError,
            code,
            message: message.into(),
            stage: Some(stage),
        }
    }

    pub fn io_system(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(BuildErrorCategory::IoSystemError, code, message)
    }

    pub const fn category(&self) -> BuildErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The pipeline stage this error originated from, when it was raised
    /// by an external-tool invocation.
    pub const fn stage(&self) -> Option<BuildStage> {
        self.stage
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.code, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.category_name(),
            self.code,
            self.message
        )
    }
}

impl Error for BuildError {}
