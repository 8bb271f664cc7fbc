pub mod errors;

pub use errors::{BuildError, BuildErrorCategory, BuildResult, ExitContract};

use std::fmt::{Display, Formatter};

/// The two external-toolchain stages of one build invocation, in the
/// order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStage {
    Prepare,
    Compile,
}

impl BuildStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "PREPARE",
            Self::Compile => "COMPILE",
        }
    }

    /// Operator-facing label used in log sections and diagnostics.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Prepare => "Preparing",
            Self::Compile => "Compiling",
        }
    }
}

impl Display for BuildStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).label())
    }
}

/// Which final compiler drives the build. The MPI variant compiles a
/// different driver source; the invocation shape is otherwise identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerSelection {
    Serial(String),
    Mpi(String),
}

impl CompilerSelection {
    pub fn command(&self) -> &str {
        match self {
            Self::Serial(command) | Self::Mpi(command) => command,
        }
    }

    pub const fn driver_source(&self) -> &'static str {
        match self {
            Self::Serial(_) => "PMRQMC.cpp",
            Self::Mpi(_) => "PMRQMC_mpi.cpp",
        }
    }

    pub const fn mode_name(&self) -> &'static str {
        match self {
            Self::Serial(_) => "serial",
            Self::Mpi(_) => "mpi",
        }
    }
}
