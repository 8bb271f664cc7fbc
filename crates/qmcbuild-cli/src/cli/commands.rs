use super::CliError;
use anyhow::Context;
use clap::Parser;
use qmcbuild_core::build::BuildContext;
use qmcbuild_core::domain::{BuildError, CompilerSelection};
use qmcbuild_core::params::{ParameterOverrides, ParameterStore};
use qmcbuild_core::toolkit::ToolkitLayout;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "qmcbuild",
    about = "Builds a PMR-QMC simulation executable from a declarative parameter document",
    version
)]
pub(super) struct BuildArgs {
    /// TOML document with the numerical parameters
    pub(super) paramfile: PathBuf,

    /// Text file describing the Hamiltonian (alternative to the
    /// document's 'hamiltonian' key)
    #[arg(short = 'H', long)]
    pub(super) hamiltonian: Option<PathBuf>,

    /// Text files describing additional operators to measure
    #[arg(short = 'O', long = "observables", value_name = "FILE", num_args = 1..)]
    pub(super) observables: Vec<PathBuf>,

    /// Path for the simulation executable
    #[arg(short = 'o', long = "output")]
    pub(super) output: PathBuf,

    /// The (non-MPI) C++ compiler to use
    #[arg(long, default_value = "g++", conflicts_with = "mpicxx")]
    pub(super) cxx: String,

    /// MPI C++ compiler; selects the distributed build variant
    #[arg(long)]
    pub(super) mpicxx: Option<String>,

    /// Simulation temperature; overrides beta as 1/T
    #[arg(short = 'T', long)]
    pub(super) temperature: Option<f64>,

    /// Directory for intermediate build artifacts
    #[arg(long, default_value = "build")]
    pub(super) build_dir: PathBuf,

    /// Toolkit root holding the prepare tool and the driver sources
    #[arg(long, env = "QMCBUILD_TOOLKIT", default_value = ".")]
    pub(super) toolkit: PathBuf,
}

pub(super) fn run_build_command(args: BuildArgs) -> Result<i32, CliError> {
    let document = load_parameter_document(&args.paramfile)?;
    let overrides = ParameterOverrides {
        hamiltonian: args.hamiltonian,
        observables: args.observables,
        temperature: args.temperature,
    };
    let params = ParameterStore::default()
        .load(&document, &overrides)
        .map_err(CliError::Build)?;

    let compiler = match args.mpicxx {
        Some(command) => CompilerSelection::Mpi(command),
        None => CompilerSelection::Serial(args.cxx),
    };

    let context = BuildContext::new(
        params,
        args.output,
        compiler,
        args.build_dir,
        ToolkitLayout::new(args.toolkit),
    );
    let report = context.build().map_err(CliError::Build)?;

    println!("Build succeeded: {}", report.output_executable.display());
    println!("Build log: {}", report.log_file.display());
    Ok(0)
}

fn load_parameter_document(path: &Path) -> Result<toml::Table, CliError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read parameter document '{}'", path.display()))?;
    content.parse::<toml::Table>().map_err(|source| {
        CliError::Build(BuildError::configuration(
            "CONFIG.DOCUMENT_PARSE",
            format!(
                "failed to parse parameter document '{}': {}",
                path.display(),
                source
            ),
        ))
    })
}
