mod commands;

use clap::Parser;
use qmcbuild_core::domain::BuildError;

pub fn run_from_env() -> i32 {
    init_tracing();
    match run(std::env::args().skip(1)) {
        Ok(code) => code,
        Err(error) => {
            let build_error = error.as_build_error();
            eprintln!("{}", build_error.diagnostic_line());
            if let Some(summary_line) = build_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            build_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("qmcbuild".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();

    match commands::BuildArgs::try_parse_from(&full_args) {
        Ok(parsed) => commands::run_build_command(parsed),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Build(BuildError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_build_error(&self) -> BuildError {
        match self {
            Self::Usage(message) => {
                BuildError::configuration("CONFIG.CLI_USAGE", message.clone())
            }
            Self::Build(error) => error.clone(),
            Self::Internal(error) => BuildError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
