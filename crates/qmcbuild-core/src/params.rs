//! Parameter model: immutable default tables, merge of the declarative
//! document and command-line overrides, and type validation.
//!
//! Keys fall into four groups: numerical settings, boolean observable
//! flags, the two reserved file keys (`hamiltonian`, `observables`), and
//! everything else, which is ignored with a warning for forward
//! compatibility.

use crate::domain::{BuildError, BuildResult};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const HAMILTONIAN_KEY: &str = "hamiltonian";
pub const OBSERVABLES_KEY: &str = "observables";

/// A typed scalar setting. Integers and floats share the numeric kind;
/// booleans are distinct and validated as such.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    pub const fn kind(self) -> ParamKind {
        match self {
            Self::Int(_) | Self::Float(_) => ParamKind::Numeric,
            Self::Bool(_) => ParamKind::Boolean,
        }
    }

    fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::Integer(value) => Some(Self::Int(*value)),
            toml::Value::Float(value) => Some(Self::Float(*value)),
            toml::Value::Boolean(value) => Some(Self::Bool(*value)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Numeric,
    Boolean,
}

impl Display for ParamKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
        })
    }
}

/// The recognized settings and their default values, in declaration
/// order. The order is load-bearing: the constants emitter iterates it
/// unchanged so regenerated files stay diff-stable.
#[derive(Debug, Clone)]
pub struct ParameterDefaults {
    numerical: Vec<(&'static str, ParamValue)>,
    observable_flags: Vec<(&'static str, bool)>,
}

impl ParameterDefaults {
    pub fn standard() -> Self {
        Self {
            numerical: vec![
                // MC equilibration updates before measurements start
                ("Tsteps", ParamValue::Int(1_000_000)),
                // total MC updates
                ("steps", ParamValue::Int(10_000_000)),
                ("stepsPerMeasurement", ParamValue::Int(10)),
                // inverse temperature
                ("beta", ParamValue::Float(1.0)),
                // upper bound for the permutation-operator sequence length
                ("qmax", ParamValue::Int(1000)),
                // bins for the binning error analysis
                ("Nbins", ParamValue::Int(250)),
                // false selects the more restrictive cycle search
                ("EXHAUSTIVE_CYCLE_SEARCH", ParamValue::Bool(true)),
            ],
            observable_flags: vec![
                ("MEASURE_H", true),
                ("MEASURE_H2", true),
                ("MEASURE_HDIAG", true),
                ("MEASURE_HDIAG2", true),
                ("MEASURE_HOFFDIAG", true),
                ("MEASURE_HOFFDIAG2", true),
                ("MEASURE_Z_MAGNETIZATION", false),
            ],
        }
    }

    pub fn numerical(&self) -> &[(&'static str, ParamValue)] {
        &self.numerical
    }

    pub fn observable_flags(&self) -> &[(&'static str, bool)] {
        &self.observable_flags
    }
}

impl Default for ParameterDefaults {
    fn default() -> Self {
        Self::standard()
    }
}

/// Command-line-sourced overrides merged after the document.
#[derive(Debug, Clone, Default)]
pub struct ParameterOverrides {
    pub hamiltonian: Option<PathBuf>,
    pub observables: Vec<PathBuf>,
    pub temperature: Option<f64>,
}

/// The validated, immutable parameter set of one build invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    numerical: Vec<(String, ParamValue)>,
    observable_flags: Vec<(String, bool)>,
    custom_observable_files: Vec<PathBuf>,
    hamiltonian_file: PathBuf,
}

impl ParameterSet {
    pub fn numerical(&self) -> &[(String, ParamValue)] {
        &self.numerical
    }

    pub fn observable_flags(&self) -> &[(String, bool)] {
        &self.observable_flags
    }

    pub fn custom_observable_files(&self) -> &[PathBuf] {
        &self.custom_observable_files
    }

    pub fn hamiltonian_file(&self) -> &Path {
        &self.hamiltonian_file
    }

    pub fn numerical_value(&self, name: &str) -> Option<ParamValue> {
        self.numerical
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    pub fn observable_flag(&self, name: &str) -> Option<bool> {
        self.observable_flags
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, enabled)| *enabled)
    }
}

/// Merges and validates a parameter document against the defaults.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    defaults: ParameterDefaults,
}

impl ParameterStore {
    pub fn new(defaults: ParameterDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &ParameterDefaults {
        &self.defaults
    }

    /// Builds the invocation's `ParameterSet` from the document and the
    /// command-line overrides. All recognized keys are type-checked
    /// against their defaults; an explicit temperature override rewrites
    /// `beta` as `1/T` after the document merge, so it wins over a
    /// document-supplied `beta`.
    pub fn load(
        &self,
        document: &toml::Table,
        overrides: &ParameterOverrides,
    ) -> BuildResult<ParameterSet> {
        let mut numerical: Vec<(String, ParamValue)> = self
            .defaults
            .numerical
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        let mut observable_flags: Vec<(String, bool)> = self
            .defaults
            .observable_flags
            .iter()
            .map(|(name, enabled)| (name.to_string(), *enabled))
            .collect();
        let mut custom_observable_files: Vec<PathBuf> = Vec::new();
        let mut hamiltonian_file: Option<PathBuf> = None;

        for (key, value) in document {
            if let Some(slot) = numerical.iter_mut().find(|(name, _)| name == key) {
                slot.1 = checked_value(key, slot.1.kind(), value)?;
            } else if let Some(slot) = observable_flags.iter_mut().find(|(name, _)| name == key) {
                match checked_value(key, ParamKind::Boolean, value)? {
                    ParamValue::Bool(enabled) => slot.1 = enabled,
                    _ => unreachable!("boolean kind check admits only booleans"),
                }
            } else if key == OBSERVABLES_KEY {
                append_observable_paths(value, &mut custom_observable_files)?;
            } else if key == HAMILTONIAN_KEY {
                hamiltonian_file = Some(hamiltonian_path(value)?);
            } else {
                warn!(key = %key, "ignoring unrecognized parameter");
            }
        }

        if let Some(cli_hamiltonian) = &overrides.hamiltonian {
            if hamiltonian_file.is_some() {
                return Err(BuildError::configuration(
                    "CONFIG.HAMILTONIAN_AMBIGUOUS",
                    "Hamiltonian file is specified twice; supply it in the document or on the command line, not both",
                ));
            }
            hamiltonian_file = Some(cli_hamiltonian.clone());
        }

        custom_observable_files.extend(overrides.observables.iter().cloned());

        if let Some(temperature) = overrides.temperature {
            apply_temperature(&mut numerical, temperature)?;
        }

        let Some(hamiltonian_file) = hamiltonian_file else {
            return Err(BuildError::configuration(
                "CONFIG.HAMILTONIAN_MISSING",
                "no Hamiltonian file was supplied in the document or on the command line",
            ));
        };

        Ok(ParameterSet {
            numerical,
            observable_flags,
            custom_observable_files,
            hamiltonian_file,
        })
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(ParameterDefaults::standard())
    }
}

fn checked_value(
    key: &str,
    expected: ParamKind,
    value: &toml::Value,
) -> BuildResult<ParamValue> {
    let supplied = ParamValue::from_toml(value).ok_or_else(|| {
        BuildError::configuration(
            "CONFIG.TYPE_MISMATCH",
            format!(
                "parameter '{}' expects a {} value, got {}",
                key,
                expected,
                value.type_str()
            ),
        )
    })?;

    if supplied.kind() != expected {
        return Err(BuildError::configuration(
            "CONFIG.TYPE_MISMATCH",
            format!(
                "parameter '{}' expects a {} value, got {}",
                key,
                expected,
                supplied.kind()
            ),
        ));
    }
    Ok(supplied)
}

fn append_observable_paths(
    value: &toml::Value,
    files: &mut Vec<PathBuf>,
) -> BuildResult<()> {
    match value {
        toml::Value::String(path) => {
            files.push(PathBuf::from(path));
            Ok(())
        }
        toml::Value::Array(entries) => {
            for entry in entries {
                let toml::Value::String(path) = entry else {
                    return Err(observables_value_error(entry));
                };
                files.push(PathBuf::from(path));
            }
            Ok(())
        }
        other => Err(observables_value_error(other)),
    }
}

fn observables_value_error(value: &toml::Value) -> BuildError {
    BuildError::configuration(
        "CONFIG.OBSERVABLES_VALUE",
        format!(
            "reserved key '{}' expects a file path or array of file paths, got {}",
            OBSERVABLES_KEY,
            value.type_str()
        ),
    )
}

fn hamiltonian_path(value: &toml::Value) -> BuildResult<PathBuf> {
    match value {
        toml::Value::String(path) => Ok(PathBuf::from(path)),
        other => Err(BuildError::configuration(
            "CONFIG.HAMILTONIAN_VALUE",
            format!(
                "reserved key '{}' expects a file path, got {}",
                HAMILTONIAN_KEY,
                other.type_str()
            ),
        )),
    }
}

fn apply_temperature(
    numerical: &mut [(String, ParamValue)],
    temperature: f64,
) -> BuildResult<()> {
    if temperature == 0.0 {
        return Err(BuildError::configuration(
            "CONFIG.TEMPERATURE_ZERO",
            "temperature must be nonzero to derive beta = 1/T",
        ));
    }
    let slot = numerical
        .iter_mut()
        .find(|(name, _)| name == "beta")
        .ok_or_else(|| {
            BuildError::configuration(
                "CONFIG.TEMPERATURE_UNSUPPORTED",
                "defaults do not declare 'beta'; a temperature override has nothing to derive",
            )
        })?;
    slot.1 = ParamValue::Float(1.0 / temperature);
    Ok(())
}
