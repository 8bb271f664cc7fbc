//! Constants emitter: serializes a `ParameterSet` into the generated
//! `parameters.hpp` consumed by the final compile stage.
//!
//! Output is byte-deterministic for identical inputs: entries follow the
//! defaults' declaration order, never a re-sort. Disabled booleans are
//! emitted as commented directives so every symbol stays visible to the
//! reader even when inert.

use crate::domain::{BuildError, BuildResult};
use crate::params::{ParamValue, ParameterSet};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONSTANTS_FILE_NAME: &str = "parameters.hpp";

pub fn render(params: &ParameterSet) -> String {
    let mut out = String::new();
    out.push_str("// This file was generated automatically by qmcbuild.\n");
    out.push_str("// Do not edit by hand; rerun the build instead.\n");

    for (name, value) in params.numerical() {
        push_directive(&mut out, name, *value);
    }
    for (name, enabled) in params.observable_flags() {
        push_directive(&mut out, name, ParamValue::Bool(*enabled));
    }
    out
}

/// Writes the rendered constants file into `dest_dir`, returning its
/// path. The only failure mode is I/O; it aborts the build before any
/// external process is spawned.
pub fn emit(params: &ParameterSet, dest_dir: &Path) -> BuildResult<PathBuf> {
    let path = dest_dir.join(CONSTANTS_FILE_NAME);
    fs::write(&path, render(params)).map_err(|source| {
        BuildError::io_system(
            "IO.CONSTANTS_WRITE",
            format!(
                "failed to write constants file '{}': {}",
                path.display(),
                source
            ),
        )
    })?;
    Ok(path)
}

fn push_directive(out: &mut String, name: &str, value: ParamValue) {
    match value {
        ParamValue::Bool(enabled) => {
            if !enabled {
                out.push_str("//");
            }
            let _ = writeln!(out, "#define {}", name);
        }
        ParamValue::Int(value) => {
            let _ = writeln!(out, "#define {} {}", name, value);
        }
        ParamValue::Float(value) => {
            let _ = writeln!(out, "#define {} {}", name, render_float(value));
        }
    }
}

// Whole-valued floats keep their decimal point so the downstream
// compiler sees a floating literal, not an integer.
fn render_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::{CONSTANTS_FILE_NAME, emit, render, render_float};
    use crate::params::{ParameterOverrides, ParameterStore};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_params(document: &str) -> crate::params::ParameterSet {
        let overrides = ParameterOverrides {
            hamiltonian: Some(PathBuf::from("hamiltonian.txt")),
            ..ParameterOverrides::default()
        };
        ParameterStore::default()
            .load(
                &document.parse::<toml::Table>().expect("valid TOML"),
                &overrides,
            )
            .expect("sample parameters should load")
    }

    #[test]
    fn rendering_is_deterministic() {
        let params = sample_params("steps = 500\nMEASURE_H2 = false");
        assert_eq!(render(&params), render(&params));
    }

    #[test]
    fn emitted_files_are_byte_identical_across_runs() {
        let params = sample_params("beta = 2.0");
        let temp = TempDir::new().expect("tempdir should be created");
        let first_dir = temp.path().join("first");
        let second_dir = temp.path().join("second");
        fs::create_dir_all(&first_dir).unwrap();
        fs::create_dir_all(&second_dir).unwrap();

        emit(&params, &first_dir).expect("first emit should succeed");
        emit(&params, &second_dir).expect("second emit should succeed");

        let first = fs::read(first_dir.join(CONSTANTS_FILE_NAME)).unwrap();
        let second = fs::read(second_dir.join(CONSTANTS_FILE_NAME)).unwrap();
        assert_eq!(first, second, "regenerated constants files must match");
    }

    #[test]
    fn disabled_flags_stay_visible_as_comments() {
        let params = sample_params("MEASURE_H2 = false");
        let rendered = render(&params);
        assert!(rendered.contains("\n#define MEASURE_H\n"));
        assert!(rendered.contains("\n//#define MEASURE_H2\n"));
        assert!(rendered.contains("//#define MEASURE_Z_MAGNETIZATION\n"));
    }

    #[test]
    fn numeric_lines_use_native_representation() {
        let params = sample_params("Tsteps = 500\nbeta = 2.0");
        let rendered = render(&params);
        assert!(rendered.contains("#define Tsteps 500\n"));
        assert!(rendered.contains("#define beta 2.0\n"));
        assert!(rendered.contains("#define stepsPerMeasurement 10\n"));
    }

    #[test]
    fn entries_follow_declaration_order() {
        let rendered = render(&sample_params(""));
        let position = |needle: &str| {
            rendered
                .find(needle)
                .unwrap_or_else(|| panic!("rendered output should contain '{}'", needle))
        };
        assert!(position("#define Tsteps") < position("#define steps "));
        assert!(position("#define steps ") < position("#define beta"));
        assert!(position("#define Nbins") < position("#define EXHAUSTIVE_CYCLE_SEARCH"));
        assert!(position("#define EXHAUSTIVE_CYCLE_SEARCH") < position("#define MEASURE_H"));
        assert!(position("#define MEASURE_HOFFDIAG2") < position("#define MEASURE_Z_MAGNETIZATION"));
    }

    #[test]
    fn whole_floats_keep_a_decimal_point() {
        assert_eq!(render_float(1.0), "1.0");
        assert_eq!(render_float(2.5), "2.5");
        assert_eq!(render_float(0.25), "0.25");
    }
}
