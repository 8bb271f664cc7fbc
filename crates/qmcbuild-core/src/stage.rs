//! Artifact staging: copies custom observable files into the build
//! directory under collision-avoiding local names.

use crate::domain::{BuildError, BuildResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Copies each observable file into `build_dir` as `O<basename>` and
/// returns the local names in input order. The order is load-bearing:
/// downstream compile units are generated in this order.
///
/// A missing source is fatal before any external tool runs.
pub fn stage_observables(
    files: &[PathBuf],
    build_dir: &Path,
) -> BuildResult<Vec<String>> {
    let mut staged = Vec::with_capacity(files.len());
    for source in files {
        if !source.is_file() {
            return Err(BuildError::staging(
                "STAGE.MISSING_SOURCE",
                format!(
                    "observable file '{}' does not exist or is not a regular file",
                    source.display()
                ),
            ));
        }
        let base = source.file_name().ok_or_else(|| {
            BuildError::staging(
                "STAGE.MISSING_SOURCE",
                format!("observable path '{}' has no file name", source.display()),
            )
        })?;
        let local_name = format!("O{}", base.to_string_lossy());
        fs::copy(source, build_dir.join(&local_name)).map_err(|io_error| {
            BuildError::staging(
                "STAGE.COPY",
                format!(
                    "failed to copy observable file '{}' into '{}': {}",
                    source.display(),
                    build_dir.display(),
                    io_error
                ),
            )
        })?;
        staged.push(local_name);
    }
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::stage_observables;
    use crate::domain::BuildErrorCategory;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn touch(path: &std::path::Path, content: &str) {
        fs::write(path, content).expect("test file should be writable");
    }

    #[test]
    fn files_stage_in_input_order() {
        let temp = TempDir::new().expect("tempdir should be created");
        let build_dir = temp.path().join("build");
        fs::create_dir(&build_dir).unwrap();
        let a = temp.path().join("a.txt");
        let b = temp.path().join("b.txt");
        touch(&a, "first operator");
        touch(&b, "second operator");

        let staged = stage_observables(&[a.clone(), b.clone()], &build_dir)
            .expect("staging should succeed");
        assert_eq!(staged, vec!["Oa.txt".to_string(), "Ob.txt".to_string()]);

        let reversed = stage_observables(&[b, a], &build_dir)
            .expect("reversed staging should succeed");
        assert_eq!(reversed, vec!["Ob.txt".to_string(), "Oa.txt".to_string()]);
    }

    #[test]
    fn staging_copies_without_consuming_the_source() {
        let temp = TempDir::new().expect("tempdir should be created");
        let build_dir = temp.path().join("build");
        fs::create_dir(&build_dir).unwrap();
        let source = temp.path().join("op.txt");
        touch(&source, "operator body");

        stage_observables(std::slice::from_ref(&source), &build_dir)
            .expect("staging should succeed");

        assert!(source.is_file(), "source must remain after staging");
        let copied = fs::read_to_string(build_dir.join("Oop.txt")).unwrap();
        assert_eq!(copied, "operator body");
    }

    #[test]
    fn missing_source_is_fatal() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = stage_observables(
            &[PathBuf::from("definitely/not/here.txt")],
            temp.path(),
        )
        .expect_err("missing observable file must fail");
        assert_eq!(error.category(), BuildErrorCategory::StagingError);
        assert_eq!(error.code(), "STAGE.MISSING_SOURCE");
    }
}
