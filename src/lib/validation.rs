//! Input validation utilities
//!
//! Checks on input paths and command-line values made before any work starts, with
//! structured errors from [`crate::errors`].

use crate::errors::{MapconsError, Result};
use std::fmt::Display;
use std::path::Path;

/// Validate that a file exists
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use mapcons_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/file.bam", "Input BAM");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(MapconsError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that the directory an output file goes into exists
///
/// # Errors
/// Returns an error if the parent directory is missing
pub fn validate_output_parent<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    match path_ref.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(MapconsError::InvalidFileFormat {
                file_type: description.to_string(),
                path: path_ref.display().to_string(),
                reason: format!("Directory {} does not exist", parent.display()),
            })
        }
        _ => Ok(()),
    }
}

/// Validate that a value is at least 1
///
/// # Errors
/// Returns an error if the value is zero or negative
///
/// # Example
/// ```
/// use mapcons_lib::validation::validate_positive;
///
/// assert!(validate_positive(10, "min-coverage").is_ok());
/// assert!(validate_positive(0, "min-coverage").is_err());
/// ```
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(MapconsError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("must be >= 1, got {value}"),
        });
    }
    Ok(())
}

/// Validate that every name in `requested` is one of `available`
///
/// # Errors
/// Returns an error naming the first missing reference
pub fn validate_reference_names<S: AsRef<str>>(requested: &[S], available: &[String]) -> Result<()> {
    for name in requested {
        let name = name.as_ref();
        if !available.iter().any(|known| known == name) {
            return Err(MapconsError::ReferenceNotFound { ref_name: name.to_string() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_file_exists() {
        let temp = NamedTempFile::new().unwrap();
        assert!(validate_file_exists(temp.path(), "Input BAM").is_ok());
        let error = validate_file_exists("/does/not/exist.bam", "Input BAM").unwrap_err();
        assert!(error.to_string().contains("File does not exist"));
    }

    #[test]
    fn test_validate_output_parent() {
        assert!(validate_output_parent("consensus.fa", "Output FASTA").is_ok());
        let temp = tempfile::tempdir().unwrap();
        assert!(validate_output_parent(temp.path().join("out.fa"), "Output FASTA").is_ok());
        assert!(validate_output_parent("/no/such/dir/out.fa", "Output FASTA").is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(1_u32, "threads").is_ok());
        let error = validate_positive(0_usize, "threads").unwrap_err();
        assert!(error.to_string().contains("must be >= 1, got 0"));
    }

    #[test]
    fn test_validate_reference_names() {
        let available = vec!["chrM".to_string(), "plasmid".to_string()];
        assert!(validate_reference_names(&["plasmid"], &available).is_ok());
        assert!(validate_reference_names::<&str>(&[], &available).is_ok());
        let error = validate_reference_names(&["chr1"], &available).unwrap_err();
        assert!(matches!(error, MapconsError::ReferenceNotFound { ref_name } if ref_name == "chr1"));
    }
}
