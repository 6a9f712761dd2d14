//! Input validation utilities
//!
//! This module provides common validation functions for command-line
//! parameters and file paths with consistent error messages.

use crate::errors::{FlowkitError, Result};
use std::path::Path;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input file")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use flowkit_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/flows.flw", "Input file");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.is_file() {
        return Err(FlowkitError::InvalidParameter {
            parameter: description.to_string(),
            reason: format!("'{}' does not exist", path_ref.display()),
        });
    }
    Ok(())
}

/// Validate that multiple files exist
///
/// # Errors
/// Returns an error for the first file that doesn't exist
pub fn validate_files_exist<P: AsRef<Path>>(files: &[P], description: &str) -> Result<()> {
    for path in files {
        validate_file_exists(path, description)?;
    }
    Ok(())
}

/// Validate that a directory exists and is writable.
///
/// Writability is probed by creating (and immediately removing) an anonymous
/// temporary file inside the directory.
///
/// # Errors
/// Returns an error if the path is not a directory or a file cannot be
/// created inside it
pub fn validate_dir_writable<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.is_dir() {
        return Err(FlowkitError::InvalidParameter {
            parameter: description.to_string(),
            reason: format!("'{}' is not a directory", path_ref.display()),
        });
    }
    if let Err(err) = tempfile::tempfile_in(path_ref) {
        return Err(FlowkitError::InvalidParameter {
            parameter: description.to_string(),
            reason: format!("'{}' is not writable: {err}", path_ref.display()),
        });
    }
    Ok(())
}
