//! Validation helpers for DTOs.

use validator::ValidationError;

/// Rejects scan codes made only of whitespace.
///
/// # Examples
///
/// ```ignore
/// validate_scan_code("TREE-42") // Ok
/// validate_scan_code("   ")     // Err
/// ```
pub fn validate_scan_code(code: &str) -> Result<(), ValidationError> {
    if code.trim().is_empty() {
        let mut err = ValidationError::new("scan_code_blank");
        err.message = Some("Scan code must contain at least one visible character".into());
        return Err(err);
    }

    Ok(())
}
