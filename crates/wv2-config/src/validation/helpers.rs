//! Shared helpers used by the section validators.

/// Push an error if `value` contains a NUL, which native strings cannot carry.
pub(crate) fn validate_no_nul(errors: &mut Vec<String>, name: &str, value: &str) {
    if let Some(index) = value.find('\0') {
        errors.push(format!("{name} contains a NUL character at byte {index}"));
    }
}
