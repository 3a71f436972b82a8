//! Output filename validation

use crate::error::{ReelError, ReelResult};

/// Characters rejected anywhere in a filename
pub const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum filename length, in characters
pub const MAX_FILENAME_LENGTH: usize = 255;

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Check that a name is usable as a file name on every common platform
///
/// Reserved device names are matched against the part before the first dot,
/// so `con.txt` is rejected while `console.txt` is fine.
pub fn validate_filename(name: &str) -> ReelResult<()> {
    if name.trim().is_empty() {
        return Err(ReelError::Validation("Filename cannot be empty".into()));
    }

    let length = name.chars().count();
    if length > MAX_FILENAME_LENGTH {
        return Err(ReelError::Validation(format!(
            "Filename is too long ({} characters, max {})",
            length, MAX_FILENAME_LENGTH
        )));
    }

    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c) || c.is_control()) {
        return Err(ReelError::Validation(format!(
            "Filename contains invalid character {:?}",
            c
        )));
    }

    let stem = name.split('.').next().unwrap_or(name).trim_end();
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        return Err(ReelError::Validation(format!(
            "Filename uses the reserved name {}",
            stem.to_ascii_uppercase()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["project.json", "my project (1).zip", "CONSOLE.txt", "com10.csv", "лекция.xml"] {
            assert!(validate_filename(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_characters() {
        for name in ["a<b", "a>b", "a:b", "a\"b", "a/b", "a\\b", "a|b", "a?b", "a*b"] {
            assert!(validate_filename(name).unwrap_err().is_validation(), "{}", name);
        }
    }

    #[test]
    fn test_empty_and_too_long() {
        assert!(validate_filename("").is_err());
        assert!(validate_filename("   ").is_err());
        assert!(validate_filename(&"a".repeat(255)).is_ok());
        assert!(validate_filename(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_reserved_names_case_insensitive() {
        for name in ["CON", "con.json", "Nul.txt", "lpt9.csv", "COM1"] {
            let err = validate_filename(name).unwrap_err();
            assert!(err.to_string().contains("reserved"), "{}", name);
        }
    }
}
