//! DOS 8.3 filename validation.
//!
//! The guest environment only understands `NNNNNNNN.EEE` names; anything
//! longer (or touching a reserved device name) fails inside the emulator in
//! ways that are hard to diagnose after the fact, so names are rejected on
//! the host before any process is spawned.

use thiserror::Error;

/// Characters that can never appear in a DOS filename.
/// `*` and `?` are wildcards and stay legal so `dir *.TXT` style arguments
/// pass through.
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|'];

/// Device names reserved by DOS regardless of extension.
const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reasons a name is not a valid DOS 8.3 filename.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilenameError {
    #[error("filename '{0}' has too many dots for DOS 8.3 format")]
    TooManyDots(String),

    #[error("filename '{0}' base name exceeds 8 characters")]
    BaseTooLong(String),

    #[error("filename '{0}' extension exceeds 3 characters")]
    ExtTooLong(String),

    #[error("filename '{name}' contains invalid character '{ch}'")]
    InvalidChar { name: String, ch: char },

    #[error("filename '{0}' is a reserved DOS device name")]
    ReservedDeviceName(String),
}

/// A validated 8.3 filename, split into base name and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DosFilename {
    base: String,
    ext: String,
}

impl DosFilename {
    /// Validate `raw` against the 8.3 rules and capture its parts.
    pub fn parse(raw: &str) -> Result<Self, FilenameError> {
        let mut parts = raw.split('.');
        let base = parts.next().unwrap_or_default();
        let ext = parts.next().unwrap_or_default();
        if parts.next().is_some() {
            return Err(FilenameError::TooManyDots(raw.to_string()));
        }

        if base.chars().count() > 8 {
            return Err(FilenameError::BaseTooLong(raw.to_string()));
        }
        if ext.chars().count() > 3 {
            return Err(FilenameError::ExtTooLong(raw.to_string()));
        }

        if let Some(ch) = raw.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
            return Err(FilenameError::InvalidChar {
                name: raw.to_string(),
                ch,
            });
        }

        let stem = base.to_ascii_uppercase();
        if RESERVED_DEVICE_NAMES.contains(&stem.as_str()) {
            return Err(FilenameError::ReservedDeviceName(raw.to_string()));
        }

        Ok(Self {
            base: base.to_string(),
            ext: ext.to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Extension without the dot; empty when the name has none.
    pub fn ext(&self) -> &str {
        &self.ext
    }
}

impl std::fmt::Display for DosFilename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.ext.is_empty() {
            write!(f, "{}", self.base)
        } else {
            write!(f, "{}.{}", self.base, self.ext)
        }
    }
}

/// Validate a single name.
pub fn validate(name: &str) -> Result<(), FilenameError> {
    DosFilename::parse(name).map(|_| ())
}

/// Validate a batch of names, failing on the first violation.
pub fn validate_all<'a, I>(names: I) -> Result<(), FilenameError>
where
    I: IntoIterator<Item = &'a str>,
{
    for name in names {
        validate(name)?;
    }
    Ok(())
}

/// Advisory check: the guest silently uppercases names it creates, which can
/// desynchronize host-side expectations. Never blocks execution.
pub fn check_case_warnings<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter(|name| name.chars().any(|c| c.is_ascii_lowercase()))
        .map(|name| format!("Filename '{name}' will be converted to uppercase in DOS"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_filenames() {
        let valid = [
            "test.txt",
            "file.bat",
            "program.exe",
            "a.b",
            "12345678.123",
            "*.txt",
            "test*.bat",
            "READ?.ME",
            "noext",
        ];
        for name in valid {
            assert!(validate(name).is_ok(), "expected '{name}' to validate");
        }
    }

    #[test]
    fn test_too_many_dots() {
        assert_eq!(
            validate("test.txt.bak"),
            Err(FilenameError::TooManyDots("test.txt.bak".into()))
        );
    }

    #[test]
    fn test_base_too_long() {
        assert_eq!(
            validate("test12345.txt"),
            Err(FilenameError::BaseTooLong("test12345.txt".into()))
        );
    }

    #[test]
    fn test_ext_too_long() {
        assert_eq!(
            validate("test.1234"),
            Err(FilenameError::ExtTooLong("test.1234".into()))
        );
    }

    #[test]
    fn test_invalid_char() {
        assert_eq!(
            validate("t<est.txt"),
            Err(FilenameError::InvalidChar {
                name: "t<est.txt".into(),
                ch: '<'
            })
        );
        assert!(matches!(
            validate("a|b.txt"),
            Err(FilenameError::InvalidChar { ch: '|', .. })
        ));
    }

    #[test]
    fn test_reserved_device_names() {
        assert_eq!(
            validate("CON.txt"),
            Err(FilenameError::ReservedDeviceName("CON.txt".into()))
        );
        // Case-insensitive on the stem.
        assert!(matches!(
            validate("lpt3.dat"),
            Err(FilenameError::ReservedDeviceName(_))
        ));
        // Reserved stems only match the base name.
        assert!(validate("CONF.txt").is_ok());
    }

    #[test]
    fn test_validate_all_stops_on_first_violation() {
        let names = ["ok.txt", "CON.txt", "test12345.txt"];
        assert!(matches!(
            validate_all(names),
            Err(FilenameError::ReservedDeviceName(_))
        ));
    }

    #[test]
    fn test_parse_parts() {
        let name = DosFilename::parse("hello.txt").unwrap();
        assert_eq!(name.base(), "hello");
        assert_eq!(name.ext(), "txt");
        assert_eq!(name.to_string(), "hello.txt");

        let bare = DosFilename::parse("NOEXT").unwrap();
        assert_eq!(bare.ext(), "");
        assert_eq!(bare.to_string(), "NOEXT");
    }

    #[test]
    fn test_case_warnings() {
        let warnings = check_case_warnings(["Test.txt", "file.BAT", "PROGRAM.exe"]);
        assert_eq!(warnings.len(), 3);

        let warnings = check_case_warnings(["TEST.TXT", "FILE.BAT", "PROGRAM.EXE"]);
        assert!(warnings.is_empty());
    }
}
