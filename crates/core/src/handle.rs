//! Handle (username) shape rules
//!
//! Handles are lowercase ASCII letters, digits and underscores. Shape checks
//! run locally; a handle that fails them never reaches the remote directory.

use std::fmt;

/// Result of a local shape check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleShape {
    Valid,
    TooShort { len: usize, min: usize },
    TooLong { len: usize, max: usize },
    InvalidCharacter(char),
}

impl HandleShape {
    pub fn is_valid(&self) -> bool {
        matches!(self, HandleShape::Valid)
    }
}

impl fmt::Display for HandleShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleShape::Valid => write!(f, "valid"),
            HandleShape::TooShort { len, min } => {
                write!(f, "too short ({len} characters, minimum {min})")
            }
            HandleShape::TooLong { len, max } => {
                write!(f, "too long ({len} characters, maximum {max})")
            }
            HandleShape::InvalidCharacter(c) => {
                write!(f, "'{c}' is not allowed (use a-z, 0-9 and _)")
            }
        }
    }
}

/// Length bounds for handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleRules {
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for HandleRules {
    fn default() -> Self {
        Self {
            min_len: 3,
            max_len: 30,
        }
    }
}

impl HandleRules {
    /// Check a candidate against the character class and length bounds
    ///
    /// Character violations are reported before length violations so the
    /// inline hint points at the thing the user has to fix first.
    pub fn check(&self, candidate: &str) -> HandleShape {
        if let Some(bad) = candidate.chars().find(|c| !is_handle_char(*c)) {
            return HandleShape::InvalidCharacter(bad);
        }

        // Character class is ASCII-only, so bytes == chars here
        let len = candidate.len();
        if len < self.min_len {
            return HandleShape::TooShort {
                len,
                min: self.min_len,
            };
        }
        if len > self.max_len {
            return HandleShape::TooLong {
                len,
                max: self.max_len,
            };
        }

        HandleShape::Valid
    }

    pub fn is_valid(&self, candidate: &str) -> bool {
        self.check(candidate).is_valid()
    }
}

fn is_handle_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

/// Normalize raw handle input from the text field (trim + lowercase)
pub fn normalize_handle_input(raw: &str) -> String {
    raw.trim().to_lowercase()
}
