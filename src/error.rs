//! Error taxonomy for the core (spec §7).
//!
//! Recoverable kinds (`DuplicateKey`, `NegativeId`, `StringTooLong`,
//! `SyntaxError`) are meant to be caught by the shell and reported to the
//! user without terminating the process. Every other kind is fatal.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The database file could not be opened.
    OpenFailed(String),
    /// The file length is not a whole multiple of `PAGE_SIZE`.
    CorruptFile(String),
    /// A read/write/seek against the backing file failed.
    Io(std::io::Error),
    /// A page number was requested outside `0..TABLE_MAX_PAGES`.
    PageOutOfBounds { page_num: u32, max: u32 },
    /// An internal node's child index exceeded `num_keys`.
    BadChildIndex { index: u32, num_keys: u32 },
    /// An insert targeted a key that already exists.
    DuplicateKey(u32),
    /// `prepare_insert` was given a negative id.
    NegativeId(i64),
    /// `prepare_insert` was given a string longer than its column capacity.
    StringTooLong { field: &'static str, max: usize },
    /// The shell could not parse a statement.
    SyntaxError(String),
    /// A non-root leaf filled and would require an internal-node split,
    /// which this version of the core does not implement (spec §9).
    UnsupportedSplit,
}

impl Error {
    /// Whether the shell should report this and keep looping, as opposed
    /// to terminating the process (spec §7).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DuplicateKey(_)
                | Error::NegativeId(_)
                | Error::StringTooLong { .. }
                | Error::SyntaxError(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OpenFailed(msg) => write!(f, "failed to open database file: {msg}"),
            Error::CorruptFile(msg) => write!(f, "corrupt database file: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::PageOutOfBounds { page_num, max } => {
                write!(f, "page {page_num} is out of bounds (max {max})")
            }
            Error::BadChildIndex { index, num_keys } => {
                write!(f, "child index {index} exceeds num_keys {num_keys}")
            }
            Error::DuplicateKey(key) => write!(f, "duplicate key: {key}"),
            Error::NegativeId(id) => write!(f, "id must not be negative: {id}"),
            Error::StringTooLong { field, max } => {
                write!(f, "{field} exceeds the maximum of {max} bytes")
            }
            Error::SyntaxError(msg) => write!(f, "syntax error: {msg}"),
            Error::UnsupportedSplit => {
                write!(f, "splitting an internal node is not supported")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_kinds_are_flagged() {
        assert!(Error::DuplicateKey(1).is_recoverable());
        assert!(Error::NegativeId(-1).is_recoverable());
        assert!(Error::SyntaxError("x".into()).is_recoverable());
        assert!(Error::StringTooLong {
            field: "username",
            max: 32
        }
        .is_recoverable());
    }

    #[test]
    fn fatal_kinds_are_not_flagged() {
        assert!(!Error::UnsupportedSplit.is_recoverable());
        assert!(!Error::PageOutOfBounds { page_num: 1, max: 1 }.is_recoverable());
        assert!(!Error::CorruptFile("x".into()).is_recoverable());
    }
}
