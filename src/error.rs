//! Error types reported by the reader.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// The kind of an [`Error`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input is not a valid ELF image, or lacks the required debug sections.
    CannotParseElf,

    /// The DWARF data inside the image is malformed.
    CannotParseDwarf,

    /// An internal invariant was violated.
    Logical,

    /// The input could not be read from the file system.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CannotParseElf => write!(f, "cannot parse ELF"),
            Self::CannotParseDwarf => write!(f, "cannot parse DWARF"),
            Self::Logical => write!(f, "logical error"),
            Self::Io => write!(f, "input error"),
        }
    }
}

/// An error produced while opening an image or decoding its debug entries.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn with_source<E>(kind: ErrorKind, message: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn io(source: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io, "failed to read input", source)
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<gimli::Error> for Error {
    fn from(e: gimli::Error) -> Self {
        Error::with_source(ErrorKind::CannotParseDwarf, "corrupted DWARF data", e)
    }
}
