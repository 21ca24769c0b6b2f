use std::fmt;
use std::string::FromUtf8Error;

use crate::markup::MarkupError;

/// Why a toggle did not apply. The document is untouched in every case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToggleError {
    /// There is no selection, or it is collapsed.
    NoActiveSelection,
    /// The selection does not lie inside the editable region.
    SelectionOutsideRegion,
    /// The request names neither a valid tag nor a single CSS declaration.
    InvalidStyleRequest(String),
    /// The selected content is not a linear chain of wrappers around text.
    MalformedSubtree(String),
}

impl fmt::Display for ToggleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleError::NoActiveSelection => write!(f, "no active selection"),
            ToggleError::SelectionOutsideRegion => {
                write!(f, "selection is outside the editable region")
            }
            ToggleError::InvalidStyleRequest(reason) => {
                write!(f, "invalid style request: {reason}")
            }
            ToggleError::MalformedSubtree(reason) => {
                write!(f, "selection spans mixed formatting: {reason}")
            }
        }
    }
}

impl std::error::Error for ToggleError {}

/// Failure to restore stored content.
#[derive(Debug)]
pub enum PersistError {
    Decode(base64::DecodeError),
    Utf8(FromUtf8Error),
    Markup(MarkupError),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Decode(err) => write!(f, "stored content is not valid base64: {err}"),
            PersistError::Utf8(err) => write!(f, "stored content is not valid UTF-8: {err}"),
            PersistError::Markup(err) => write!(f, "stored content is not valid markup: {err}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Decode(err) => Some(err),
            PersistError::Utf8(err) => Some(err),
            PersistError::Markup(err) => Some(err),
        }
    }
}

impl From<base64::DecodeError> for PersistError {
    fn from(err: base64::DecodeError) -> Self {
        PersistError::Decode(err)
    }
}

impl From<FromUtf8Error> for PersistError {
    fn from(err: FromUtf8Error) -> Self {
        PersistError::Utf8(err)
    }
}

impl From<MarkupError> for PersistError {
    fn from(err: MarkupError) -> Self {
        PersistError::Markup(err)
    }
}
