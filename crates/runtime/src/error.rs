use thiserror::Error;
use uiaquery_script::{DecodeError, EncodeError};
use uiaquery_xpath::ParseError;

use crate::channel::ChannelError;

/// WebDriver error code a [`QueryError`] is reported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidSelector,
    NoSuchElement,
    InvalidArgument,
    Timeout,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidSelector => "invalid selector",
            Self::NoSuchElement => "no such element",
            Self::InvalidArgument => "invalid argument",
            Self::Timeout => "timeout",
            Self::UnknownError => "unknown error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("no element matches '{0}'")]
    NoSuchElement(String),

    #[error("{message}")]
    InvalidArgument { function: Option<String>, message: String },

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl QueryError {
    /// Argument error raised by an XPath function, e.g.
    /// `Function substring() requires 2 or 3 arguments.`
    pub(crate) fn function(name: &str, requirement: &str) -> Self {
        Self::InvalidArgument {
            function: Some(name.to_owned()),
            message: format!("Function {name}() requires {requirement}."),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSelector(_) => ErrorKind::InvalidSelector,
            Self::NoSuchElement(_) => ErrorKind::NoSuchElement,
            Self::InvalidArgument { .. } | Self::Encode(_) => ErrorKind::InvalidArgument,
            Self::Channel(ChannelError::Timeout(_)) => ErrorKind::Timeout,
            Self::Decode(_) | Self::Channel(_) => ErrorKind::UnknownError,
        }
    }
}

impl From<ParseError> for QueryError {
    fn from(err: ParseError) -> Self {
        Self::InvalidSelector(err.to_string())
    }
}
