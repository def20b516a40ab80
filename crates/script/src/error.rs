use thiserror::Error;

/// A literal that cannot be encoded for a search condition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("invalid runtime id '{0}'")]
    RuntimeId(String),

    #[error("unknown control type '{0}'")]
    ControlType(String),

    #[error("unknown orientation '{0}'")]
    Orientation(String),

    #[error("'{value}' is not a 32-bit integer (property {property})")]
    Int32 { property: &'static str, value: String },

    #[error("'{value}' is not a boolean (property {property})")]
    Boolean { property: &'static str, value: String },

    #[error("property {0} cannot be used in a search condition")]
    NotSearchable(&'static str),

    #[error("property {property} expects a {expected} value")]
    WrongKind { property: &'static str, expected: &'static str },
}

/// Remote output that does not have the shape the query promised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected element id '{0}' in remote output")]
    Id(String),

    #[error("malformed JSON in remote output: {0}")]
    Json(String),

    #[error("command is not a wrapped script")]
    NotWrapped,

    #[error("invalid base64 payload: {0}")]
    Base64(String),
}
