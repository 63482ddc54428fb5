//! Error types for link parsing, rule validation and settings loading
//!
//! The crate keeps three independent error families:
//! - **ParseError**: one link could not be turned into a descriptor. The batch
//!   orchestrator records it and moves on to the next link.
//! - **ValidationError**: user input for a manual rule or rule provider was
//!   rejected. Nothing is added to the workspace.
//! - **SettingsError**: the settings file could not be read or decoded.

use std::fmt;

/// Result type for link parsing operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while parsing a single proxy link
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Malformed link (e.g. no `://`, broken authority, bad SSR layout)
    InvalidFormat(String),
    /// Scheme is not one of the supported proxy protocols
    UnsupportedProtocol(String),
    /// JSON payload (legacy VMess blob) could not be decoded
    JsonParseError(String),
    /// Missing required field (host, port, ...)
    MissingField(String),
    /// Invalid field value (port out of range, cipher not allowed, ...)
    InvalidField(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            ParseError::UnsupportedProtocol(msg) => write!(f, "{}", msg),
            ParseError::JsonParseError(msg) => write!(f, "JSON parse error: {}", msg),
            ParseError::MissingField(msg) => write!(f, "Missing required field: {}", msg),
            ParseError::InvalidField(msg) => write!(f, "Invalid field value: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::JsonParseError(err.to_string())
    }
}

/// Rejected manual rule or rule provider input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required input was left empty
    MissingField(String),
    /// Domain does not look like `label.label`
    InvalidDomain(String),
    /// Keyword was empty after normalization
    EmptyKeyword,
    /// Keyword contains a path separator
    KeywordSlash,
    /// Value is neither an IPv4 address nor `ip/mask`
    InvalidCidr(String),
    /// Address part of a CIDR is not IPv4
    InvalidIpv4(String),
    /// CIDR mask is outside 0–32
    MaskRange(String),
    /// ASN is not a number
    AsnNotNumber(String),
    /// Process name was empty
    ProcessNameEmpty,
    /// Process name looks like a path
    ProcessNamePath,
    /// Process path was empty
    ProcessPathEmpty,
    /// Process path is not absolute
    ProcessPathNotAbsolute(String),
    /// A rule provider with this name already exists
    DuplicateName(String),
    /// Manual rule type is not one of the supported kinds
    UnknownRuleType(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField(field) => write!(f, "{} is required", field),
            ValidationError::InvalidDomain(v) => write!(f, "Invalid domain: {}", v),
            ValidationError::EmptyKeyword => write!(f, "Keyword must not be empty"),
            ValidationError::KeywordSlash => {
                write!(f, "Keyword must not contain '/' or '\\'")
            }
            ValidationError::InvalidCidr(v) => {
                write!(f, "Expected an IPv4 address or CIDR, got: {}", v)
            }
            ValidationError::InvalidIpv4(v) => write!(f, "Invalid IPv4 address: {}", v),
            ValidationError::MaskRange(v) => write!(f, "CIDR mask must be 0-32: {}", v),
            ValidationError::AsnNotNumber(v) => write!(f, "ASN must be a number: {}", v),
            ValidationError::ProcessNameEmpty => write!(f, "Process name must not be empty"),
            ValidationError::ProcessNamePath => {
                write!(f, "Process name must not contain a path; use PROCESS-PATH")
            }
            ValidationError::ProcessPathEmpty => write!(f, "Process path must not be empty"),
            ValidationError::ProcessPathNotAbsolute(v) => {
                write!(f, "Process path must be absolute: {}", v)
            }
            ValidationError::DuplicateName(v) => write!(f, "Name already exists: {}", v),
            ValidationError::UnknownRuleType(v) => write!(f, "Unknown rule type: {}", v),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while loading [`Settings`](crate::Settings)
#[derive(Debug)]
pub enum SettingsError {
    /// Settings file could not be read
    Io(std::io::Error),
    /// Settings JSON is malformed
    Json(serde_json::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io(err) => write!(f, "IO error: {}", err),
            SettingsError::Json(err) => write!(f, "JSON parse error: {}", err),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(err) => Some(err),
            SettingsError::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(err: std::io::Error) -> Self {
        SettingsError::Io(err)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        SettingsError::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_convert_and_display() {
        let err: ParseError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ParseError::JsonParseError(_)));
        assert!(err.to_string().starts_with("JSON parse error: "));
        assert_eq!(
            ParseError::MissingField("port".into()).to_string(),
            "Missing required field: port"
        );
        assert_eq!(
            ParseError::UnsupportedProtocol("Unsupported scheme: socks5".into()).to_string(),
            "Unsupported scheme: socks5"
        );
    }
}
