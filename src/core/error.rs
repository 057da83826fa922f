/// Snippet Error Module
///
/// This module defines the error types shared by every snippet. The corpus
/// follows a two-tier convention: an empty lookup is a normal outcome
/// (`Lookup::NoMatch`), and everything expressed as a `SnippetError` is fatal
/// to the running example.
use thiserror::Error;

/// Fatal error raised by any snippet step.
///
/// This enum covers every failure that aborts an example:
/// - Configuration loading and validation
/// - Connection acquisition and release
/// - Driver command failures
/// - BSON encoding and decoding
/// - Transaction and search index flows
/// - Output rendering
#[derive(Error, Debug)]
pub enum SnippetError {
    /// Missing or invalid configuration (URI, pool bounds, TLS files, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The deployment could not be reached or rejected the handshake
    #[error("Connection error: failed to reach deployment: {0}")]
    Connect(#[source] mongodb::error::Error),

    /// Any command error reported by the driver after connecting
    #[error("Driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// Encoding a Rust value into BSON failed
    #[error("BSON serialization error: {0}")]
    BsonSerialize(#[from] mongodb::bson::ser::Error),

    /// Decoding a BSON document into a Rust value failed
    #[error("BSON deserialization error: {0}")]
    BsonDeserialize(#[from] mongodb::bson::de::Error),

    /// A hex string was not a valid ObjectId
    #[error("Invalid ObjectId: {0}")]
    ObjectId(#[from] mongodb::bson::oid::Error),

    /// A field was missing or had an unexpected type
    #[error("Document field error: {0}")]
    Field(#[from] mongodb::bson::document::ValueAccessError),

    /// Transaction flow errors
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Search index management errors
    #[error("Search index error: {0}")]
    SearchIndex(String),

    /// A wall-clock deadline elapsed
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Illegal connection lifecycle transition
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Output rendering errors (unknown formats, ...)
    #[error("Output error: {0}")]
    Output(String),
}

/// Type alias for Result to use SnippetError as the error type.
pub type Result<T> = std::result::Result<T, SnippetError>;

/// Outcome of a point lookup.
///
/// A filter that matches nothing is an expected result, not an error, so it
/// is modelled as a value the caller branches on.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The filter matched a record
    Found(T),
    /// The filter matched nothing
    NoMatch,
}

impl<T> Lookup<T> {
    /// Returns `true` if a record was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Converts into an `Option`, discarding the distinction's name.
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NoMatch => None,
        }
    }

    /// Maps the found value, leaving `NoMatch` untouched.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NoMatch => Lookup::NoMatch,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(found) => Lookup::Found(found),
            None => Lookup::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = SnippetError::Config("You must set MONGODB_URI".to_string());
        assert!(config_err.to_string().contains("Configuration error"));

        let txn_err = SnippetError::Transaction("abort failed".to_string());
        assert!(txn_err.to_string().contains("Transaction error"));

        let timeout = SnippetError::Timeout("index never became queryable".to_string());
        assert!(timeout.to_string().starts_with("Timed out"));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "token file not found");
        let snippet_err: SnippetError = io_err.into();
        match snippet_err {
            SnippetError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }

        let json_err: std::result::Result<serde_json::Value, serde_json::Error> =
            serde_json::from_str("{ invalid json }");
        let snippet_err: SnippetError = json_err.unwrap_err().into();
        match snippet_err {
            SnippetError::Json(_) => {}
            _ => panic!("Expected JSON error"),
        }
    }

    #[test]
    fn test_field_access_conversion() {
        let doc = mongodb::bson::doc! { "name": "vector_index" };
        let err: SnippetError = doc.get_bool("queryable").unwrap_err().into();
        assert!(matches!(err, SnippetError::Field(_)));
    }

    #[test]
    fn test_lookup_from_option() {
        let found: Lookup<i32> = Some(7).into();
        assert_eq!(found, Lookup::Found(7));
        assert!(found.is_found());

        let missing: Lookup<i32> = None.into();
        assert_eq!(missing, Lookup::NoMatch);
        assert_eq!(missing.found(), None);
    }

    #[test]
    fn test_lookup_map_preserves_no_match() {
        let missing: Lookup<i32> = Lookup::NoMatch;
        assert_eq!(missing.map(|v| v * 2), Lookup::NoMatch);
        assert_eq!(Lookup::Found(2).map(|v| v * 2), Lookup::Found(4));
    }
}
