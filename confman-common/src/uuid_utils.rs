//! UUID utilities
//!
//! Record identifiers are UUIDv4 values stored as hyphenated text.

use uuid::Uuid;

use crate::{Error, Result};

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a record identifier taken from a URL path
///
/// Malformed identifiers are reported as not found: no record can carry them.
pub fn parse_id(s: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| Error::NotFound(format!("{} {}", what, s)))
}

/// Parse an identifier carried in a request body field
pub fn parse_field_id(s: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim())
        .map_err(|_| Error::validation(field, format!("{} must be a valid identifier", field)))
}

/// Parse an identifier read back from storage
pub fn parse_stored(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Corrupt id '{}': {}", s, e)))
}
