//! Identifier parsing.
//!
//! Top-level documents are keyed by BSON ObjectIds, while the line and process
//! entries nested inside a plan carry the same 24-hex-digit shape stored as
//! plain strings. Both are validated here before a pipeline is built.

use std::fmt;

use bson::oid::ObjectId;

use crate::error::{LookupError, Result};

/// Length of an ObjectId in hex digits.
pub const HEX_ID_LEN: usize = 24;

/// Parse `value` as an ObjectId, naming `field` in the error.
pub fn parse_object_id(field: &'static str, value: &str) -> Result<ObjectId> {
    ObjectId::parse_str(value.trim()).map_err(|_| LookupError::InvalidIdentifier {
        field,
        value: value.to_string(),
    })
}

/// A 24-hex-digit identifier stored as a string, e.g. `line.id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HexId(String);

impl HexId {
    /// Validate and wrap a string identifier.
    ///
    /// Stored ids are lowercase hex and compared verbatim, so the input is
    /// lowercased the same way an ObjectId would be.
    pub fn parse(field: &'static str, value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.len() == HEX_ID_LEN && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(LookupError::InvalidIdentifier {
                field,
                value: value.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_id() {
        let oid = parse_object_id("plan id", "584533a47d89971ad460daa1").unwrap();
        assert_eq!(oid.to_hex(), "584533a47d89971ad460daa1");

        // Surrounding whitespace from shell input is tolerated
        assert!(parse_object_id("plan id", " 584533a47d89971ad460daa1\n").is_ok());
    }

    #[test]
    fn test_parse_object_id_rejects_bad_input() {
        for bad in ["", "584533a47d89971ad460daa", "zz4533a47d89971ad460daa1", "plan"] {
            let err = parse_object_id("plan id", bad).unwrap_err();
            assert!(matches!(
                err,
                LookupError::InvalidIdentifier { field: "plan id", .. }
            ));
        }
    }

    #[test]
    fn test_hex_id() {
        let id = HexId::parse("line id", "584533d07d89971ad460daa2").unwrap();
        assert_eq!(id.as_str(), "584533d07d89971ad460daa2");
        assert_eq!(id.to_string(), "584533d07d89971ad460daa2");

        assert!(HexId::parse("line id", "584533d07d89971ad460daa2ff").is_err());
        assert!(HexId::parse("line id", "line-one").is_err());
    }

    #[test]
    fn test_hex_id_is_lowercased() {
        let id = HexId::parse("process id", " 584533D07D89971AD460DAA4 ").unwrap();
        assert_eq!(id.as_str(), "584533d07d89971ad460daa4");
    }
}
