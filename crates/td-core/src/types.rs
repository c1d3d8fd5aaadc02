//! Identifier newtypes shared across the engine.
//!
//! The remote scheduling system hands out opaque string identifiers for
//! tickets, schedule entries, and members. Wrapping them keeps the three
//! spaces from being mixed up and rejects empty values at the boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for identifier types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The provided value was empty.
    #[error("{kind} id cannot be empty")]
    Empty { kind: &'static str },
}

macro_rules! remote_id {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier, rejecting empty values.
            pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
                let raw = raw.into();
                if raw.trim().is_empty() {
                    return Err(IdError::Empty { kind: $kind });
                }
                Ok(Self(raw))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

remote_id!(
    /// A service ticket identifier.
    TicketId, "ticket"
);

remote_id!(
    /// A schedule entry identifier assigned by the remote calendar.
    EntryId, "entry"
);

remote_id!(
    /// A member (technician) identifier.
    MemberId, "member"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_reject_empty_and_blank() {
        assert!(TicketId::new("").is_err());
        assert!(TicketId::new("   ").is_err());
        assert!(TicketId::new("339429").is_ok());
        assert!(MemberId::new("tchristensen").is_ok());
    }

    #[test]
    fn ticket_id_serde_roundtrip() {
        let id = TicketId::new("339429").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"339429\"");
        let parsed: TicketId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn ticket_id_serde_rejects_empty() {
        let parsed: Result<TicketId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn entry_id_display_matches_raw() {
        let id = EntryId::new("5512").unwrap();
        assert_eq!(id.to_string(), "5512");
        assert_eq!(id.as_str(), "5512");
    }
}
