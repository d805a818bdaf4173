//! Identifier newtypes shared across the billing detection crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RecordStoreError, Result};

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parses an identifier from a string.
            ///
            /// # Errors
            ///
            /// Returns an error if the string is not a valid UUID.
            pub fn parse(s: &str) -> Result<Self> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| RecordStoreError::InvalidId {
                        reason: format!("invalid UUID: {e}"),
                    })
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Identifies a contractor account.
    AccountId
}

uuid_id! {
    /// Identifies a source record (receipt, scoped work, voice log, or invoice).
    SourceId
}

uuid_id! {
    /// Identifies an invoice.
    InvoiceId
}

uuid_id! {
    /// Identifies a project.
    ProjectId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_new_is_unique() {
        let a = AccountId::new();
        let b = AccountId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn source_id_parse_roundtrip() {
        let id = SourceId::new();
        let parsed = SourceId::parse(&id.to_string());
        assert!(parsed.is_ok());
        assert_eq!(parsed.ok(), Some(id));
    }

    #[test]
    fn invoice_id_parse_rejects_garbage() {
        let parsed = InvoiceId::parse("not-a-uuid");
        assert!(parsed.is_err());
    }

    #[test]
    fn project_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = ProjectId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn ids_serialize_as_uuid_strings() {
        let id = AccountId::new();
        let json = serde_json::to_string(&id);
        assert!(json.is_ok());
        assert!(json.unwrap().contains(&id.to_string()));
    }
}
