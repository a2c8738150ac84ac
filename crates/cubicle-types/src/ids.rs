//! Identifier types.
//!
//! Sessions are keyed by a UUID v7 wrapper. Projects and NPCs keep the
//! short human-authored string keys used by the content catalogs (for
//! example `Genshin` or `NPC_0011`), wrapped in distinct newtypes so a
//! project key can never be passed where an NPC key is expected.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

/// Generates a newtype wrapper around a catalog string key.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a catalog key.
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Borrow the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a player session.
    SessionId
}

define_key! {
    /// Catalog key of a project (e.g. `Genshin`, `NEW_104`).
    ProjectId
}

define_key! {
    /// Catalog key of a non-player character (e.g. `NPC_0011`).
    NpcId
}

impl ProjectId {
    /// Pseudo-project that NPCs without a team belong to.
    pub const GENERAL: &'static str = "General";
    /// Pseudo-project for the HR department.
    pub const HR: &'static str = "HR";

    /// Whether this key names a pseudo-project rather than a real one.
    pub fn is_pseudo(&self) -> bool {
        self.0 == Self::GENERAL || self.0 == Self::HR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn keys_serialize_as_plain_strings() {
        let id = ProjectId::from("Genshin");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"Genshin\"");
        let back: Result<ProjectId, _> = serde_json::from_str(&json);
        assert_eq!(back.ok(), Some(id));
    }

    #[test]
    fn pseudo_projects_are_recognized() {
        assert!(ProjectId::from("General").is_pseudo());
        assert!(ProjectId::from("HR").is_pseudo());
        assert!(!ProjectId::from("HSR").is_pseudo());
    }
}
