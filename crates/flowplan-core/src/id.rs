use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::borrow::Borrow;
use std::fmt;

/// Declares a string-backed identifier newtype.
///
/// All identifiers handed to the engine come from the graph editor or the
/// game-data catalog as strings, so they stay strings; the newtype only keeps
/// a recipe id from being passed where an item id is expected.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifies a node in the editor's graph snapshot.
    NodeId
);
string_id!(
    /// Identifies an edge (connection) in the editor's graph snapshot.
    EdgeId
);
string_id!(
    /// Identifies an item in the catalog.
    ItemId
);
string_id!(
    /// Identifies a recipe in the catalog.
    RecipeId
);
string_id!(
    /// Identifies a production machine in the catalog.
    MachineId
);
string_id!(
    /// Identifies a power generator in the catalog.
    GeneratorId
);

new_key_type! {
    /// Dense key for a node inside one propagation pass. Never leaves the pass.
    pub struct NodeKey;
}
