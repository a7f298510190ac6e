//! Durable entity records and their typed identifiers.
//!
//! Every entity is identified by an opaque, uuid-backed string id. The ids
//! are distinct newtypes so a `TagId` can never be passed where a `FileId`
//! is expected. Records are plain serde structs; ownership of each kind
//! lives in its domain store, and cross-entity links are ids, never
//! embedded copies.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known identity of the root tag collection.
///
/// The root always exists after initialization and is never deleted.
pub const ROOT_COLLECTION_ID: &str = "root";

/// Display name of the root tag collection.
pub const ROOT_COLLECTION_NAME: &str = "Hierarchy";

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random id.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// View the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id! {
    /// Identifier of a [`FileRecord`].
    FileId
}

entity_id! {
    /// Identifier of a [`TagRecord`].
    TagId
}

entity_id! {
    /// Identifier of a [`CollectionRecord`].
    CollectionId
}

impl CollectionId {
    /// The well-known id of the root collection.
    pub fn root() -> Self {
        Self(ROOT_COLLECTION_ID.to_owned())
    }

    /// Returns `true` if this is the root collection's id.
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_COLLECTION_ID
    }
}

/// A tracked media file.
///
/// The `tags` field carries set semantics over an ordered `Vec`: attaching
/// an already-present tag is a no-op. Entries may dangle (refer to a tag
/// that no longer exists); readers filter them out instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique identity, stable for the lifetime of the record.
    pub id: FileId,
    /// Absolute filesystem location. Mutable if the file moves.
    pub path: PathBuf,
    /// When the file was imported.
    pub date_added: DateTime<Utc>,
    /// Ids of the tags attached to this file (references, not copies).
    pub tags: Vec<TagId>,
}

impl FileRecord {
    /// Build a new record with a generated id and no tags.
    pub fn new(path: impl Into<PathBuf>, date_added: DateTime<Utc>) -> Self {
        Self {
            id: FileId::generate(),
            path: path.into(),
            date_added,
            tags: Vec::new(),
        }
    }

    /// Attach a tag. Returns `false` if it was already attached.
    pub fn attach_tag(&mut self, tag: TagId) -> bool {
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Detach a tag. Returns `false` if it was not attached.
    pub fn detach_tag(&mut self, tag: &TagId) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }
}

/// A tag that can be attached to files and grouped into collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Unique identity.
    pub id: TagId,
    /// Display name. Uniqueness is a policy of the resolution service,
    /// not a storage constraint -- duplicates can exist.
    pub name: String,
    /// When the tag was created.
    pub date_added: DateTime<Utc>,
}

impl TagRecord {
    /// Build a new tag with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TagId::generate(),
            name: name.into(),
            date_added: Utc::now(),
        }
    }
}

/// An ordered grouping of tags and child collections (a tree node).
///
/// Collections hold references to tags, not ownership: a tag may appear in
/// zero or more collections and deleting a collection does not delete its
/// tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    /// Unique identity. The root uses [`ROOT_COLLECTION_ID`].
    pub id: CollectionId,
    /// Display name.
    pub name: String,
    /// When the collection was created.
    pub date_added: DateTime<Utc>,
    /// Ordered child collections.
    pub subcollections: Vec<CollectionId>,
    /// Ordered child tags.
    pub tags: Vec<TagId>,
}

impl CollectionRecord {
    /// Build a new collection with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CollectionId::generate(),
            name: name.into(),
            date_added: Utc::now(),
            subcollections: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Build the root collection with its well-known id and name.
    pub fn root() -> Self {
        Self {
            id: CollectionId::root(),
            name: ROOT_COLLECTION_NAME.to_owned(),
            date_added: Utc::now(),
            subcollections: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Add a tag reference. Returns `false` if it was already present.
    pub fn attach_tag(&mut self, tag: TagId) -> bool {
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Remove a tag reference. Returns `false` if it was not present.
    pub fn detach_tag(&mut self, tag: &TagId) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }
}
