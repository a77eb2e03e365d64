use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifies one remote record by logical type name and identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReference {
    logical_name: String,
    #[serde(default)]
    id: String,
}

impl RecordReference {
    /// Creates a record reference.
    #[must_use]
    pub fn new(logical_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            id: id.into(),
        }
    }

    /// Returns the logical type name of the referenced record.
    #[must_use]
    pub fn logical_name(&self) -> &str {
        self.logical_name.as_str()
    }

    /// Returns the unique identifier of the referenced record.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns whether the reference carries a non-blank identifier.
    #[must_use]
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

/// Remote record projection: a reference plus its fetched attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    reference: RecordReference,
    attributes: Map<String, Value>,
}

impl Record {
    /// Creates a record projection.
    #[must_use]
    pub fn new(reference: RecordReference, attributes: Map<String, Value>) -> Self {
        Self {
            reference,
            attributes,
        }
    }

    /// Returns the record reference.
    #[must_use]
    pub fn reference(&self) -> &RecordReference {
        &self.reference
    }

    /// Returns all fetched attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns one attribute value, if fetched.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Consumes the record and returns its attributes.
    #[must_use]
    pub fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }
}
