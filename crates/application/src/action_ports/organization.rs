use async_trait::async_trait;
use dynakit_core::AppResult;
use dynakit_domain::Record;
use serde_json::{Map, Value};

/// Attribute selection for record retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnSet {
    /// Every attribute of the record.
    #[default]
    All,
    /// Only the named attributes.
    Columns(Vec<String>),
}

impl ColumnSet {
    /// Returns whether the attribute is part of the selection.
    #[must_use]
    pub fn includes(&self, attribute: &str) -> bool {
        match self {
            Self::All => true,
            Self::Columns(columns) => columns.iter().any(|column| column == attribute),
        }
    }
}

/// Port for the remote record-oriented organization service.
#[async_trait]
pub trait OrganizationService: Send + Sync {
    /// Fetches one record with the selected attributes.
    async fn retrieve(
        &self,
        logical_name: &str,
        id: &str,
        columns: &ColumnSet,
    ) -> AppResult<Record>;

    /// Writes a partial attribute update to an existing record.
    async fn update(
        &self,
        logical_name: &str,
        id: &str,
        attributes: Map<String, Value>,
    ) -> AppResult<()>;

    /// Creates a record and returns its identifier.
    async fn create(
        &self,
        logical_name: &str,
        attributes: Map<String, Value>,
    ) -> AppResult<String>;
}
