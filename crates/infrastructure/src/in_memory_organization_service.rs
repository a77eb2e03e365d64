use std::collections::HashMap;

use async_trait::async_trait;
use dynakit_application::{ColumnSet, OrganizationService};
use dynakit_core::{AppError, AppResult, NonEmptyString};
use dynakit_domain::{Record, RecordReference};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory organization service implementation.
#[derive(Debug, Default)]
pub struct InMemoryOrganizationService {
    records: RwLock<HashMap<(String, String), Map<String, Value>>>,
}

impl InMemoryOrganizationService {
    /// Creates an empty in-memory service.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Stores a record under an explicit reference, replacing any previous attributes.
    pub async fn insert_record(&self, reference: &RecordReference, attributes: Map<String, Value>) {
        self.records.write().await.insert(
            storage_key(reference.logical_name(), reference.id()),
            attributes,
        );
    }

    /// Returns the stored attributes of one record.
    pub async fn record(&self, logical_name: &str, id: &str) -> Option<Map<String, Value>> {
        self.records
            .read()
            .await
            .get(&storage_key(logical_name, id))
            .cloned()
    }
}

#[async_trait]
impl OrganizationService for InMemoryOrganizationService {
    async fn retrieve(
        &self,
        logical_name: &str,
        id: &str,
        columns: &ColumnSet,
    ) -> AppResult<Record> {
        let records = self.records.read().await;
        let attributes = records
            .get(&storage_key(logical_name, id))
            .ok_or_else(|| record_not_found(logical_name, id))?;

        let selected = attributes
            .iter()
            .filter(|(name, _)| columns.includes(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(Record::new(RecordReference::new(logical_name, id), selected))
    }

    async fn update(
        &self,
        logical_name: &str,
        id: &str,
        attributes: Map<String, Value>,
    ) -> AppResult<()> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&storage_key(logical_name, id))
            .ok_or_else(|| record_not_found(logical_name, id))?;

        stored.extend(attributes);
        Ok(())
    }

    async fn create(
        &self,
        logical_name: &str,
        attributes: Map<String, Value>,
    ) -> AppResult<String> {
        let logical_name = NonEmptyString::new(logical_name)?;
        let id = Uuid::new_v4().to_string();

        self.records
            .write()
            .await
            .insert(storage_key(logical_name.as_str(), id.as_str()), attributes);

        Ok(id)
    }
}

fn storage_key(logical_name: &str, id: &str) -> (String, String) {
    (logical_name.to_owned(), id.to_ascii_lowercase())
}

fn record_not_found(logical_name: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{logical_name} record '{id}' does not exist"))
}

#[cfg(test)]
mod tests {
    use dynakit_application::{ColumnSet, OrganizationService};
    use dynakit_core::AppError;
    use dynakit_domain::RecordReference;
    use serde_json::{Map, Value, json};

    use super::InMemoryOrganizationService;

    fn attributes(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn retrieve_honours_column_selection() {
        let service = InMemoryOrganizationService::new();
        let reference = RecordReference::new("account", "A-1");
        service
            .insert_record(&reference, attributes(json!({"name": "Contoso", "revenue": 10})))
            .await;

        let all = service.retrieve("account", "a-1", &ColumnSet::All).await;
        assert!(all.is_ok());
        assert_eq!(all.map(|record| record.attributes().len()).unwrap_or_default(), 2);

        let selected = service
            .retrieve("account", "A-1", &ColumnSet::Columns(vec!["name".to_owned()]))
            .await;
        assert!(selected.is_ok());
        let selected = selected.unwrap_or_else(|_| unreachable!());
        assert_eq!(selected.attribute("name"), Some(&json!("Contoso")));
        assert_eq!(selected.attribute("revenue"), None);
    }

    #[tokio::test]
    async fn update_merges_partial_attributes() {
        let service = InMemoryOrganizationService::new();
        let reference = RecordReference::new("account", "a-1");
        service
            .insert_record(&reference, attributes(json!({"name": "Contoso", "statecode": 0})))
            .await;

        let updated = service
            .update("account", "a-1", attributes(json!({"statecode": 1, "description": "x"})))
            .await;
        assert!(updated.is_ok());

        let stored = service.record("account", "a-1").await.unwrap_or_default();
        assert_eq!(
            stored,
            attributes(json!({"name": "Contoso", "statecode": 1, "description": "x"}))
        );
    }

    #[tokio::test]
    async fn missing_records_are_reported_as_not_found() {
        let service = InMemoryOrganizationService::new();

        let retrieved = service.retrieve("account", "nope", &ColumnSet::All).await;
        assert!(matches!(retrieved, Err(AppError::NotFound(_))));

        let updated = service.update("account", "nope", Map::new()).await;
        assert!(matches!(updated, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_assigns_retrievable_identifier() {
        let service = InMemoryOrganizationService::new();

        let created = service
            .create("annotation", attributes(json!({"subject": "Action Execution Note"})))
            .await;
        assert!(created.is_ok());
        let id = created.unwrap_or_default();
        assert_eq!(id.len(), 36);

        let retrieved = service.retrieve("annotation", &id, &ColumnSet::All).await;
        assert!(retrieved.is_ok());
    }

    #[tokio::test]
    async fn create_rejects_blank_logical_name() {
        let service = InMemoryOrganizationService::new();
        let created = service.create("  ", Map::new()).await;
        assert!(matches!(created, Err(AppError::Validation(_))));
    }
}
