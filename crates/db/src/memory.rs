use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use folio_catalog::{
    CasOutcome, CatalogRecord, CatalogStore, NewRecord, QueryPlan, RecordId, RecordSource,
    Status, StoreError, UpdateRecord, VersionToken,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    next_id: RecordId,
    records: BTreeMap<RecordId, CatalogRecord>,
    catalog_numbers: HashMap<String, RecordId>,
}

/// Process-local catalog store.
///
/// Records are kept in identifier order, which is also the natural order
/// listings fall back to on ties. Writes take the table lock for their whole
/// check-and-set, so a compare-and-swap can never interleave with another
/// write.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordSource for MemoryStore {
    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.tables.read().await.records.len() as u64)
    }

    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<CatalogRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(plan.apply(tables.records.values().cloned()))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn load_by_id(&self, id: RecordId) -> Result<Option<CatalogRecord>, StoreError> {
        Ok(self.tables.read().await.records.get(&id).cloned())
    }

    async fn insert(&self, record: NewRecord) -> Result<CatalogRecord, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.catalog_numbers.contains_key(&record.catalog_number) {
            return Err(StoreError::DuplicateCatalogNumber(record.catalog_number));
        }

        tables.next_id += 1;
        let stored = CatalogRecord {
            id: tables.next_id,
            title: record.title,
            author: record.author,
            catalog_number: record.catalog_number,
            status: Status::OnShelf,
            version: VersionToken::fresh(),
        };
        tables
            .catalog_numbers
            .insert(stored.catalog_number.clone(), stored.id);
        tables.records.insert(stored.id, stored.clone());

        tracing::debug!(target: "folio-db", record_id = stored.id, "record inserted");
        Ok(stored)
    }

    async fn compare_and_swap(
        &self,
        id: RecordId,
        update: &UpdateRecord,
    ) -> Result<CasOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.records.get_mut(&id) else {
            tracing::debug!(target: "folio-db", record_id = id, "write raced a delete");
            return Ok(CasOutcome::Conflict(None));
        };

        if stored.version != update.expected_version {
            tracing::debug!(
                target: "folio-db",
                record_id = id,
                stored = %stored.version,
                expected = %update.expected_version,
                "version mismatch"
            );
            return Ok(CasOutcome::Conflict(Some(stored.clone())));
        }

        update.apply_to(stored);
        stored.version = VersionToken::fresh();
        Ok(CasOutcome::Written(stored.version))
    }

    async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(removed) = tables.records.remove(&id) else {
            return Ok(false);
        };
        tables.catalog_numbers.remove(&removed.catalog_number);

        tracing::debug!(target: "folio-db", record_id = id, "record deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use folio_catalog::{list, CatalogError, EditRequest, PageQuery, RecordView, UpdateExecutor};

    fn book(title: &str, number: &str) -> NewRecord {
        NewRecord {
            title: title.to_string(),
            author: None,
            catalog_number: number.to_string(),
        }
    }

    #[tokio::test]
    async fn inserted_records_start_on_shelf_with_ascending_ids() {
        let store = MemoryStore::new();
        let first = store.insert(book("Emma", "A-1")).await.unwrap();
        let second = store.insert(book("Persuasion", "A-2")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.status, Status::OnShelf);
        assert_ne!(first.version, second.version);
    }

    #[tokio::test]
    async fn duplicate_catalog_number_is_rejected() {
        let store = MemoryStore::new();
        store.insert(book("Emma", "A-1")).await.unwrap();

        let err = store.insert(book("Emma (reprint)", "A-1")).await.unwrap_err();
        assert_eq!(err, StoreError::DuplicateCatalogNumber("A-1".into()));
    }

    #[tokio::test]
    async fn catalog_number_is_reusable_after_delete() {
        let store = MemoryStore::new();
        let record = store.insert(book("Emma", "A-1")).await.unwrap();

        assert!(store.delete(record.id).await.unwrap());
        assert!(!store.delete(record.id).await.unwrap());
        assert!(store.insert(book("Emma", "A-1")).await.is_ok());
    }

    #[tokio::test]
    async fn stale_token_does_not_write() {
        let store = MemoryStore::new();
        let record = store.insert(book("Emma", "A-1")).await.unwrap();
        let edit = EditRequest::new("Emma", None, Status::Borrowed);

        let first = UpdateRecord::build(&edit, record.version);
        let CasOutcome::Written(new_version) = store.compare_and_swap(record.id, &first).await.unwrap()
        else {
            panic!("first write must succeed");
        };

        let replay = store.compare_and_swap(record.id, &first).await.unwrap();
        let current = store.load_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(replay, CasOutcome::Conflict(Some(current.clone())));
        assert_eq!(current.version, new_version);
        assert_eq!(current.status, Status::Borrowed);
    }

    #[tokio::test]
    async fn write_to_missing_record_reports_absence() {
        let store = MemoryStore::new();
        let edit = EditRequest::new("Ghost", None, Status::Borrowed);
        let update = UpdateRecord::build(&edit, VersionToken::fresh());

        let outcome = store.compare_and_swap(42, &update).await.unwrap();
        assert_eq!(outcome, CasOutcome::Conflict(None));
    }

    #[tokio::test]
    async fn created_record_lists_without_its_token() {
        let store = MemoryStore::new();
        let created = store
            .insert(NewRecord {
                title: "Beloved".into(),
                author: Some("Toni Morrison".into()),
                catalog_number: "978-1400033416".into(),
            })
            .await
            .unwrap();

        let page = list(&store, &PageQuery::default()).await.unwrap();
        assert_eq!(page.items, vec![RecordView::from(&created)]);

        let json = serde_json::to_value(&page.items[0]).unwrap();
        assert_eq!(json["title"], "Beloved");
        assert_eq!(json["catalog_number"], "978-1400033416");
        assert_eq!(json["status"], "on_shelf");
        assert!(json.get("version").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_with_one_token_have_one_winner() {
        const WRITERS: usize = 8;
        let store = Arc::new(MemoryStore::new());
        let executor = UpdateExecutor::new(store.clone());

        for round in 0..50 {
            let record = store
                .insert(book("Emma", &format!("RACE-{round}")))
                .await
                .unwrap();
            let id = record.id;

            let handles: Vec<_> = (0..WRITERS)
                .map(|writer| {
                    let executor = executor.clone();
                    let edit = EditRequest::new(format!("Emma #{writer}"), None, Status::Borrowed)
                        .with_expected_version(record.version);
                    tokio::spawn(async move { executor.apply(id, &edit).await })
                })
                .collect();

            let mut winners = Vec::new();
            let mut conflicts = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(written) => winners.push(written),
                    Err(CatalogError::Conflict { .. }) => conflicts += 1,
                    Err(other) => panic!("round {round}: unexpected error {other:?}"),
                }
            }

            assert_eq!(winners.len(), 1, "round {round}");
            assert_eq!(conflicts, WRITERS - 1, "round {round}");
            let stored = store.load_by_id(id).await.unwrap().unwrap();
            assert_eq!(stored, winners[0]);
        }
    }
}
