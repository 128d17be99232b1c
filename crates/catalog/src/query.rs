//! Sorted, paginated listing over any record source.
//!
//! A [`QueryPlan`] describes the sort key and the page window. Sources that
//! hold records in memory apply it directly with [`QueryPlan::apply`];
//! deferred sources (a store, a remote cursor) translate the same plan into
//! their own reads. Either way [`list`] sees the same contract.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CatalogError;
use crate::record::{CatalogRecord, RecordView};
use crate::store::StoreError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Field a listing is ordered by. Ordering is always ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Id,
    Title,
    Author,
    CatalogNumber,
    Status,
}

impl SortKey {
    /// Resolve a caller-supplied key, case-insensitively. Anything
    /// unrecognized, including no key at all, orders by identifier.
    pub fn resolve(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return SortKey::Id;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "title" => SortKey::Title,
            "author" => SortKey::Author,
            "catalog_number" | "catalog-number" | "catalognumber" | "isbn" => {
                SortKey::CatalogNumber
            }
            "status" => SortKey::Status,
            _ => SortKey::Id,
        }
    }

    /// Compare two records on this key alone. Absent authors sort first.
    pub fn compare(self, a: &CatalogRecord, b: &CatalogRecord) -> Ordering {
        match self {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Title => a.title.cmp(&b.title),
            SortKey::Author => a.author.cmp(&b.author),
            SortKey::CatalogNumber => a.catalog_number.cmp(&b.catalog_number),
            SortKey::Status => a.status.cmp(&b.status),
        }
    }
}

/// Sort key plus page window, applied in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryPlan {
    pub sort: SortKey,
    pub skip: usize,
    pub take: Option<usize>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sorted_by(mut self, key: SortKey) -> Self {
        self.sort = key;
        self
    }

    /// Drop `n` more leading records from whatever the plan yields so far.
    pub fn skip(mut self, n: usize) -> Self {
        self.skip = self.skip.saturating_add(n);
        self.take = self.take.map(|take| take.saturating_sub(n));
        self
    }

    /// Yield at most `n` records from whatever the plan yields so far.
    pub fn take(mut self, n: usize) -> Self {
        self.take = Some(self.take.map_or(n, |take| take.min(n)));
        self
    }

    /// Apply the plan to records already in hand. Sorting is stable, so
    /// ties keep the order the records arrived in.
    pub fn apply<I>(&self, records: I) -> Vec<CatalogRecord>
    where
        I: IntoIterator<Item = CatalogRecord>,
    {
        let mut records: Vec<CatalogRecord> = records.into_iter().collect();
        let key = self.sort;
        records.sort_by(|a, b| key.compare(a, b));
        records
            .into_iter()
            .skip(self.skip)
            .take(self.take.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Anything the query engine can list from.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn count(&self) -> Result<u64, StoreError>;

    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<CatalogRecord>, StoreError>;
}

#[async_trait]
impl RecordSource for Vec<CatalogRecord> {
    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.len() as u64)
    }

    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<CatalogRecord>, StoreError> {
        Ok(plan.apply(self.iter().cloned()))
    }
}

/// Listing request as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub sort_by: Option<String>,
    pub page: i64,
    pub page_size: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            sort_by: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageQuery {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            sort_by: None,
            page,
            page_size,
        }
    }

    pub fn sorted_by(mut self, key: impl Into<String>) -> Self {
        self.sort_by = Some(key.into());
        self
    }

    /// Translate into a plan, rejecting page numbers or sizes below 1.
    pub fn plan(&self) -> Result<QueryPlan, CatalogError> {
        if self.page < 1 {
            return Err(CatalogError::InvalidPage {
                field: "page",
                value: self.page,
            });
        }
        if self.page_size < 1 {
            return Err(CatalogError::InvalidPage {
                field: "page_size",
                value: self.page_size,
            });
        }

        let size = self.page_size as u64;
        let skip = (self.page as u64 - 1).saturating_mul(size);
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = usize::try_from(size).unwrap_or(usize::MAX);

        Ok(QueryPlan::new()
            .sorted_by(SortKey::resolve(self.sort_by.as_deref()))
            .skip(skip)
            .take(take))
    }
}

/// One window of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub total_items: u64,
    pub page: i64,
    pub page_size: i64,
    pub items: Vec<T>,
}

/// List one page of `source` as external record views.
pub async fn list<S>(source: &S, query: &PageQuery) -> Result<Page<RecordView>, CatalogError>
where
    S: RecordSource + ?Sized,
{
    let plan = query.plan()?;
    let total_items = source.count().await?;
    let items = source
        .fetch(&plan)
        .await?
        .iter()
        .map(RecordView::from)
        .collect();

    Ok(Page {
        total_items,
        page: query.page,
        page_size: query.page_size,
        items,
    })
}
