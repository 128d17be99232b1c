//! Catalog core for Folio.
//!
//! Holds the custody lifecycle of catalog records, the optimistic update
//! path built on version tokens, and the sort/page query engine. Storage is
//! reached only through the [`CatalogStore`] capability.

pub mod error;
pub mod executor;
pub mod mutation;
pub mod query;
pub mod record;
pub mod status;
pub mod store;

pub use error::{CatalogError, ErrorKind, NotFoundReason};
pub use executor::UpdateExecutor;
pub use mutation::UpdateRecord;
pub use query::{list, Page, PageQuery, QueryPlan, RecordSource, SortKey};
pub use record::{CatalogRecord, EditRequest, NewRecord, RecordId, RecordView, VersionToken};
pub use status::{is_valid_transition, Status};
pub use store::{CasOutcome, CatalogStore, StoreError};
