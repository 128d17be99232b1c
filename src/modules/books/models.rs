use folio_catalog::{EditRequest, NewRecord, PageQuery, Status};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Book as returned to clients. The version token travels in the `ETag`
/// header, never in the body.
pub use folio_catalog::RecordView as Book;

/// One page of the catalog listing.
pub type BookPage = folio_catalog::Page<Book>;

/// Request model for creating a new book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBook {
    /// Title of the book
    pub title: String,
    /// Author of the book, if known
    #[serde(default)]
    pub author: Option<String>,
    /// Catalog number (ISBN or shelf mark), unique across the catalog
    pub catalog_number: String,
}

impl CreateBook {
    /// Field-level problems, in the shape used for `validation_error` details.
    pub fn problems(&self) -> Vec<serde_json::Value> {
        let mut problems = Vec::new();
        if self.title.trim().is_empty() {
            problems.push(json!({"field": "title", "error": "required"}));
        }
        if self.catalog_number.trim().is_empty() {
            problems.push(json!({"field": "catalog_number", "error": "required"}));
        }
        problems
    }

    pub fn into_record(self) -> NewRecord {
        NewRecord {
            title: self.title,
            author: self.author,
            catalog_number: self.catalog_number,
        }
    }
}

/// Request model for editing a book. Every field is overwritten; leaving
/// `author` out clears it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBook {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    pub status: Status,
}

impl UpdateBook {
    pub fn problems(&self) -> Vec<serde_json::Value> {
        if self.title.trim().is_empty() {
            vec![json!({"field": "title", "error": "required"})]
        } else {
            Vec::new()
        }
    }

    pub fn into_edit(self) -> EditRequest {
        EditRequest::new(self.title, self.author, self.status)
    }
}

/// Query parameters accepted by the listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub sort_by: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListParams {
    pub fn into_query(self, default_sort: &str, default_page_size: i64) -> PageQuery {
        PageQuery {
            sort_by: Some(self.sort_by.unwrap_or_else(|| default_sort.to_string())),
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(default_page_size),
        }
    }
}
