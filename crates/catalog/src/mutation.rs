use crate::record::{CatalogRecord, EditRequest, VersionToken};
use crate::status::Status;

/// Fully-formed write for one record, guarded by the token the writer
/// expects to find in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    pub title: String,
    pub author: Option<String>,
    pub status: Status,
    pub expected_version: VersionToken,
}

impl UpdateRecord {
    /// Build the write for `edit`. The builder never reads storage; the
    /// caller picks `expected_version`.
    pub fn build(edit: &EditRequest, expected_version: VersionToken) -> Self {
        Self {
            title: edit.title.clone(),
            author: edit.author.clone(),
            status: edit.status,
            expected_version,
        }
    }

    /// Overwrite the mutable fields of `record`. An absent author clears the
    /// stored one.
    pub fn apply_to(&self, record: &mut CatalogRecord) {
        record.title = self.title.clone();
        record.author = self.author.clone();
        record.status = self.status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> CatalogRecord {
        CatalogRecord {
            id: 7,
            title: "Dune".into(),
            author: Some("Frank Herbert".into()),
            catalog_number: "978-0441013593".into(),
            status: Status::OnShelf,
            version: VersionToken::fresh(),
        }
    }

    #[test]
    fn carries_the_chosen_token() {
        let record = loaded();
        let edit = EditRequest::new("Dune", None, Status::Borrowed);
        let update = UpdateRecord::build(&edit, record.version);
        assert_eq!(update.expected_version, record.version);
        assert_eq!(update.status, Status::Borrowed);
    }

    #[test]
    fn absent_author_is_cleared_not_kept() {
        let mut record = loaded();
        let edit = EditRequest::new("Dune Messiah", None, Status::Damaged);
        UpdateRecord::build(&edit, record.version).apply_to(&mut record);

        assert_eq!(record.title, "Dune Messiah");
        assert_eq!(record.author, None);
        assert_eq!(record.status, Status::Damaged);
        assert_eq!(record.catalog_number, "978-0441013593");
    }

    #[test]
    fn same_snapshot_yields_same_expected_token() {
        let record = loaded();
        let a = UpdateRecord::build(&EditRequest::new("A", None, Status::Borrowed), record.version);
        let b = UpdateRecord::build(&EditRequest::new("B", None, Status::Damaged), record.version);
        assert_eq!(a.expected_version, b.expected_version);
    }
}
