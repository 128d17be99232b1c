//! HTTP handlers for the Books module.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use folio_catalog::{
    list, CatalogError, CatalogStore, ErrorKind, RecordId, UpdateExecutor, VersionToken,
};
use folio_http::error::AppError;
use folio_kernel::settings::CatalogSettings;
use serde_json::json;

use super::models::{Book, BookPage, CreateBook, ListParams, UpdateBook};

/// Shared state handed to every books handler.
#[derive(Clone)]
pub struct BooksState {
    pub store: Arc<dyn CatalogStore>,
    pub executor: UpdateExecutor,
    pub defaults: Arc<CatalogSettings>,
}

impl BooksState {
    pub fn new(store: Arc<dyn CatalogStore>, defaults: CatalogSettings) -> Self {
        Self {
            executor: UpdateExecutor::new(store.clone()),
            store,
            defaults: Arc::new(defaults),
        }
    }
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(state)
}

/// Map a catalog outcome onto the uniform HTTP error body.
pub fn catalog_error(err: CatalogError) -> AppError {
    let message = err.to_string();
    match (err.kind(), err) {
        (_, CatalogError::Conflict { current }) => AppError::conflict(
            vec![json!({
                "current": Book::from(current.as_ref()),
                "version": current.version.to_string(),
            })],
            message,
        ),
        (_, CatalogError::InvalidTransition { current, requested }) => AppError::validation(
            vec![json!({
                "field": "status",
                "current": current,
                "requested": requested,
            })],
            message,
        ),
        (_, CatalogError::InvalidPage { field, value }) => AppError::validation(
            vec![json!({"field": field, "error": "must be at least 1", "value": value})],
            message,
        ),
        (_, CatalogError::DuplicateCatalogNumber(number)) => AppError::validation(
            vec![json!({"field": "catalog_number", "error": "must be unique", "value": number})],
            message,
        ),
        (ErrorKind::NotFound, _) => AppError::not_found(message),
        (ErrorKind::Infrastructure, _) => AppError::service_unavailable(message),
        (ErrorKind::Validation, _) | (ErrorKind::Conflict, _) => AppError::bad_request(message),
    }
}

fn etag(version: &VersionToken) -> Result<HeaderValue, AppError> {
    let value = HeaderValue::from_str(&format!("\"{}\"", version))
        .context("version token is not a valid header value")?;
    Ok(value)
}

/// Tokens listed in `If-Match`, if the client sent any. `*` matches any
/// version, so it yields no constraint.
fn expected_versions(headers: &HeaderMap) -> Result<Vec<VersionToken>, AppError> {
    let mut tokens = Vec::new();
    for raw in headers.get_all(header::IF_MATCH) {
        let raw = raw
            .to_str()
            .map_err(|_| AppError::bad_request("If-Match header is not valid text"))?;
        for tag in raw.split(',').map(str::trim).filter(|tag| !tag.is_empty()) {
            if tag == "*" {
                return Ok(Vec::new());
            }
            let token = tag
                .parse()
                .map_err(|err| AppError::bad_request(format!("If-Match: {err}")))?;
            tokens.push(token);
        }
    }
    Ok(tokens)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(
    State(state): State<BooksState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<BookPage>, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let query = params.into_query(&state.defaults.default_sort, state.defaults.default_page_size);

    let page = list(state.store.as_ref(), &query)
        .await
        .map_err(catalog_error)?;
    Ok(Json(page))
}

async fn get_book(
    State(state): State<BooksState>,
    id: Result<Path<RecordId>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let record = state
        .store
        .load_by_id(id)
        .await
        .map_err(|err| catalog_error(err.into()))?
        .ok_or_else(|| AppError::not_found(format!("record {id} does not exist")))?;

    Ok(([(header::ETAG, etag(&record.version)?)], Json(record.view())).into_response())
}

async fn create_book(
    State(state): State<BooksState>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let problems = payload.problems();
    if !problems.is_empty() {
        return Err(AppError::validation(problems, "book payload is invalid"));
    }

    let record = state
        .store
        .insert(payload.into_record())
        .await
        .map_err(|err| catalog_error(err.into()))?;

    tracing::info!(
        module = "books",
        record_id = record.id,
        catalog_number = %record.catalog_number,
        "book created"
    );

    let location = HeaderValue::from_str(&format!("/api/books/{}", record.id))
        .context("record location is not a valid header value")?;
    Ok((
        StatusCode::CREATED,
        [
            (header::LOCATION, location),
            (header::ETAG, etag(&record.version)?),
        ],
        Json(record.view()),
    )
        .into_response())
}

async fn update_book(
    State(state): State<BooksState>,
    id: Result<Path<RecordId>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let Json(payload) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let problems = payload.problems();
    if !problems.is_empty() {
        return Err(AppError::validation(problems, "book payload is invalid"));
    }

    let mut edit = payload.into_edit();
    edit.expected_versions = expected_versions(&headers)?;

    let record = state
        .executor
        .apply(id, &edit)
        .await
        .map_err(catalog_error)?;

    tracing::info!(
        module = "books",
        record_id = record.id,
        status = %record.status,
        "book updated"
    );

    Ok(([(header::ETAG, etag(&record.version)?)], Json(record.view())).into_response())
}

async fn delete_book(
    State(state): State<BooksState>,
    id: Result<Path<RecordId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let removed = state
        .store
        .delete(id)
        .await
        .map_err(|err| catalog_error(err.into()))?;
    if !removed {
        return Err(AppError::not_found(format!("record {id} does not exist")));
    }

    tracing::info!(module = "books", record_id = id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_catalog::{CatalogRecord, NotFoundReason, Status, StoreError};

    fn record() -> CatalogRecord {
        CatalogRecord {
            id: 3,
            title: "Beloved".into(),
            author: None,
            catalog_number: "978-1400033416".into(),
            status: Status::Borrowed,
            version: VersionToken::fresh(),
        }
    }

    #[test]
    fn conflict_carries_snapshot_and_version() {
        let current = record();
        let err = catalog_error(CatalogError::Conflict {
            current: Box::new(current.clone()),
        });

        match err {
            AppError::Conflict { details, code, .. } => {
                assert_eq!(code, "conflict");
                assert_eq!(details[0]["current"]["status"], "borrowed");
                assert_eq!(details[0]["version"], current.version.to_string());
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn kinds_map_to_statuses() {
        let gone = catalog_error(CatalogError::NotFound {
            id: 3,
            reason: NotFoundReason::DeletedConcurrently,
        });
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);

        let down = catalog_error(StoreError::Unavailable("socket closed".into()).into());
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bad = catalog_error(CatalogError::InvalidTransition {
            current: Status::OnShelf,
            requested: Status::OnShelf,
        });
        assert_eq!(bad.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn if_match_is_optional_and_accepts_wildcard() {
        let mut headers = HeaderMap::new();
        assert!(expected_versions(&headers).unwrap().is_empty());

        headers.insert(header::IF_MATCH, HeaderValue::from_static("*"));
        assert!(expected_versions(&headers).unwrap().is_empty());

        let token = VersionToken::fresh();
        headers.insert(header::IF_MATCH, etag(&token).unwrap());
        assert_eq!(expected_versions(&headers).unwrap(), vec![token]);

        headers.insert(header::IF_MATCH, HeaderValue::from_static("\"nope\""));
        assert!(expected_versions(&headers).is_err());
    }

    #[test]
    fn if_match_accepts_a_list_of_tags() {
        let (first, second) = (VersionToken::fresh(), VersionToken::fresh());
        let mut headers = HeaderMap::new();
        let listed = format!("\"{first}\", W/\"{second}\"");
        headers.insert(header::IF_MATCH, HeaderValue::from_str(&listed).unwrap());
        assert_eq!(expected_versions(&headers).unwrap(), vec![first, second]);

        let third = VersionToken::fresh();
        headers.append(header::IF_MATCH, etag(&third).unwrap());
        assert_eq!(
            expected_versions(&headers).unwrap(),
            vec![first, second, third]
        );

        let wildcard = format!("\"{first}\", *");
        headers.insert(header::IF_MATCH, HeaderValue::from_str(&wildcard).unwrap());
        assert!(expected_versions(&headers).unwrap().is_empty());
    }
}
