pub mod models;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use folio_catalog::CatalogStore;
use folio_kernel::{settings::CatalogSettings, InitCtx, Module};
use serde_json::json;

use routes::BooksState;

/// Catalog of physical books and their custody status
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(store: Arc<dyn CatalogStore>, defaults: CatalogSettings) -> Self {
        Self {
            state: BooksState::new(store, defaults),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            default_page_size = self.state.defaults.default_page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book = |description: &str| {
            json!({
                "description": description,
                "headers": {
                    "ETag": {
                        "description": "Version token of the record",
                        "schema": { "type": "string" }
                    }
                },
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Book" }
                    }
                }
            })
        };
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64", "minimum": 1 }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "sort_by",
                                "in": "query",
                                "description": "title, author, catalog_number or status; anything else sorts by id",
                                "schema": { "type": "string" }
                            },
                            {
                                "name": "page",
                                "in": "query",
                                "schema": { "type": "integer", "minimum": 1, "default": 1 }
                            },
                            {
                                "name": "page_size",
                                "in": "query",
                                "schema": { "type": "integer", "minimum": 1 }
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of books",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookPage" }
                                    }
                                }
                            },
                            "422": error("Page or page size below 1"),
                            "503": error("Storage unavailable")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": book("Book created on the shelf"),
                            "400": error("Malformed payload"),
                            "422": error("Missing fields or duplicate catalog number"),
                            "503": error("Storage unavailable")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "responses": {
                            "200": book("The book"),
                            "404": error("No such book")
                        }
                    },
                    "put": {
                        "summary": "Edit a book and move it through its custody lifecycle",
                        "tags": ["Books"],
                        "parameters": [
                            id_param.clone(),
                            {
                                "name": "If-Match",
                                "in": "header",
                                "description": "ETags the client is willing to overwrite, comma separated; omitted or * means the current version",
                                "schema": { "type": "string" }
                            }
                        ],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/UpdateBook" }
                                }
                            }
                        },
                        "responses": {
                            "200": book("Book updated"),
                            "404": error("No such book, or deleted concurrently"),
                            "409": error("Modified by another writer; details carry the current record"),
                            "422": error("Invalid status change or payload"),
                            "503": error("Storage unavailable")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "204": { "description": "Deleted" },
                            "404": error("No such book")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Status": {
                        "type": "string",
                        "enum": ["on_shelf", "borrowed", "returned", "damaged"]
                    },
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "title": { "type": "string" },
                            "author": { "type": ["string", "null"] },
                            "catalog_number": { "type": "string" },
                            "status": { "$ref": "#/components/schemas/Status" }
                        },
                        "required": ["id", "title", "catalog_number", "status"]
                    },
                    "BookPage": {
                        "type": "object",
                        "properties": {
                            "total_items": { "type": "integer" },
                            "page": { "type": "integer" },
                            "page_size": { "type": "integer" },
                            "items": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            }
                        },
                        "required": ["total_items", "page", "page_size", "items"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": ["string", "null"] },
                            "catalog_number": { "type": "string" }
                        },
                        "required": ["title", "catalog_number"]
                    },
                    "UpdateBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": ["string", "null"] },
                            "status": { "$ref": "#/components/schemas/Status" }
                        },
                        "required": ["title", "status"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(
    store: Arc<dyn CatalogStore>,
    defaults: CatalogSettings,
) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store, defaults))
}
