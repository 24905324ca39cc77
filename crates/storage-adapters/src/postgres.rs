//! # PgDocumentStore
//!
//! `DocumentStore` on a single Postgres table of JSONB bodies
//! (see `migrations/`). Filters are pushed down as JSONB containment and
//! re-checked with the shared `Filter` semantics; updates run as
//! read-modify-write under `SELECT ... FOR UPDATE` inside a transaction,
//! which gives the same single-document atomicity as the memory backend.

use async_trait::async_trait;
use domains::{Document, DocumentStore, DomainError, DomainResult, Filter, Sort, Update};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use tracing::{debug, info};

use crate::codec::ensure_id;

/// Attempts for an upsert racing another upsert of the same id.
const UPSERT_ATTEMPTS: usize = 2;

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Connects, then brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> DomainResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(DomainError::store)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DomainError::store)?;
        info!(max_connections, "connected to postgres document store");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn containment(filter: &Filter) -> DomainResult<Json<Value>> {
    Ok(Json(Value::Object(filter.seed()?)))
}

fn decode_body(row: &PgRow) -> DomainResult<Document> {
    let Json(body) = row
        .try_get::<Json<Document>, _>("body")
        .map_err(DomainError::store)?;
    Ok(body)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(&self, collection: &str, filter: &Filter, sort: &Sort) -> DomainResult<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT body FROM documents WHERE collection = $1 AND body @> $2 ORDER BY seq",
        )
        .bind(collection)
        .bind(containment(filter)?)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::store)?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in &rows {
            let doc = decode_body(row)?;
            if filter.matches(&doc) {
                docs.push(doc);
            }
        }
        sort.apply(&mut docs);
        Ok(docs)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> DomainResult<Option<Document>> {
        Ok(self
            .find(collection, filter, &Sort::none())
            .await?
            .into_iter()
            .next())
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> DomainResult<String> {
        let id = ensure_id(&mut doc);

        sqlx::query("INSERT INTO documents (collection, doc_id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(&doc))
            .execute(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    DomainError::Conflict(format!("{collection} already holds `{id}`"))
                } else {
                    DomainError::store(err)
                }
            })?;
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> DomainResult<Option<Document>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut tx = self.pool.begin().await.map_err(DomainError::store)?;

            let rows = sqlx::query(
                "SELECT seq, body FROM documents \
                 WHERE collection = $1 AND body @> $2 ORDER BY seq FOR UPDATE",
            )
            .bind(collection)
            .bind(containment(filter)?)
            .fetch_all(&mut *tx)
            .await
            .map_err(DomainError::store)?;

            let mut current = None;
            for row in &rows {
                let doc = decode_body(row)?;
                if filter.matches(&doc) {
                    let seq: i64 = row.try_get("seq").map_err(DomainError::store)?;
                    current = Some((seq, doc));
                    break;
                }
            }

            if let Some((seq, mut doc)) = current {
                update.apply(&mut doc)?;
                sqlx::query("UPDATE documents SET body = $1 WHERE seq = $2")
                    .bind(Json(&doc))
                    .bind(seq)
                    .execute(&mut *tx)
                    .await
                    .map_err(DomainError::store)?;
                tx.commit().await.map_err(DomainError::store)?;
                return Ok(Some(doc));
            }

            if !upsert {
                return Ok(None);
            }

            let mut doc = filter.seed()?;
            let id = ensure_id(&mut doc);
            update.apply(&mut doc)?;

            let inserted = sqlx::query(
                "INSERT INTO documents (collection, doc_id, body) VALUES ($1, $2, $3)",
            )
            .bind(collection)
            .bind(&id)
            .bind(Json(&doc))
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {
                    tx.commit().await.map_err(DomainError::store)?;
                    return Ok(Some(doc));
                }
                Err(err) if is_unique_violation(&err) && attempt < UPSERT_ATTEMPTS => {
                    debug!(collection, id = %id, "upsert raced a concurrent insert, retrying");
                    continue;
                }
                Err(err) => return Err(DomainError::store(err)),
            }
        }
    }
}
