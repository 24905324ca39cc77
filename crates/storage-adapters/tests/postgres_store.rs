//! `PgDocumentStore` against a throwaway Postgres container. Ignored by
//! default since it needs a Docker daemon.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use domains::document::document_id;
use domains::{
    CommentRecord, CommentRepository, Document, DocumentStore, DomainError, Filter, Sort, Update,
    VoteTally,
};
use serde_json::{json, Value};
use storage_adapters::{ChildListComments, ParentPointerComments, PgDocumentStore};
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::testcontainers::ContainerAsync;
use uuid::Uuid;

struct PgFixture {
    store: Arc<PgDocumentStore>,
    _container: ContainerAsync<Postgres>,
}

async fn postgres() -> PgFixture {
    let container = Postgres::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

    let store = PgDocumentStore::connect(&url, 8).await.unwrap();
    PgFixture {
        store: Arc::new(store),
        _container: container,
    }
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn comment(parent_id: Uuid, created_ms: i64) -> CommentRecord {
    let at = Utc.timestamp_millis_opt(created_ms).unwrap();
    CommentRecord {
        id: Uuid::now_v7(),
        parent_id,
        content: format!("at {created_ms}"),
        author_id: Uuid::now_v7(),
        created_at: at,
        updated_at: at,
        vote_tally: VoteTally::default(),
    }
}

fn ids(records: &[CommentRecord]) -> Vec<Uuid> {
    records.iter().map(|c| c.id).collect()
}

#[tokio::test]
#[ignore = "needs docker"]
async fn duplicate_id_is_a_conflict() {
    let pg = postgres().await;
    let generated = pg.store.insert_one("posts", doc(json!({ "title": "a" }))).await.unwrap();
    assert!(Uuid::parse_str(&generated).is_ok());

    pg.store.insert_one("posts", doc(json!({ "_id": "fixed" }))).await.unwrap();
    let err = pg.store.insert_one("posts", doc(json!({ "_id": "fixed" }))).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    // Same id in another collection is a different document.
    pg.store.insert_one("comments", doc(json!({ "_id": "fixed" }))).await.unwrap();
}

#[tokio::test]
#[ignore = "needs docker"]
async fn find_filters_and_sorts() {
    let pg = postgres().await;
    for (id, parent, at) in [("a", "p", 3), ("b", "q", 1), ("c", "p", 2)] {
        pg.store
            .insert_one("comments", doc(json!({ "_id": id, "parentId": parent, "createdAt": at })))
            .await
            .unwrap();
    }

    let found = pg
        .store
        .find("comments", &Filter::all().eq("parentId", "p"), &Sort::none().ascending("createdAt"))
        .await
        .unwrap();
    let found: Vec<_> = found.iter().filter_map(document_id).collect();
    assert_eq!(found, vec!["c", "a"]);

    assert!(pg.store.find("missing", &Filter::all(), &Sort::none()).await.unwrap().is_empty());
    assert!(pg.store.find_one("comments", &Filter::by_id("zz")).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "needs docker"]
async fn update_returns_post_image_and_upserts_from_filter() {
    let pg = postgres().await;
    let missed = pg
        .store
        .update_one("votes", &Filter::by_id("u1"), &Update::new().set("voteMap.t1", 1), false)
        .await
        .unwrap();
    assert!(missed.is_none());

    let created = pg
        .store
        .update_one("votes", &Filter::by_id("u1"), &Update::new().set("voteMap.t1", 1), true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(Value::Object(created), json!({ "_id": "u1", "voteMap": { "t1": 1 } }));

    let updated = pg
        .store
        .update_one("votes", &Filter::by_id("u1"), &Update::new().set("voteMap.t2", -1), true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated["voteMap"], json!({ "t1": 1, "t2": -1 }));
    assert_eq!(pg.store.find("votes", &Filter::all(), &Sort::none()).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "needs docker"]
async fn concurrent_upserts_of_one_id_create_one_document() {
    let pg = postgres().await;
    let mut handles = Vec::new();
    for n in 0..8 {
        let store = Arc::clone(&pg.store);
        handles.push(tokio::spawn(async move {
            let update = Update::new().set(format!("voteMap.t{n}"), 1);
            store.update_one("votes", &Filter::by_id("u1"), &update, true).await
        }));
    }
    let mut stored = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            stored += 1;
        }
    }

    let docs = pg.store.find("votes", &Filter::all(), &Sort::none()).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["voteMap"].as_object().unwrap().len(), stored);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs docker"]
async fn concurrent_increments_are_not_lost() {
    let pg = postgres().await;
    pg.store.insert_one("posts", doc(json!({ "_id": "p1" }))).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let store = Arc::clone(&pg.store);
        handles.push(tokio::spawn(async move {
            store
                .update_one("posts", &Filter::by_id("p1"), &Update::new().inc("voteTally.netScore", 1), false)
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let post = pg.store.find_one("posts", &Filter::by_id("p1")).await.unwrap().unwrap();
    assert_eq!(post["voteTally"]["netScore"], json!(32));
}

#[tokio::test]
#[ignore = "needs docker"]
async fn child_list_layout_keeps_insertion_order() {
    let pg = postgres().await;
    let repo = ChildListComments::new(pg.store.clone());
    let post = Uuid::now_v7();

    let (late, early) = (comment(post, 200), comment(post, 100));
    repo.insert_comment(late.clone()).await.unwrap();
    repo.insert_comment(early.clone()).await.unwrap();
    let reply = comment(late.id, 300);
    repo.insert_comment(reply.clone()).await.unwrap();

    assert_eq!(ids(&repo.children_of(post).await.unwrap()), vec![late.id, early.id]);
    assert_eq!(ids(&repo.children_of(late.id).await.unwrap()), vec![reply.id]);
    assert!(repo.children_of(early.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "needs docker"]
async fn parent_pointer_layout_orders_by_creation_and_touches() {
    let pg = postgres().await;
    let repo = ParentPointerComments::new(pg.store.clone());
    let post = Uuid::now_v7();
    let (late, early, elsewhere) = (comment(post, 200), comment(post, 100), comment(Uuid::now_v7(), 50));
    for c in [&late, &early, &elsewhere] {
        repo.insert_comment(c.clone()).await.unwrap();
    }

    assert_eq!(ids(&repo.children_of(post).await.unwrap()), vec![early.id, late.id]);

    let at = Utc.timestamp_millis_opt(900).unwrap();
    assert!(repo.touch_comment(early.id, at).await.unwrap());
    assert!(!repo.touch_comment(Uuid::now_v7(), at).await.unwrap());
    assert_eq!(repo.get_comment(early.id).await.unwrap().unwrap().updated_at, at);
}
