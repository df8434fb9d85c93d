//! Integration tests for cascading delete and the explicit transaction
//! contract.

use pagetree_core::db::{DatabaseService, PageEvent, PageStore, PageTransaction, SqliteStore};
use pagetree_core::models::{NewPage, PageFields, PageStatus, ROOT_PARENT};
use pagetree_core::services::{PageService, PageServiceError};
use std::sync::Arc;
use tempfile::TempDir;

async fn create_test_service() -> (PageService, Arc<SqliteStore>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("pages.db");

    let db = Arc::new(DatabaseService::new(db_path).await.unwrap());
    let store = Arc::new(SqliteStore::new(db));
    let service = PageService::new(store.clone());

    (service, store, temp_dir)
}

async fn create_child(service: &PageService, slug: &str, parent_id: i64, order: i64) -> i64 {
    service
        .create(NewPage {
            parent_id,
            order: Some(order),
            ..NewPage::new(slug, slug)
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn delete_removes_subtree_and_navigation_links() {
    let (service, store, _temp) = create_test_service().await;

    let a = create_child(&service, "a", ROOT_PARENT, 1).await;
    let b = create_child(&service, "b", a, 1).await;
    let c = create_child(&service, "c", b, 1).await;
    let survivor = create_child(&service, "survivor", ROOT_PARENT, 2).await;

    store.insert_navigation_link("A", a, 0).await.unwrap();
    store.insert_navigation_link("C", c, 1).await.unwrap();
    store
        .insert_navigation_link("Survivor", survivor, 2)
        .await
        .unwrap();

    let mut events = service.subscribe();
    let removed = service.delete(a).await.unwrap();
    assert_eq!(removed, vec![a, b, c]);

    // No page of the returned set remains.
    for id in &removed {
        assert!(service.get_page(*id).await.unwrap().is_none());
    }

    // No navigation link referencing any removed page remains; unrelated
    // links survive.
    assert_eq!(store.count_navigation_links_for(&removed).await.unwrap(), 0);
    assert_eq!(
        store
            .count_navigation_links_for(&[survivor])
            .await
            .unwrap(),
        1
    );
    assert!(service.get_page(survivor).await.unwrap().is_some());

    assert_eq!(
        events.recv().await.unwrap(),
        PageEvent::Deleted { ids: removed }
    );
}

#[tokio::test]
async fn delete_of_leaf_removes_only_that_page() {
    let (service, _store, _temp) = create_test_service().await;

    let a = create_child(&service, "a", ROOT_PARENT, 1).await;
    let b = create_child(&service, "b", a, 1).await;

    let removed = service.delete(b).await.unwrap();
    assert_eq!(removed, vec![b]);
    assert!(service.get_page(a).await.unwrap().is_some());
    assert!(!service.has_children(a).await.unwrap());
}

#[tokio::test]
async fn delete_of_missing_page_is_a_typed_error() {
    let (service, _store, _temp) = create_test_service().await;

    let err = service.delete(123).await.unwrap_err();
    assert!(matches!(err, PageServiceError::PageNotFound { id: 123 }));
}

fn sample_fields(slug: &str) -> PageFields {
    PageFields {
        slug: slug.to_string(),
        title: slug.to_string(),
        parent_id: ROOT_PARENT,
        layout_id: 0,
        css: None,
        js: None,
        meta_title: None,
        meta_keywords: None,
        meta_description: None,
        rss_enabled: false,
        comments_enabled: false,
        is_home: false,
        status: PageStatus::Draft,
        restricted_to: None,
        revision_id: 0,
        order: 1,
    }
}

#[tokio::test]
async fn rolled_back_transaction_leaves_no_trace() {
    let (_service, store, _temp) = create_test_service().await;

    let mut tx = store.begin().await.unwrap();
    let id = tx.insert(&sample_fields("ghost")).await.unwrap();
    assert!(tx.fetch_page(id).await.unwrap().is_some());
    tx.rollback().await.unwrap();

    assert!(store.fetch_page(id).await.unwrap().is_none());
}

#[tokio::test]
async fn committed_transaction_is_visible_to_other_connections() {
    let (_service, store, _temp) = create_test_service().await;

    let mut tx = store.begin().await.unwrap();
    let id = tx.insert(&sample_fields("real")).await.unwrap();
    tx.update_uri(id, "real").await.unwrap();
    tx.commit().await.unwrap();

    let page = store.fetch_page(id).await.unwrap().unwrap();
    assert_eq!(page.uri.as_deref(), Some("real"));
    assert_eq!(store.fetch_by_uri("real").await.unwrap().unwrap().id, id);
}

#[tokio::test]
async fn transaction_sees_its_own_writes_before_commit() {
    let (_service, store, _temp) = create_test_service().await;

    let mut tx = store.begin().await.unwrap();
    let parent = tx.insert(&sample_fields("parent")).await.unwrap();
    let child = tx
        .insert(&PageFields {
            parent_id: parent,
            ..sample_fields("child")
        })
        .await
        .unwrap();

    assert_eq!(tx.fetch_child_ids(parent).await.unwrap(), vec![child]);

    let step = tx.path_step(child).await.unwrap().unwrap();
    assert_eq!(step.slug, "child");
    assert_eq!(step.parent_id, parent);

    tx.rollback().await.unwrap();
}
