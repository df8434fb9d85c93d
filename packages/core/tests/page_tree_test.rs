//! Integration tests for tree assembly, descendant walks, and
//! reparent/reorder.

use pagetree_core::db::{DatabaseService, PageStore, SqliteStore};
use pagetree_core::models::{MoveNode, NewPage, ROOT_PARENT};
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

/// Create a page under `parent_id` with an explicit sibling order so tests
/// are deterministic even within one timestamp second.
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
async fn tree_contains_every_page_exactly_once() {
    let (service, _store, _temp) = create_test_service().await;

    let a = create_child(&service, "a", ROOT_PARENT, 1).await;
    let b = create_child(&service, "b", a, 1).await;
    let c = create_child(&service, "c", a, 2).await;
    let d = create_child(&service, "d", c, 1).await;
    let e = create_child(&service, "e", ROOT_PARENT, 2).await;

    let tree = service.get_page_tree().await.unwrap();

    assert_eq!(tree.roots(), &[a, e]);
    assert_eq!(tree.children(a), &[b, c]);
    assert_eq!(tree.children(c), &[d]);

    let mut visited = tree.iter_depth_first();
    assert_eq!(visited, vec![a, b, c, d, e]);
    visited.sort_unstable();
    visited.dedup();
    assert_eq!(visited.len(), 5);
}

#[tokio::test]
async fn tree_follows_sibling_order_not_insertion_order() {
    let (service, _store, _temp) = create_test_service().await;

    let root = create_child(&service, "root", ROOT_PARENT, 1).await;
    // Inserted first but ordered last, and vice versa.
    let last = create_child(&service, "last", root, 30).await;
    let first = create_child(&service, "first", root, 10).await;
    let middle = create_child(&service, "middle", root, 20).await;

    let tree = service.get_page_tree().await.unwrap();
    assert_eq!(tree.children(root), &[first, middle, last]);
}

#[tokio::test]
async fn children_fetch_returns_full_rows_in_sibling_order() {
    let (service, store, _temp) = create_test_service().await;

    let root = create_child(&service, "root", ROOT_PARENT, 1).await;
    let b = create_child(&service, "b", root, 2).await;
    let a = create_child(&service, "a", root, 1).await;

    let children = store.fetch_children_of(root).await.unwrap();
    let ids: Vec<i64> = children.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![a, b]);
    assert_eq!(children[0].uri.as_deref(), Some("root/a"));
    assert_eq!(children[1].parent_id, root);
}

#[tokio::test]
async fn descendant_closure_is_preorder_and_duplicate_free() {
    let (service, _store, _temp) = create_test_service().await;

    let a = create_child(&service, "a", ROOT_PARENT, 1).await;
    let b = create_child(&service, "b", a, 1).await;
    let c = create_child(&service, "c", a, 2).await;
    let d = create_child(&service, "d", b, 1).await;
    let _other = create_child(&service, "other", ROOT_PARENT, 2).await;

    let ids = service.get_descendant_ids(a).await.unwrap();
    assert_eq!(ids, vec![a, b, d, c]);

    // A leaf's closure is just itself.
    assert_eq!(service.get_descendant_ids(d).await.unwrap(), vec![d]);
}

#[tokio::test]
async fn has_children_reflects_direct_children_only() {
    let (service, _store, _temp) = create_test_service().await;

    let a = create_child(&service, "a", ROOT_PARENT, 1).await;
    let b = create_child(&service, "b", a, 1).await;

    assert!(service.has_children(a).await.unwrap());
    assert!(!service.has_children(b).await.unwrap());
}

#[tokio::test]
async fn reparent_moves_subtree_and_reindex_fixes_paths() {
    let (service, _store, _temp) = create_test_service().await;

    // Mirrors the canonical scenario: about/team, then team moves to root.
    let about = create_child(&service, "about", ROOT_PARENT, 1).await;
    let team = create_child(&service, "team", about, 1).await;

    assert_eq!(
        service.get_page(team).await.unwrap().unwrap().uri.as_deref(),
        Some("about/team")
    );

    service
        .reparent_and_reorder(&MoveNode::leaf(team), ROOT_PARENT, 2)
        .await
        .unwrap();

    service.reindex_descendants(about).await.unwrap();
    let rebuilt = service.rebuild_path(team).await.unwrap();
    assert_eq!(rebuilt, "team");

    let tree = service.get_page_tree().await.unwrap();
    assert_eq!(tree.roots(), &[about, team]);
    assert!(tree.children(about).is_empty());
}

#[tokio::test]
async fn nested_move_description_renumbers_siblings() {
    let (service, _store, _temp) = create_test_service().await;

    let root = create_child(&service, "root", ROOT_PARENT, 1).await;
    let x = create_child(&service, "x", root, 1).await;
    let y = create_child(&service, "y", root, 2).await;
    let z = create_child(&service, "z", root, 3).await;

    // Reverse the children by describing the desired shape.
    let moves = MoveNode {
        id: root,
        children: vec![MoveNode::leaf(z), MoveNode::leaf(y), MoveNode::leaf(x)],
    };
    service
        .reparent_and_reorder(&moves, ROOT_PARENT, 0)
        .await
        .unwrap();

    let tree = service.get_page_tree().await.unwrap();
    assert_eq!(tree.children(root), &[z, y, x]);
}

#[tokio::test]
async fn reparent_rejects_cycles() {
    let (service, _store, _temp) = create_test_service().await;

    let a = create_child(&service, "a", ROOT_PARENT, 1).await;
    let b = create_child(&service, "b", a, 1).await;
    let c = create_child(&service, "c", b, 1).await;

    // Under a descendant.
    let err = service
        .reparent_and_reorder(&MoveNode::leaf(a), c, 0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PageServiceError::CircularMove { id, parent_id } if id == a && parent_id == c
    ));

    // Under itself.
    let err = service
        .reparent_and_reorder(&MoveNode::leaf(a), a, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, PageServiceError::CircularMove { .. }));

    // The tree is untouched.
    let page = service.get_page(a).await.unwrap().unwrap();
    assert_eq!(page.parent_id, ROOT_PARENT);
}

#[tokio::test]
async fn reparent_rejects_cycles_encoded_in_the_description() {
    let (service, _store, _temp) = create_test_service().await;

    let a = create_child(&service, "a", ROOT_PARENT, 1).await;
    let b = create_child(&service, "b", a, 1).await;

    // The description pulls the current parent inside the moved subtree
    // while targeting it: b under a, a under b.
    let moves = MoveNode {
        id: b,
        children: vec![MoveNode::leaf(a)],
    };
    let err = service.reparent_and_reorder(&moves, a, 0).await.unwrap_err();
    assert!(matches!(err, PageServiceError::CircularMove { .. }));

    // A repeated id is rejected before anything is written.
    let moves = MoveNode {
        id: a,
        children: vec![MoveNode::leaf(b), MoveNode::leaf(b)],
    };
    let err = service
        .reparent_and_reorder(&moves, ROOT_PARENT, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, PageServiceError::CircularMove { .. }));

    let page = service.get_page(b).await.unwrap().unwrap();
    assert_eq!(page.parent_id, a);
}

#[tokio::test]
async fn reparent_validates_endpoints() {
    let (service, _store, _temp) = create_test_service().await;

    let a = create_child(&service, "a", ROOT_PARENT, 1).await;

    let err = service
        .reparent_and_reorder(&MoveNode::leaf(999), ROOT_PARENT, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, PageServiceError::PageNotFound { id: 999 }));

    let err = service
        .reparent_and_reorder(&MoveNode::leaf(a), 999, 0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PageServiceError::ParentNotFound { parent_id: 999 }
    ));
}

#[tokio::test]
async fn reindex_is_idempotent() {
    let (service, _store, _temp) = create_test_service().await;

    let a = create_child(&service, "a", ROOT_PARENT, 1).await;
    let b = create_child(&service, "b", a, 1).await;
    let c = create_child(&service, "c", b, 1).await;

    service.reindex_descendants(a).await.unwrap();
    let first_pass: Vec<Option<String>> = {
        let mut uris = Vec::new();
        for id in [a, b, c] {
            uris.push(service.get_page(id).await.unwrap().unwrap().uri);
        }
        uris
    };

    service.reindex_descendants(a).await.unwrap();
    for (i, id) in [a, b, c].into_iter().enumerate() {
        let page = service.get_page(id).await.unwrap().unwrap();
        assert_eq!(page.uri, first_pass[i]);
    }

    assert_eq!(first_pass[2].as_deref(), Some("a/b/c"));
}
