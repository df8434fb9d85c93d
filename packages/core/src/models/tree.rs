//! In-Memory Page Tree
//!
//! The hierarchy lives in the database as flat parent-pointer rows; this
//! module rebuilds the nested shape on demand and models the nested input
//! accepted by reparent/reorder.
//!
//! # Architecture
//!
//! [`PageTree`] is an arena: a flat `id -> TreeNode` index plus a list of
//! root ids, with every parent holding the *ids* of its children. The flat
//! index and the child lists are views over the same arena slot, so no node
//! is ever duplicated. Assembly is a pure function over loaded rows, which
//! keeps it unit-testable without a database.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::page::ROOT_PARENT;

/// Minimal projection of a page row used for tree assembly.
///
/// Rows are expected in sibling order (the store sorts by the `order`
/// column); assembly preserves the input order in every child list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRow {
    pub id: i64,
    pub parent_id: i64,
    pub title: String,
}

/// One arena slot of an assembled [`PageTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: i64,
    pub parent_id: i64,
    pub title: String,
    /// Child ids in sibling order.
    pub children: Vec<i64>,
}

/// A forest of pages assembled from flat rows.
///
/// Built fresh per call and discarded after use; never cached across
/// requests.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTree {
    nodes: HashMap<i64, TreeNode>,
    roots: Vec<i64>,
}

impl PageTree {
    /// Reconstruct the forest from flat rows.
    ///
    /// Two passes: index every row by id, then wire children in input
    /// order. A row whose `parent_id` is [`ROOT_PARENT`] becomes a root; a
    /// row whose parent was loaded is appended to that parent's child list;
    /// a row pointing at a non-existent parent stays in the arena but is
    /// reachable from neither (the documented orphan policy, not an error).
    pub fn assemble(rows: Vec<TreeRow>) -> Self {
        let load_order: Vec<i64> = rows.iter().map(|row| row.id).collect();

        let mut nodes = HashMap::with_capacity(rows.len());
        for row in rows {
            nodes.insert(
                row.id,
                TreeNode {
                    id: row.id,
                    parent_id: row.parent_id,
                    title: row.title,
                    children: Vec::new(),
                },
            );
        }

        let mut roots = Vec::new();
        for id in load_order {
            let parent_id = match nodes.get(&id) {
                Some(node) => node.parent_id,
                None => continue,
            };
            if parent_id == ROOT_PARENT {
                roots.push(id);
            } else if let Some(parent) = nodes.get_mut(&parent_id) {
                parent.children.push(id);
            }
        }

        Self { nodes, roots }
    }

    /// Top-level page ids in sibling order.
    pub fn roots(&self) -> &[i64] {
        &self.roots
    }

    /// Look up an arena slot by page id.
    pub fn node(&self, id: i64) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    /// Child ids of a page in sibling order; empty for unknown ids and
    /// leaves alike.
    pub fn children(&self, id: i64) -> &[i64] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Number of loaded rows, including orphans not reachable from a root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids reachable from the roots, depth-first in sibling order.
    pub fn iter_depth_first(&self) -> Vec<i64> {
        let mut visited = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<i64> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            visited.push(id);
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        visited
    }
}

/// Nested subtree description accepted by reparent/reorder: a node id and
/// its children in the desired sibling order, each carrying the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveNode {
    pub id: i64,
    #[serde(default)]
    pub children: Vec<MoveNode>,
}

impl MoveNode {
    /// A leaf move entry with no nested children.
    pub fn leaf(id: i64) -> Self {
        Self {
            id,
            children: Vec::new(),
        }
    }

    /// Flatten the nested description into row placements.
    ///
    /// The node itself lands under the supplied target at the supplied
    /// order; every child recursively lands under its describing node at
    /// its list position.
    pub fn placements(&self, parent_id: i64, order: i64) -> Vec<Placement> {
        let mut out = Vec::new();
        self.collect_placements(parent_id, order, &mut out);
        out
    }

    fn collect_placements(&self, parent_id: i64, order: i64, out: &mut Vec<Placement>) {
        out.push(Placement {
            id: self.id,
            parent_id,
            order,
        });
        for (position, child) in self.children.iter().enumerate() {
            child.collect_placements(self.id, position as i64, out);
        }
    }
}

/// One `(id, parent_id, order)` row write produced by flattening a
/// [`MoveNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub id: i64,
    pub parent_id: i64,
    pub order: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, parent_id: i64, title: &str) -> TreeRow {
        TreeRow {
            id,
            parent_id,
            title: title.to_string(),
        }
    }

    #[test]
    fn assemble_builds_forest_in_load_order() {
        let tree = PageTree::assemble(vec![
            row(1, ROOT_PARENT, "Home"),
            row(3, 1, "Second child"),
            row(2, 1, "First child"),
            row(4, ROOT_PARENT, "About"),
        ]);

        assert_eq!(tree.roots(), &[1, 4]);
        // Children keep row order, which is the sibling-order sort.
        assert_eq!(tree.children(1), &[3, 2]);
        assert_eq!(tree.children(4), &[] as &[i64]);
        assert_eq!(tree.node(3).unwrap().title, "Second child");
    }

    #[test]
    fn every_linked_row_appears_exactly_once() {
        let tree = PageTree::assemble(vec![
            row(1, ROOT_PARENT, "a"),
            row(2, 1, "b"),
            row(3, 1, "c"),
            row(4, 3, "d"),
        ]);

        let visited = tree.iter_depth_first();
        assert_eq!(visited, vec![1, 2, 3, 4]);

        let mut sorted = visited.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), visited.len());
    }

    #[test]
    fn dangling_parent_rows_are_dropped_from_traversal() {
        let tree = PageTree::assemble(vec![
            row(1, ROOT_PARENT, "root"),
            row(2, 99, "orphan"),
            row(3, 2, "child of orphan"),
        ]);

        assert_eq!(tree.roots(), &[1]);
        assert_eq!(tree.iter_depth_first(), vec![1]);
        // The orphan is still indexed, just unreachable.
        assert!(tree.node(2).is_some());
        assert_eq!(tree.children(2), &[3]);
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        let tree = PageTree::assemble(Vec::new());
        assert!(tree.is_empty());
        assert!(tree.roots().is_empty());
    }

    #[test]
    fn placements_flatten_depth_first() {
        let moves = MoveNode {
            id: 10,
            children: vec![
                MoveNode {
                    id: 11,
                    children: vec![MoveNode::leaf(13)],
                },
                MoveNode::leaf(12),
            ],
        };

        let placements = moves.placements(ROOT_PARENT, 4);

        assert_eq!(
            placements,
            vec![
                Placement {
                    id: 10,
                    parent_id: ROOT_PARENT,
                    order: 4
                },
                Placement {
                    id: 11,
                    parent_id: 10,
                    order: 0
                },
                Placement {
                    id: 13,
                    parent_id: 11,
                    order: 0
                },
                Placement {
                    id: 12,
                    parent_id: 10,
                    order: 1
                },
            ]
        );
    }

    #[test]
    fn sibling_positions_become_orders() {
        let moves = MoveNode {
            id: 1,
            children: vec![MoveNode::leaf(5), MoveNode::leaf(6), MoveNode::leaf(7)],
        };

        let orders: Vec<i64> = moves
            .placements(ROOT_PARENT, 0)
            .iter()
            .skip(1)
            .map(|p| p.order)
            .collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }
}
