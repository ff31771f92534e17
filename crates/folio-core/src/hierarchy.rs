//! Collection hierarchy.
//!
//! Collections form a forest: every non-root node has exactly one parent and
//! parent/child links agree with each other. The datasets we receive do not
//! always honour that, so the forest is built defensively:
//!
//! - A node whose declared parent does not exist becomes a root
//! - A node that closes a parent cycle becomes a root
//! - Child lists are rebuilt from parent links, keeping the declared order
//!
//! Every repair is recorded as a [`HierarchyWarning`] and logged, never raised.
//! Descendant traversal is additionally bounded by [`MAX_DEPTH`].

use crate::types::{CollectionId, CollectionRecord, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

/// Maximum nesting depth followed during traversal.
pub const MAX_DEPTH: usize = 64;

/// A data-integrity problem found while building the forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HierarchyWarning {
    /// Node declares a parent that does not exist; treated as a root
    MissingParent {
        id: CollectionId,
        parent: CollectionId,
    },
    /// Node's parent chain loops back to itself; treated as a root
    Cycle { id: CollectionId },
    /// Root list names a node that does not exist
    UnknownRoot { id: CollectionId },
    /// Root list names a node that has a parent
    RootHasParent { id: CollectionId },
    /// Child list disagrees with the child's parent link
    InconsistentChild {
        parent: CollectionId,
        child: CollectionId,
    },
    /// Two nodes share an id; the later one is dropped
    DuplicateId { id: CollectionId },
    /// Two siblings share a title (case-insensitive)
    DuplicateTitle {
        parent: Option<CollectionId>,
        title: String,
    },
}

impl fmt::Display for HierarchyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierarchyWarning::MissingParent { id, parent } => {
                write!(f, "collection {id} references missing parent {parent}")
            }
            HierarchyWarning::Cycle { id } => {
                write!(f, "collection {id} is part of a parent cycle")
            }
            HierarchyWarning::UnknownRoot { id } => write!(f, "root list names unknown collection {id}"),
            HierarchyWarning::RootHasParent { id } => {
                write!(f, "root list names collection {id}, which has a parent")
            }
            HierarchyWarning::InconsistentChild { parent, child } => {
                write!(f, "collection {parent} lists {child} as a child, but {child} has another parent")
            }
            HierarchyWarning::DuplicateId { id } => write!(f, "duplicate collection id {id}"),
            HierarchyWarning::DuplicateTitle { parent, title } => match parent {
                Some(parent) => write!(f, "duplicate title '{title}' under {parent}"),
                None => write!(f, "duplicate title '{title}' at root level"),
            },
        }
    }
}

/// A node of the collection forest.
#[derive(Debug, Clone)]
pub struct CollectionNode {
    pub id: CollectionId,
    pub title: String,
    pub parent: Option<CollectionId>,
    pub children: Vec<CollectionId>,
    pub members: BTreeSet<ItemId>,
}

/// The collection dataset: node records plus the ordered list of root ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionDataset {
    pub collections: Vec<CollectionRecord>,
    pub roots: Vec<CollectionId>,
}

impl CollectionDataset {
    pub fn new(collections: Vec<CollectionRecord>, roots: Vec<CollectionId>) -> Self {
        CollectionDataset { collections, roots }
    }
}

/// Read-only collection forest.
#[derive(Debug, Clone, Default)]
pub struct CollectionForest {
    nodes: Vec<CollectionNode>,
    by_id: HashMap<CollectionId, usize>,
    roots: Vec<CollectionId>,
    warnings: Vec<HierarchyWarning>,
}

impl CollectionForest {
    /// Build the forest from a collection dataset, repairing what it must.
    pub fn build(dataset: CollectionDataset) -> Self {
        let mut warnings = Vec::new();
        let mut nodes: Vec<CollectionNode> = Vec::with_capacity(dataset.collections.len());
        let mut declared_children: Vec<Vec<CollectionId>> = Vec::with_capacity(dataset.collections.len());
        let mut by_id = HashMap::with_capacity(dataset.collections.len());

        for record in dataset.collections {
            if by_id.contains_key(&record.id) {
                warnings.push(HierarchyWarning::DuplicateId { id: record.id });
                continue;
            }
            by_id.insert(record.id.clone(), nodes.len());
            declared_children.push(record.children);
            nodes.push(CollectionNode {
                id: record.id,
                title: record.title,
                parent: record.parent_id,
                children: Vec::new(),
                members: record.item_ids.into_iter().collect(),
            });
        }

        // Dangling parent references
        for node in nodes.iter_mut() {
            if let Some(parent) = node.parent.clone() {
                if !by_id.contains_key(&parent) || parent == node.id {
                    if parent == node.id {
                        warnings.push(HierarchyWarning::Cycle { id: node.id.clone() });
                    } else {
                        warnings.push(HierarchyWarning::MissingParent {
                            id: node.id.clone(),
                            parent,
                        });
                    }
                    node.parent = None;
                }
            }
        }

        // Parent cycles: walk each chain, cut the node that closes a loop
        for start in 0..nodes.len() {
            let mut seen = HashSet::new();
            seen.insert(start);
            let mut current = start;
            let mut steps = 0;
            while let Some(parent) = nodes[current].parent.as_ref().and_then(|p| by_id.get(p)).copied() {
                steps += 1;
                if parent == start || steps > nodes.len() {
                    warnings.push(HierarchyWarning::Cycle {
                        id: nodes[start].id.clone(),
                    });
                    nodes[start].parent = None;
                    break;
                }
                if !seen.insert(parent) {
                    // Loop further up the chain; it is cut when its own node is visited
                    break;
                }
                current = parent;
            }
        }

        // Child lists follow parent links, declared order first
        for (idx, declared) in declared_children.iter().enumerate() {
            let parent_id = nodes[idx].id.clone();
            let mut children = Vec::with_capacity(declared.len());
            for child in declared {
                match by_id.get(child) {
                    Some(&c) if nodes[c].parent.as_ref() == Some(&parent_id) => {
                        if !children.contains(child) {
                            children.push(child.clone());
                        }
                    }
                    _ => warnings.push(HierarchyWarning::InconsistentChild {
                        parent: parent_id.clone(),
                        child: child.clone(),
                    }),
                }
            }
            nodes[idx].children = children;
        }
        for idx in 0..nodes.len() {
            if let Some(&p) = nodes[idx].parent.as_ref().and_then(|pid| by_id.get(pid)) {
                let id = nodes[idx].id.clone();
                if !nodes[p].children.contains(&id) {
                    nodes[p].children.push(id);
                }
            }
        }

        // Roots: declared order first, then any node left without a parent
        let mut roots = Vec::new();
        for id in dataset.roots {
            match by_id.get(&id) {
                None => warnings.push(HierarchyWarning::UnknownRoot { id }),
                Some(&idx) if nodes[idx].parent.is_some() => {
                    warnings.push(HierarchyWarning::RootHasParent { id })
                }
                Some(_) => {
                    if !roots.contains(&id) {
                        roots.push(id);
                    }
                }
            }
        }
        for node in &nodes {
            if node.parent.is_none() && !roots.contains(&node.id) {
                roots.push(node.id.clone());
            }
        }

        let mut forest = CollectionForest {
            nodes,
            by_id,
            roots,
            warnings,
        };
        forest.check_sibling_titles();

        for warning in &forest.warnings {
            warn!(%warning, "Collection hierarchy integrity problem");
        }
        info!(
            collections = forest.len(),
            roots = forest.roots.len(),
            warnings = forest.warnings.len(),
            "Collection forest built"
        );

        forest
    }

    fn check_sibling_titles(&mut self) {
        let mut groups: Vec<(Option<CollectionId>, &[CollectionId])> = vec![(None, self.roots.as_slice())];
        groups.extend(self.nodes.iter().map(|n| (Some(n.id.clone()), n.children.as_slice())));

        let mut found = Vec::new();
        for (parent, siblings) in groups {
            let mut titles = HashSet::new();
            let mut reported = HashSet::new();
            for id in siblings {
                if let Some(node) = self.get(id) {
                    let title = node.title.to_lowercase();
                    if !titles.insert(title.clone()) && reported.insert(title.clone()) {
                        found.push(HierarchyWarning::DuplicateTitle {
                            parent: parent.clone(),
                            title,
                        });
                    }
                }
            }
        }
        self.warnings.extend(found);
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the forest has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root ids in display order.
    pub fn roots(&self) -> &[CollectionId] {
        &self.roots
    }

    /// Integrity problems found during the build.
    pub fn warnings(&self) -> &[HierarchyWarning] {
        &self.warnings
    }

    /// Look up a node by id.
    pub fn get(&self, id: &CollectionId) -> Option<&CollectionNode> {
        self.by_id.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Check if a node exists.
    pub fn contains(&self, id: &CollectionId) -> bool {
        self.by_id.contains_key(id)
    }

    /// All nodes in dataset order.
    pub fn nodes(&self) -> impl Iterator<Item = &CollectionNode> {
        self.nodes.iter()
    }

    /// Ids of the node and all its descendants, in pre-order.
    ///
    /// Returns an empty list for an unknown id. Traversal stops at
    /// [`MAX_DEPTH`] and never visits a node twice.
    pub fn subtree(&self, id: &CollectionId) -> Vec<CollectionId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }

        let mut visited = HashSet::new();
        let mut stack = vec![(id.clone(), 0usize)];
        while let Some((current, depth)) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(node) = self.get(&current) else {
                continue;
            };
            out.push(current);
            if depth >= MAX_DEPTH {
                if !node.children.is_empty() {
                    warn!(collection = %node.id, "Depth guard reached during traversal");
                }
                continue;
            }
            for child in node.children.iter().rev() {
                stack.push((child.clone(), depth + 1));
            }
        }
        out
    }

    /// Ids of all descendants of a node (the node itself excluded).
    pub fn descendants(&self, id: &CollectionId) -> Vec<CollectionId> {
        let mut ids = self.subtree(id);
        if !ids.is_empty() {
            ids.remove(0);
        }
        ids
    }

    /// Path from the root down to the node, inclusive.
    pub fn path(&self, id: &CollectionId) -> Vec<&CollectionNode> {
        let mut path = Vec::new();
        let mut current = self.get(id);
        while let Some(node) = current {
            path.push(node);
            if path.len() > MAX_DEPTH {
                break;
            }
            current = node.parent.as_ref().and_then(|p| self.get(p));
        }
        path.reverse();
        path
    }

    /// Depth of a node (roots have depth 1, unknown ids 0).
    pub fn depth(&self, id: &CollectionId) -> usize {
        self.path(id).len()
    }

    /// Distinct items in the node and all its descendants.
    pub fn item_count(&self, id: &CollectionId) -> usize {
        let mut items: HashSet<&ItemId> = HashSet::new();
        for cid in self.subtree(id) {
            if let Some(node) = self.get(&cid) {
                items.extend(node.members.iter());
            }
        }
        items.len()
    }

    /// Collections that list an item as a direct member.
    pub fn collections_containing(&self, item: &ItemId) -> Vec<&CollectionId> {
        self.nodes
            .iter()
            .filter(|n| n.members.contains(item))
            .map(|n| &n.id)
            .collect()
    }

    /// Depth of the deepest node.
    pub fn max_depth(&self) -> usize {
        fn walk(forest: &CollectionForest, id: &CollectionId, depth: usize) -> usize {
            if depth >= MAX_DEPTH {
                return depth;
            }
            forest
                .get(id)
                .map(|node| {
                    node.children
                        .iter()
                        .map(|c| walk(forest, c, depth + 1))
                        .max()
                        .unwrap_or(depth)
                })
                .unwrap_or(depth)
        }

        self.roots.iter().map(|r| walk(self, r, 1)).max().unwrap_or(0)
    }

    /// Replace the direct member sets with reconciled ones.
    pub(crate) fn set_members(&mut self, members: HashMap<CollectionId, BTreeSet<ItemId>>) {
        for node in self.nodes.iter_mut() {
            node.members = members.get(&node.id).cloned().unwrap_or_default();
        }
        debug!(collections = self.nodes.len(), "Collection memberships reconciled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[CollectionId]) -> Vec<&str> {
        list.iter().map(|c| c.as_str()).collect()
    }

    fn make_dataset() -> CollectionDataset {
        CollectionDataset::new(
            vec![
                CollectionRecord::new("ml", "Machine Learning")
                    .with_child("dl")
                    .with_child("rl")
                    .with_item("a"),
                CollectionRecord::new("dl", "Deep Learning")
                    .with_parent("ml")
                    .with_child("cnn")
                    .with_item("b"),
                CollectionRecord::new("cnn", "Convolutional")
                    .with_parent("dl")
                    .with_item("c")
                    .with_item("b"),
                CollectionRecord::new("rl", "Reinforcement").with_parent("ml"),
                CollectionRecord::new("nlp", "Language").with_item("d"),
            ],
            vec![CollectionId::new("nlp"), CollectionId::new("ml")],
        )
    }

    #[test]
    fn test_build_consistent() {
        let forest = CollectionForest::build(make_dataset());
        assert_eq!(forest.len(), 5);
        assert!(forest.warnings().is_empty());
        assert_eq!(ids(forest.roots()), vec!["nlp", "ml"]);
        assert_eq!(ids(&forest.get(&"ml".into()).unwrap().children), vec!["dl", "rl"]);
    }

    #[test]
    fn test_descendants() {
        let forest = CollectionForest::build(make_dataset());
        assert_eq!(ids(&forest.descendants(&"ml".into())), vec!["dl", "cnn", "rl"]);
        assert_eq!(ids(&forest.subtree(&"dl".into())), vec!["dl", "cnn"]);
        assert!(forest.descendants(&"nope".into()).is_empty());
    }

    #[test]
    fn test_path_and_depth() {
        let forest = CollectionForest::build(make_dataset());
        let path: Vec<&str> = forest.path(&"cnn".into()).iter().map(|n| n.title.as_str()).collect();
        assert_eq!(path, vec!["Machine Learning", "Deep Learning", "Convolutional"]);
        assert_eq!(forest.depth(&"cnn".into()), 3);
        assert_eq!(forest.max_depth(), 3);
    }

    #[test]
    fn test_item_count_is_distinct() {
        let forest = CollectionForest::build(make_dataset());
        // a, b, c with b listed twice in the subtree
        assert_eq!(forest.item_count(&"ml".into()), 3);
        assert_eq!(forest.item_count(&"cnn".into()), 2);
    }

    #[test]
    fn test_collections_containing() {
        let forest = CollectionForest::build(make_dataset());
        let found = forest.collections_containing(&ItemId::new("b"));
        let found: Vec<&str> = found.iter().map(|c| c.as_str()).collect();
        assert_eq!(found, vec!["dl", "cnn"]);
    }

    #[test]
    fn test_missing_parent_becomes_root() {
        let forest = CollectionForest::build(CollectionDataset::new(
            vec![CollectionRecord::new("x", "Orphan").with_parent("ghost")],
            vec![],
        ));
        assert_eq!(ids(forest.roots()), vec!["x"]);
        assert!(forest.get(&"x".into()).unwrap().parent.is_none());
        assert!(matches!(
            forest.warnings()[0],
            HierarchyWarning::MissingParent { .. }
        ));
    }

    #[test]
    fn test_cycle_is_broken() {
        let forest = CollectionForest::build(CollectionDataset::new(
            vec![
                CollectionRecord::new("a", "A").with_parent("b"),
                CollectionRecord::new("b", "B").with_parent("a"),
            ],
            vec![],
        ));

        assert!(forest
            .warnings()
            .iter()
            .any(|w| matches!(w, HierarchyWarning::Cycle { .. })));
        // a is cut and becomes the root, b stays below it
        assert_eq!(ids(forest.roots()), vec!["a"]);
        assert_eq!(ids(&forest.descendants(&"a".into())), vec!["b"]);
        assert_eq!(ids(&forest.descendants(&"b".into())), Vec::<&str>::new());
    }

    #[test]
    fn test_self_parent_is_cycle() {
        let forest = CollectionForest::build(CollectionDataset::new(
            vec![CollectionRecord::new("a", "A").with_parent("a")],
            vec![],
        ));
        assert_eq!(ids(forest.roots()), vec!["a"]);
        assert_eq!(forest.warnings(), &[HierarchyWarning::Cycle { id: "a".into() }]);
    }

    #[test]
    fn test_inconsistent_child_lists() {
        let forest = CollectionForest::build(CollectionDataset::new(
            vec![
                CollectionRecord::new("p", "P").with_child("q"),
                CollectionRecord::new("q", "Q"),
                CollectionRecord::new("r", "R").with_parent("p"),
            ],
            vec![CollectionId::new("p"), CollectionId::new("r"), CollectionId::new("zz")],
        ));

        // q does not name p as its parent; r does but was not listed
        assert_eq!(ids(&forest.get(&"p".into()).unwrap().children), vec!["r"]);
        assert_eq!(ids(forest.roots()), vec!["p", "q"]);
        let warnings = forest.warnings();
        assert!(warnings.contains(&HierarchyWarning::InconsistentChild {
            parent: "p".into(),
            child: "q".into()
        }));
        assert!(warnings.contains(&HierarchyWarning::RootHasParent { id: "r".into() }));
        assert!(warnings.contains(&HierarchyWarning::UnknownRoot { id: "zz".into() }));
    }

    #[test]
    fn test_duplicate_titles_and_ids() {
        let forest = CollectionForest::build(CollectionDataset::new(
            vec![
                CollectionRecord::new("a", "Papers"),
                CollectionRecord::new("b", "papers"),
                CollectionRecord::new("a", "Again"),
            ],
            vec![],
        ));
        assert_eq!(forest.len(), 2);
        assert!(forest
            .warnings()
            .contains(&HierarchyWarning::DuplicateId { id: "a".into() }));
        assert!(forest.warnings().contains(&HierarchyWarning::DuplicateTitle {
            parent: None,
            title: "papers".to_string()
        }));
    }

    #[test]
    fn test_deep_chain_is_bounded() {
        let mut records = vec![CollectionRecord::new("n0", "n0")];
        for i in 1..(MAX_DEPTH + 10) {
            records.push(CollectionRecord::new(format!("n{i}"), format!("n{i}")).with_parent(format!("n{}", i - 1)));
        }
        let forest = CollectionForest::build(CollectionDataset::new(records, vec![]));

        let subtree = forest.subtree(&"n0".into());
        assert_eq!(subtree.len(), MAX_DEPTH + 1);
        assert_eq!(forest.max_depth(), MAX_DEPTH);
    }
}
