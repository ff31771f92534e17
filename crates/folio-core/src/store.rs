//! Item store: the immutable records and collection forest.
//!
//! The store is populated once from the two externally supplied datasets and
//! is read-only afterwards. Records keep their dataset order; that order is
//! the tie-breaker for sorting and the position space of the search index.
//!
//! Loading reconciles collection membership in both directions: a record is
//! a member of a collection when either the record or the collection node says
//! so. References to unknown records or collections are dropped with a warning.

use crate::error::{FolioError, Result};
use crate::hierarchy::{CollectionDataset, CollectionForest};
use crate::types::{CollectionId, Item, ItemId, StoreStats};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Accepted shapes of the item dataset.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemDataset {
    List(Vec<Item>),
    Wrapped { items: Vec<Item> },
}

impl ItemDataset {
    fn into_items(self) -> Vec<Item> {
        match self {
            ItemDataset::List(items) | ItemDataset::Wrapped { items } => items,
        }
    }
}

/// Immutable holder of records and the collection forest.
#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: Vec<Item>,
    by_id: HashMap<ItemId, usize>,
    forest: CollectionForest,
    loaded_at: Option<DateTime<Utc>>,
}

impl ItemStore {
    /// Build the store from already parsed datasets.
    #[instrument(skip_all, fields(items = items.len(), collections = collections.collections.len()))]
    pub fn new(items: Vec<Item>, collections: CollectionDataset) -> Self {
        let mut forest = CollectionForest::build(collections);

        let mut records: Vec<Item> = Vec::with_capacity(items.len());
        let mut by_id = HashMap::with_capacity(items.len());
        for mut item in items {
            if by_id.contains_key(&item.id) {
                warn!(item = %item.id, "Duplicate item id, keeping the first record");
                continue;
            }
            for author in item.authors.iter_mut() {
                author.fill_display();
            }
            let unknown: Vec<CollectionId> = item
                .collections
                .iter()
                .filter(|c| !forest.contains(c))
                .cloned()
                .collect();
            for cid in unknown {
                warn!(item = %item.id, collection = %cid, "Item references unknown collection");
                item.collections.remove(&cid);
            }
            by_id.insert(item.id.clone(), records.len());
            records.push(item);
        }

        // Node-side memberships flow into the records
        let mut node_members: Vec<(CollectionId, ItemId)> = Vec::new();
        for node in forest.nodes() {
            for member in &node.members {
                node_members.push((node.id.clone(), member.clone()));
            }
        }
        for (cid, iid) in node_members {
            match by_id.get(&iid) {
                Some(&pos) => {
                    records[pos].collections.insert(cid);
                }
                None => warn!(collection = %cid, item = %iid, "Collection references unknown item"),
            }
        }

        // ...and back into the nodes, so both views agree
        let mut members: HashMap<CollectionId, BTreeSet<ItemId>> = HashMap::new();
        for item in &records {
            for cid in &item.collections {
                members.entry(cid.clone()).or_default().insert(item.id.clone());
            }
        }
        forest.set_members(members);

        let unfiled = records.iter().filter(|i| i.collections.is_empty()).count();
        if unfiled > 0 {
            debug!(unfiled, "Items not assigned to any collection");
        }

        info!(
            items = records.len(),
            collections = forest.len(),
            "Item store loaded"
        );

        ItemStore {
            items: records,
            by_id,
            forest,
            loaded_at: Some(Utc::now()),
        }
    }

    /// Load both datasets from JSON files.
    #[instrument]
    pub fn load(items_path: &Path, collections_path: &Path) -> Result<Self> {
        let items = load_items(items_path)?;
        let collections = load_collections(collections_path)?;
        Ok(ItemStore::new(items, collections))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All records in dataset order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Record at a dataset position.
    pub fn at(&self, position: usize) -> Option<&Item> {
        self.items.get(position)
    }

    /// Dataset position of a record.
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Look up a record by id.
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.position(id).map(|pos| &self.items[pos])
    }

    /// The collection forest.
    pub fn forest(&self) -> &CollectionForest {
        &self.forest
    }

    /// Summary statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            items: self.items.len(),
            collections: self.forest.len(),
            roots: self.forest.roots().len(),
            max_depth: self.forest.max_depth(),
            collections_with_items: self
                .forest
                .nodes()
                .filter(|n| !n.members.is_empty())
                .count(),
            unfiled_items: self
                .items
                .iter()
                .filter(|i| i.collections.is_empty())
                .count(),
            warnings: self.forest.warnings().len(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Read the item dataset from a JSON file.
pub fn load_items(path: &Path) -> Result<Vec<Item>> {
    let contents = read_dataset(path)?;
    let dataset: ItemDataset = serde_json::from_str(&contents)
        .map_err(|e| FolioError::dataset_parse(path, e.to_string()))?;
    Ok(dataset.into_items())
}

/// Read the collection dataset from a JSON file.
pub fn load_collections(path: &Path) -> Result<CollectionDataset> {
    let contents = read_dataset(path)?;
    serde_json::from_str(&contents).map_err(|e| FolioError::dataset_parse(path, e.to_string()))
}

fn read_dataset(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(FolioError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }
    debug!(path = %path.display(), "Reading dataset");
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, CollectionRecord};
    use tempfile::TempDir;

    fn make_store() -> ItemStore {
        let items = vec![
            Item::new("a", "Deep Learning").in_collection("ml"),
            Item::new("b", "Shallow Parsing").in_collection("ghost"),
            Item::new("c", "Deep Parsing"),
            Item::new("a", "Duplicate"),
        ];
        let collections = CollectionDataset::new(
            vec![
                CollectionRecord::new("ml", "ML").with_item("c").with_item("zz"),
                CollectionRecord::new("nlp", "NLP").with_parent("ml").with_item("b"),
            ],
            vec![CollectionId::new("ml")],
        );
        ItemStore::new(items, collections)
    }

    #[test]
    fn test_duplicates_dropped() {
        let store = make_store();
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(&ItemId::new("a")).unwrap().title, "Deep Learning");
        assert_eq!(store.position(&ItemId::new("c")), Some(2));
    }

    #[test]
    fn test_membership_reconciled() {
        let store = make_store();

        let b = store.get(&ItemId::new("b")).unwrap();
        let b_cols: Vec<&str> = b.collections.iter().map(|c| c.as_str()).collect();
        assert_eq!(b_cols, vec!["nlp"]);

        let c = store.get(&ItemId::new("c")).unwrap();
        assert!(c.collections.contains(&CollectionId::new("ml")));

        let ml = store.forest().get(&CollectionId::new("ml")).unwrap();
        let members: Vec<&str> = ml.members.iter().map(|i| i.as_str()).collect();
        assert_eq!(members, vec!["a", "c"]);
    }

    #[test]
    fn test_author_display_filled() {
        let item = Item::new("x", "t").with_author(Author {
            given: "Grace".to_string(),
            family: "Hopper".to_string(),
            display: String::new(),
        });
        let store = ItemStore::new(vec![item], CollectionDataset::default());
        assert_eq!(store.at(0).unwrap().authors[0].display, "Grace Hopper");
    }

    #[test]
    fn test_stats() {
        let stats = make_store().stats();
        assert_eq!(stats.items, 3);
        assert_eq!(stats.collections, 2);
        assert_eq!(stats.roots, 1);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.collections_with_items, 2);
        assert_eq!(stats.unfiled_items, 0);
        assert!(stats.loaded_at.is_some());
    }

    #[test]
    fn test_load_from_files() {
        let temp_dir = TempDir::new().unwrap();
        let items_path = temp_dir.path().join("items.json");
        let collections_path = temp_dir.path().join("collections.json");

        fs::write(
            &items_path,
            r#"{"items": [{"id": "a", "title": "Deep Learning", "year": 2020, "collections": ["c1"]}]}"#,
        )
        .unwrap();
        fs::write(
            &collections_path,
            r#"{"collections": [{"id": "c1", "title": "One"}], "roots": ["c1"]}"#,
        )
        .unwrap();

        let store = ItemStore::load(&items_path, &collections_path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.forest().item_count(&CollectionId::new("c1")), 1);
    }

    #[test]
    fn test_load_plain_array() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("items.json");
        fs::write(&path, r#"[{"id": "a", "title": "A"}, {"id": "b", "title": "B"}]"#).unwrap();

        let items = load_items(&path).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_load_errors() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.json");
        assert!(matches!(
            load_items(&missing),
            Err(FolioError::DatasetNotFound { .. })
        ));

        let broken = temp_dir.path().join("broken.json");
        fs::write(&broken, "{not json").unwrap();
        assert!(matches!(
            load_collections(&broken),
            Err(FolioError::DatasetParse { .. })
        ));
    }
}
