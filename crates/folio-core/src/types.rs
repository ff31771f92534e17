//! Core data types for Folio.
//!
//! This module defines the bibliographic records and collection nodes that
//! the engine operates on. These types are:
//!
//! - **Deserializable**: Loaded once from the externally supplied datasets
//! - **Immutable after load**: Nothing in the engine mutates a record
//! - **Cheap to compare**: Identifiers are newtypes over strings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier for a bibliographic record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create a new item ID
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    /// Get the item ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

/// Unique identifier for a collection node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub String);

impl CollectionId {
    /// Create a new collection ID
    pub fn new(id: impl Into<String>) -> Self {
        CollectionId(id.into())
    }

    /// Get the collection ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        CollectionId(s.to_string())
    }
}

/// Kind of bibliographic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ItemType {
    Article,
    Book,
    Conference,
    Thesis,
    Report,
    Webpage,
    #[default]
    Other,
}

impl ItemType {
    /// Lowercase name, as it appears in datasets and in the searchable text.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Article => "article",
            ItemType::Book => "book",
            ItemType::Conference => "conference",
            ItemType::Thesis => "thesis",
            ItemType::Report => "report",
            ItemType::Webpage => "webpage",
            ItemType::Other => "other",
        }
    }

    /// Map a free-form type string onto a known type.
    ///
    /// Matching ignores case, `_` and `-`, and accepts the common reference
    /// manager spellings (`journalArticle`, `bookSection`, `conferencePaper`).
    /// Anything unrecognized becomes [`ItemType::Other`].
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "article" | "journalarticle" => ItemType::Article,
            "book" | "booksection" => ItemType::Book,
            "conference" | "conferencepaper" => ItemType::Conference,
            "thesis" => ItemType::Thesis,
            "report" => ItemType::Report,
            "webpage" => ItemType::Webpage,
            _ => ItemType::Other,
        }
    }
}

impl From<String> for ItemType {
    fn from(s: String) -> Self {
        ItemType::parse(&s)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single author of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Author {
    /// Given (first) name
    #[serde(alias = "given_name")]
    pub given: String,

    /// Family name (surname)
    #[serde(alias = "surname", alias = "family_name")]
    pub family: String,

    /// Name as displayed; derived from given and family names when empty
    #[serde(alias = "full_name", alias = "name")]
    pub display: String,
}

impl Author {
    /// Create an author from given and family names.
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        let mut author = Author {
            given: given.into(),
            family: family.into(),
            display: String::new(),
        };
        author.fill_display();
        author
    }

    /// Derive the display name if it was not supplied.
    pub fn fill_display(&mut self) {
        if self.display.trim().is_empty() {
            self.display = format!("{} {}", self.given.trim(), self.family.trim())
                .trim()
                .to_string();
        }
    }
}

/// A file or link attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// External identifiers of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identifiers {
    pub doi: Option<String>,
    pub url: Option<String>,
}

/// A bibliographic record.
///
/// Records are loaded once and never mutated afterwards. `collections` holds
/// the reconciled membership set after the store has been built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub id: ItemId,

    #[serde(rename = "type")]
    pub item_type: ItemType,

    pub title: String,

    pub authors: Vec<Author>,

    pub year: Option<i32>,

    pub venue: String,

    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    pub keywords: BTreeSet<String>,

    pub collections: BTreeSet<CollectionId>,

    #[serde(flatten)]
    pub identifiers: Identifiers,

    pub attachments: Vec<Attachment>,
}

impl Item {
    /// Create a record with just an id and a title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Item {
            id: ItemId::new(id),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the item type
    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    /// Set the publication year
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Append an author
    pub fn with_author(mut self, author: Author) -> Self {
        self.authors.push(author);
        self
    }

    /// Set the venue
    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = venue.into();
        self
    }

    /// Set the abstract
    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_text = Some(text.into());
        self
    }

    /// Add a keyword
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.insert(keyword.into());
        self
    }

    /// Add a collection membership
    pub fn in_collection(mut self, id: impl Into<String>) -> Self {
        self.collections.insert(CollectionId::new(id));
        self
    }

    /// Display name of the first author, if any.
    pub fn primary_author(&self) -> Option<&str> {
        self.authors
            .first()
            .map(|a| a.display.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Concatenated, case-folded searchable text.
    ///
    /// Covers title, author names, abstract, keywords, venue and type, joined
    /// by single spaces. This is the text the search index is built from and
    /// that substring verification runs against.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(4 + self.authors.len() + self.keywords.len());

        if !self.title.is_empty() {
            parts.push(&self.title);
        }
        for author in &self.authors {
            if !author.display.is_empty() {
                parts.push(&author.display);
            }
        }
        if let Some(text) = self.abstract_text.as_deref().filter(|t| !t.is_empty()) {
            parts.push(text);
        }
        parts.extend(self.keywords.iter().map(String::as_str));
        if !self.venue.is_empty() {
            parts.push(&self.venue);
        }
        parts.push(self.item_type.as_str());

        parts.join(" ").to_lowercase()
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

/// A collection node as it appears in the collection dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionRecord {
    pub id: CollectionId,
    pub title: String,
    pub parent_id: Option<CollectionId>,
    pub children: Vec<CollectionId>,
    pub item_ids: Vec<ItemId>,
}

impl CollectionRecord {
    /// Create a node with an id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        CollectionRecord {
            id: CollectionId::new(id),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the parent node
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_id = Some(CollectionId::new(parent));
        self
    }

    /// Append a child node id
    pub fn with_child(mut self, child: impl Into<String>) -> Self {
        self.children.push(CollectionId::new(child));
        self
    }

    /// Append a member item id
    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item_ids.push(ItemId::new(item));
        self
    }
}

/// Statistics about the loaded datasets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of records in the store
    pub items: usize,

    /// Number of collection nodes
    pub collections: usize,

    /// Number of root collections
    pub roots: usize,

    /// Depth of the deepest collection (roots have depth 1)
    pub max_depth: usize,

    /// Collections with at least one direct member
    pub collections_with_items: usize,

    /// Records that belong to no collection
    pub unfiled_items: usize,

    /// Number of hierarchy warnings raised while building the forest
    pub warnings: usize,

    /// When the store was built
    pub loaded_at: Option<DateTime<Utc>>,
}
