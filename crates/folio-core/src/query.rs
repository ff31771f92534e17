//! Free-text query evaluation.
//!
//! A query is split on whitespace into terms and evaluated with AND semantics:
//! a record matches when every term occurs somewhere in its searchable text,
//! not necessarily in the same field and not necessarily as a phrase.
//!
//! Per term:
//! - At least [`GRAM_LEN`] characters: exact word-index hits, unioned with
//!   trigram candidates that pass substring verification
//! - Shorter: substring scan over every record's searchable text
//!
//! An empty (or all-whitespace) query matches every record. Until an index has
//! been attached the engine reports not-ready and matches nothing.

use crate::index::{intersect_sorted, union_sorted, SearchIndex, GRAM_LEN};
use std::sync::Arc;
use tracing::debug;

/// Trim and case-fold raw query text.
pub fn normalize_query(text: &str) -> String {
    text.trim().to_lowercase()
}

/// A parsed free-text query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    terms: Vec<String>,
}

impl Query {
    /// Parse raw query text into normalized, de-duplicated terms.
    pub fn parse(text: &str) -> Self {
        let normalized = normalize_query(text);
        let mut terms: Vec<String> = Vec::new();
        for term in normalized.split_whitespace() {
            if !terms.iter().any(|t| t == term) {
                terms.push(term.to_string());
            }
        }
        Query { terms }
    }

    /// The query terms, in input order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Check if this query matches everything.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Result of evaluating a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSet {
    /// Every record matches
    All,
    /// Ascending positions of the matching records
    Positions(Vec<usize>),
}

impl MatchSet {
    /// The empty result.
    pub fn none() -> Self {
        MatchSet::Positions(Vec::new())
    }

    /// Check if nothing matches.
    pub fn is_empty(&self) -> bool {
        matches!(self, MatchSet::Positions(p) if p.is_empty())
    }
}

/// Evaluates queries against a search index.
#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    index: Option<Arc<SearchIndex>>,
}

impl QueryEngine {
    /// Create an engine over a built index.
    pub fn new(index: Arc<SearchIndex>) -> Self {
        QueryEngine { index: Some(index) }
    }

    /// Create an engine whose index is still being built.
    pub fn pending() -> Self {
        QueryEngine { index: None }
    }

    /// Attach the index once it has been built.
    pub fn attach(&mut self, index: Arc<SearchIndex>) {
        self.index = Some(index);
    }

    /// Check if an index is available.
    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    /// The attached index, if any.
    pub fn index(&self) -> Option<&SearchIndex> {
        self.index.as_deref()
    }

    /// Evaluate a query.
    pub fn run(&self, query: &Query) -> MatchSet {
        let Some(index) = self.index.as_deref() else {
            debug!("Query issued before the index was ready");
            return MatchSet::none();
        };

        if query.is_empty() {
            return MatchSet::All;
        }

        let mut result: Option<Vec<usize>> = None;
        for term in query.terms() {
            let hits = term_matches(index, term);
            let combined = match result {
                None => hits,
                Some(prev) => intersect_sorted(&prev, &hits),
            };
            if combined.is_empty() {
                debug!(term = %term, "Query term eliminated all candidates");
                return MatchSet::none();
            }
            result = Some(combined);
        }

        MatchSet::Positions(result.unwrap_or_default())
    }

    /// Evaluate raw query text.
    pub fn search(&self, text: &str) -> MatchSet {
        self.run(&Query::parse(text))
    }
}

/// Ascending positions of the records whose text contains `term`.
fn term_matches(index: &SearchIndex, term: &str) -> Vec<usize> {
    if term.chars().count() < GRAM_LEN {
        return index
            .texts()
            .iter()
            .enumerate()
            .filter(|(_, text)| text.contains(term))
            .map(|(pos, _)| pos)
            .collect();
    }

    let exact = index.word_postings(term);
    let verified: Vec<usize> = index
        .trigram_candidates(term)
        .unwrap_or_default()
        .into_iter()
        .filter(|&pos| index.text(pos).map_or(false, |text| text.contains(term)))
        .collect();

    union_sorted(exact, &verified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::CollectionDataset;
    use crate::store::ItemStore;
    use crate::types::{Author, Item};

    fn make_engine() -> QueryEngine {
        let store = ItemStore::new(
            vec![
                Item::new("A", "Deep Learning").with_year(2020),
                Item::new("B", "Shallow Parsing").with_year(2019),
                Item::new("C", "Deep Parsing").with_year(2021),
                Item::new("D", "AI in Go")
                    .with_author(Author::new("Demis", "Hassabis"))
                    .with_keyword("games"),
            ],
            CollectionDataset::default(),
        );
        QueryEngine::new(Arc::new(SearchIndex::build(&store)))
    }

    fn positions(set: MatchSet) -> Vec<usize> {
        match set {
            MatchSet::All => panic!("expected positions"),
            MatchSet::Positions(p) => p,
        }
    }

    #[test]
    fn test_parse() {
        let query = Query::parse("  Deep   PARSING deep ");
        assert_eq!(query.terms(), &["deep".to_string(), "parsing".to_string()]);
        assert!(Query::parse(" \t\n ").is_empty());
    }

    #[test]
    fn test_empty_query_matches_all() {
        let engine = make_engine();
        assert_eq!(engine.search(""), MatchSet::All);
        assert_eq!(engine.search("   "), MatchSet::All);
    }

    #[test]
    fn test_single_term() {
        let engine = make_engine();
        assert_eq!(positions(engine.search("deep")), vec![0, 2]);
        assert_eq!(positions(engine.search("DEEP")), vec![0, 2]);
    }

    #[test]
    fn test_terms_are_conjunctive() {
        let engine = make_engine();
        assert_eq!(positions(engine.search("deep parsing")), vec![2]);
        assert_eq!(positions(engine.search("parsing deep")), vec![2]);
        assert!(engine.search("deep nothing").is_empty());
    }

    #[test]
    fn test_terms_may_match_different_fields() {
        let engine = make_engine();
        assert_eq!(positions(engine.search("hassabis games")), vec![3]);
    }

    #[test]
    fn test_substring_via_trigrams() {
        let engine = make_engine();
        // not a whole token, found through verified trigram candidates
        assert_eq!(positions(engine.search("arsin")), vec![1, 2]);
        assert_eq!(positions(engine.search("earn")), vec![0]);
        // the joined words never occur contiguously
        assert!(engine.search("deeplearning").is_empty());
    }

    #[test]
    fn test_short_terms_scan() {
        let engine = make_engine();
        assert_eq!(positions(engine.search("ai")), vec![3]);
        assert_eq!(positions(engine.search("go")), vec![3]);
        assert_eq!(positions(engine.search("p")), vec![0, 1, 2]);
    }

    #[test]
    fn test_pending_index_matches_nothing() {
        let engine = QueryEngine::pending();
        assert!(!engine.is_ready());
        assert!(engine.search("deep").is_empty());
        assert!(engine.search("").is_empty());
    }
}
