//! Search index over the item store.
//!
//! The index is built once per loaded dataset and never updated. It keeps:
//!
//! - The case-folded searchable text of every record, by dataset position
//! - A word index: tokens of at least [`MIN_TOKEN_LEN`] characters to positions
//! - A trigram index: every 3-character substring of the text to positions
//!
//! Posting lists are ascending and free of duplicates, so two builds over the
//! same records in the same order produce identical indices.
//!
//! The trigram index only narrows candidates. A record whose text contains
//! every trigram of a term does not necessarily contain the term, so callers
//! must verify candidates against [`SearchIndex::text`].

use crate::store::ItemStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, instrument};

/// Minimum length (in characters) of an indexed word token.
pub const MIN_TOKEN_LEN: usize = 3;

/// Length of an n-gram in the trigram index.
pub const GRAM_LEN: usize = 3;

/// Statistics about a built index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of indexed records
    pub items: usize,

    /// Number of distinct word tokens
    pub words: usize,

    /// Number of distinct trigrams
    pub trigrams: usize,

    /// Total searchable text volume in bytes
    pub text_bytes: usize,

    /// Build duration in milliseconds
    pub build_ms: u64,

    /// When the index was built
    pub built_at: Option<DateTime<Utc>>,
}

/// Word and trigram index over the searchable text of every record.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    texts: Vec<String>,
    words: HashMap<String, Vec<usize>>,
    trigrams: HashMap<String, Vec<usize>>,
    stats: IndexStats,
}

impl SearchIndex {
    /// Build the index from every record in the store.
    #[instrument(skip(store), fields(items = store.len()))]
    pub fn build(store: &ItemStore) -> Self {
        let started = Instant::now();
        let texts: Vec<String> = store.items().iter().map(|item| item.searchable_text()).collect();

        let mut words: HashMap<String, Vec<usize>> = HashMap::new();
        let mut trigrams: HashMap<String, Vec<usize>> = HashMap::new();

        for (pos, text) in texts.iter().enumerate() {
            for token in tokenize(text) {
                push_posting(words.entry(token.to_string()).or_default(), pos);
            }
            for gram in grams(text) {
                push_posting(trigrams.entry(gram).or_default(), pos);
            }
        }

        let stats = IndexStats {
            items: texts.len(),
            words: words.len(),
            trigrams: trigrams.len(),
            text_bytes: texts.iter().map(String::len).sum(),
            build_ms: started.elapsed().as_millis() as u64,
            built_at: Some(Utc::now()),
        };

        info!(
            items = stats.items,
            words = stats.words,
            trigrams = stats.trigrams,
            build_ms = stats.build_ms,
            "Search index built"
        );

        SearchIndex {
            texts,
            words,
            trigrams,
            stats,
        }
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Check if the index covers no records.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Build statistics.
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Searchable text of the record at a position.
    pub fn text(&self, position: usize) -> Option<&str> {
        self.texts.get(position).map(String::as_str)
    }

    /// All searchable texts, by position.
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Positions whose text contains `token` as a whole word.
    pub fn word_postings(&self, token: &str) -> &[usize] {
        self.words.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Positions whose text contains `gram`.
    pub fn trigram_postings(&self, gram: &str) -> &[usize] {
        self.trigrams.get(gram).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Positions whose text contains every trigram of `term`.
    ///
    /// This is a superset of the records containing `term`. Returns `None`
    /// for terms shorter than [`GRAM_LEN`], where trigrams are undefined.
    pub fn trigram_candidates(&self, term: &str) -> Option<Vec<usize>> {
        let mut lists: Vec<&[usize]> = grams(term).map(|g| self.trigram_postings(&g)).collect();
        if lists.is_empty() {
            return None;
        }
        lists.sort_by_key(|l| l.len());

        let mut candidates = lists[0].to_vec();
        for list in &lists[1..] {
            if candidates.is_empty() {
                break;
            }
            candidates = intersect_sorted(&candidates, list);
        }
        Some(candidates)
    }
}

/// Split case-folded text into word tokens of at least [`MIN_TOKEN_LEN`] characters.
///
/// Tokens are maximal runs of alphanumeric characters.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
}

/// Every [`GRAM_LEN`]-character substring of `text`, in order.
pub fn grams(text: &str) -> impl Iterator<Item = String> + '_ {
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let count = bounds.len().saturating_sub(GRAM_LEN);
    (0..count).map(move |i| text[bounds[i]..bounds[i + GRAM_LEN]].to_string())
}

fn push_posting(list: &mut Vec<usize>, pos: usize) {
    if list.last() != Some(&pos) {
        list.push(pos);
    }
}

/// Intersect two ascending, duplicate-free position lists.
pub fn intersect_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Merge two ascending, duplicate-free position lists.
pub fn union_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
