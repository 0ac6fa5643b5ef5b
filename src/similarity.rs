use rayon::prelude::*;
use std::cmp::Ordering;

use crate::catalog::Catalog;

/// Best-scoring catalog key for a name that had no direct hit.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyHit<'c> {
    pub key: &'c str,
    pub hash: u32,
    pub score: f64, // 0..=100
}

/// Pluggable "best match" search; the exact lookup lives in the resolver.
pub trait MatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn best_match<'c>(&self, name: &str, catalog: &'c Catalog) -> Option<FuzzyHit<'c>>;
}

/// Fuzzy matching disabled: only direct catalog hits resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactOnly;

impl MatchStrategy for ExactOnly {
    fn name(&self) -> &'static str {
        "exact-only"
    }

    fn best_match<'c>(&self, _name: &str, _catalog: &'c Catalog) -> Option<FuzzyHit<'c>> {
        None
    }
}

/// Indel ratio (`2 * LCS / (len_a + len_b)`) against every catalog key.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditDistance;

/// Similarity of two strings on a 0..=100 scale.
pub fn ratio(a: &str, b: &str) -> f64 {
    rapidfuzz::fuzz::ratio(a.chars(), b.chars()) * 100.0
}

// Higher score wins; equal scores go to the lexicographically smaller key.
// Commutative and associative, so the parallel reduction is deterministic.
fn better<'c>(a: FuzzyHit<'c>, b: FuzzyHit<'c>) -> FuzzyHit<'c> {
    match a.score.partial_cmp(&b.score) {
        Some(Ordering::Greater) => a,
        Some(Ordering::Less) => b,
        _ => {
            if a.key <= b.key {
                a
            } else {
                b
            }
        }
    }
}

impl MatchStrategy for EditDistance {
    fn name(&self) -> &'static str {
        "edit-distance"
    }

    fn best_match<'c>(&self, name: &str, catalog: &'c Catalog) -> Option<FuzzyHit<'c>> {
        let entries: Vec<(&'c str, u32)> = catalog.iter().collect();
        entries
            .par_iter()
            .map(|&(key, hash)| FuzzyHit {
                key,
                hash,
                score: ratio(name, key),
            })
            .reduce_with(better)
    }
}
