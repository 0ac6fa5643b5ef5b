use std::sync::Arc;
use tracing::debug;

use crate::catalog::{normalize_name, Catalog};
use crate::similarity::{EditDistance, ExactOnly, MatchStrategy};

pub const DEFAULT_THRESHOLD: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Exact,
    Fuzzy,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub hash: Option<u32>,
    pub confidence: Confidence,
    pub matched: Option<String>, // catalog key, set for fuzzy hits
}

impl Resolution {
    fn exact(hash: u32) -> Self {
        Resolution { hash: Some(hash), confidence: Confidence::Exact, matched: None }
    }

    fn fuzzy(hash: u32, key: &str) -> Self {
        Resolution {
            hash: Some(hash),
            confidence: Confidence::Fuzzy,
            matched: Some(key.to_string()),
        }
    }

    fn unresolved() -> Self {
        Resolution { hash: None, confidence: Confidence::Unresolved, matched: None }
    }
}

/// Maps free-text names onto catalog hashes: exact lookup first, then the
/// configured match strategy gated by `threshold` (0..=100).
#[derive(Clone)]
pub struct Resolver {
    strategy: Arc<dyn MatchStrategy>,
    threshold: u8,
}

impl Resolver {
    pub fn new(strategy: Arc<dyn MatchStrategy>, threshold: u8) -> Self {
        Resolver { strategy, threshold: threshold.min(100) }
    }

    pub fn fuzzy(threshold: u8) -> Self {
        Self::new(Arc::new(EditDistance), threshold)
    }

    pub fn exact_only() -> Self {
        Self::new(Arc::new(ExactOnly), DEFAULT_THRESHOLD)
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn resolve(&self, name: Option<&str>, catalog: &Catalog) -> Resolution {
        let Some(name) = name else {
            return Resolution::unresolved();
        };
        let key = normalize_name(name);
        if key.is_empty() {
            return Resolution::unresolved();
        }

        if let Some(hash) = catalog.get(&key) {
            return Resolution::exact(hash);
        }

        match self.strategy.best_match(&key, catalog) {
            Some(hit) if hit.score >= f64::from(self.threshold) => {
                debug!("Fuzzy match - name='{}', key='{}', score={:.1}", key, hit.key, hit.score);
                Resolution::fuzzy(hit.hash, hit.key)
            }
            Some(hit) => {
                debug!("Below threshold - name='{}', best='{}', score={:.1}", key, hit.key, hit.score);
                Resolution::unresolved()
            }
            None => Resolution::unresolved(),
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::fuzzy(DEFAULT_THRESHOLD)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("strategy", &self.strategy.name())
            .field("threshold", &self.threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perks() -> Catalog {
        Catalog::from_map([("Kill Clip", 1u32), ("Firefly", 2), ("Rampage", 3), ("Outlaw", 4)])
    }

    #[test]
    fn test_exact_is_case_insensitive() {
        let r = Resolver::default();
        for name in ["Kill Clip", "kill clip", "KILL CLIP", "  Kill Clip\t"] {
            let res = r.resolve(Some(name), &perks());
            assert_eq!(res.confidence, Confidence::Exact, "{name}");
            assert_eq!(res.hash, Some(1));
            assert_eq!(res.matched, None);
        }
    }

    #[test]
    fn test_every_catalog_key_resolves_exactly() {
        let cat = perks();
        let r = Resolver::fuzzy(100);
        for (key, hash) in cat.iter() {
            let res = r.resolve(Some(key.to_uppercase().as_str()), &cat);
            assert_eq!(res, Resolution::exact(hash));
        }
    }

    #[test]
    fn test_blank_and_absent_are_unresolved() {
        let r = Resolver::default();
        for name in [None, Some(""), Some("   ")] {
            let res = r.resolve(name, &perks());
            assert_eq!(res.confidence, Confidence::Unresolved);
            assert_eq!(res.hash, None);
        }
        assert_eq!(r.resolve(None, &Catalog::default()).hash, None);
    }

    #[test]
    fn test_typo_resolves_fuzzy_above_threshold() {
        let res = Resolver::fuzzy(80).resolve(Some("kill clipp"), &perks());
        assert_eq!(res.confidence, Confidence::Fuzzy);
        assert_eq!(res.hash, Some(1));
        assert_eq!(res.matched.as_deref(), Some("kill clip"));
    }

    #[test]
    fn test_typo_unresolved_when_threshold_not_met() {
        // "kill clipp" scores about 94.7 against "kill clip"
        let res = Resolver::fuzzy(97).resolve(Some("kill clipp"), &perks());
        assert_eq!(res.confidence, Confidence::Unresolved);
        assert_eq!(res.hash, None);
    }

    #[test]
    fn test_truncated_names_resolve_fuzzy() {
        let cat = Catalog::from_map([("Incandescent", 10u32), ("Chain Reaction", 11)]);
        let r = Resolver::default();
        let res = r.resolve(Some("Incandesc"), &cat);
        assert_eq!(res.confidence, Confidence::Fuzzy);
        assert_eq!(res.hash, Some(10));
        assert_eq!(r.resolve(Some("chain react"), &cat).hash, Some(11));
    }

    #[test]
    fn test_unrelated_name_is_unresolved() {
        let res = Resolver::default().resolve(Some("Headstone"), &perks());
        assert_eq!(res.confidence, Confidence::Unresolved);
    }

    #[test]
    fn test_exact_only_skips_fuzzy_search() {
        let r = Resolver::exact_only();
        assert_eq!(r.resolve(Some("kill clip"), &perks()).confidence, Confidence::Exact);
        assert_eq!(r.resolve(Some("kill clipp"), &perks()).confidence, Confidence::Unresolved);
    }

    #[test]
    fn test_threshold_is_clamped() {
        assert_eq!(Resolver::fuzzy(250).threshold(), 100);
    }
}
