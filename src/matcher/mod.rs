//! Catalog matching for scraped product titles.
//!
//! Storefront titles are noisy (abbreviations, reordered words, unit
//! variants), so no single rule holds up. Matching runs an ordered list of
//! named strategies per catalog entry and short-circuits on the first hit.
//! OR semantics: liberal recall, with downstream thresholds controlling noise.

use crate::config::{KeywordPair, MatcherConfig, StrategyKind};
use crate::models::TrackedProduct;
use std::collections::HashSet;
use strsim::normalized_levenshtein;

pub struct ProductMatcher {
    catalog: Vec<TrackedProduct>,
    config: MatcherConfig,
}

impl ProductMatcher {
    pub fn new(catalog: Vec<TrackedProduct>, config: MatcherConfig) -> Self {
        Self { catalog, config }
    }

    /// First catalog entry the candidate name corresponds to, if any.
    /// Checks every tracked entry; catalog order only breaks ties.
    pub fn match_catalog(&self, candidate: &str) -> Option<&TrackedProduct> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return None;
        }
        self.catalog
            .iter()
            .find(|tracked| self.matches_entry(&tracked.name, candidate))
    }

    pub fn is_tracked(&self, candidate: &str) -> bool {
        self.match_catalog(candidate).is_some()
    }

    fn matches_entry(&self, tracked: &str, candidate: &str) -> bool {
        self.config
            .strategies
            .iter()
            .any(|strategy| self.strategy_matches(*strategy, tracked, candidate))
    }

    fn strategy_matches(&self, strategy: StrategyKind, tracked: &str, candidate: &str) -> bool {
        match strategy {
            StrategyKind::Exact => tracked.eq_ignore_ascii_case(candidate),
            StrategyKind::Similarity => {
                let ratio =
                    normalized_levenshtein(&tracked.to_lowercase(), &candidate.to_lowercase());
                ratio > self.config.effective_similarity_threshold()
            }
            StrategyKind::WordOverlap => {
                word_overlap(tracked, candidate, self.config.word_overlap_ratio)
            }
            StrategyKind::Keywords => {
                let tracked_lower = tracked.to_lowercase();
                let candidate_lower = candidate.to_lowercase();
                keyword_hit(&self.config.brand_keywords, &tracked_lower, &candidate_lower)
                    || keyword_hit(
                        &self.config.product_type_keywords,
                        &tracked_lower,
                        &candidate_lower,
                    )
            }
        }
    }
}

/// Token-set overlap: enough of the tracked name's words must appear in the
/// candidate, case-insensitive.
fn word_overlap(tracked: &str, candidate: &str, ratio: f64) -> bool {
    let tracked_lower = tracked.to_lowercase();
    let candidate_lower = candidate.to_lowercase();
    let tracked_words: HashSet<&str> = tracked_lower.split_whitespace().collect();
    let candidate_words: HashSet<&str> = candidate_lower.split_whitespace().collect();

    if tracked_words.is_empty() {
        return false;
    }

    let common = tracked_words.intersection(&candidate_words).count();
    common as f64 >= tracked_words.len() as f64 * ratio
}

fn keyword_hit(pairs: &[KeywordPair], tracked_lower: &str, candidate_lower: &str) -> bool {
    pairs.iter().any(|pair| {
        tracked_lower.contains(pair.tracked.as_str())
            && candidate_lower.contains(pair.candidate.as_str())
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchProfile;

    fn catalog(names: &[&str]) -> Vec<TrackedProduct> {
        names.iter().map(|n| TrackedProduct::from_name(*n)).collect()
    }

    fn only_strategy(kind: StrategyKind) -> MatcherConfig {
        MatcherConfig {
            strategies: vec![kind],
            ..MatcherConfig::default()
        }
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let matcher = ProductMatcher::new(
            catalog(&["Maggi Masala instant noodles 9.8 oz"]),
            only_strategy(StrategyKind::Exact),
        );
        assert!(matcher.is_tracked("maggi masala INSTANT noodles 9.8 OZ"));
        assert!(!matcher.is_tracked("Maggi Masala instant noodles 12 oz"));
    }

    #[test]
    fn word_overlap_at_forty_percent() {
        let matcher = ProductMatcher::new(
            catalog(&["Maggi Masala Instant Noodles 9.8 oz"]),
            only_strategy(StrategyKind::WordOverlap),
        );
        // 4 of 6 tracked tokens present, well past the 0.4 bar.
        assert!(matcher.is_tracked("Maggi Masala instant noodles 9.8oz"));
        // A single shared token out of six is not enough.
        assert!(!matcher.is_tracked("Cup Noodles"));
    }

    #[test]
    fn keyword_tables_bridge_title_variants() {
        let matcher = ProductMatcher::new(
            catalog(&["Lee Kum Kee Supreme Soy Sauce 500 ml"]),
            only_strategy(StrategyKind::Keywords),
        );
        // ("soy sauce", "soy") pair: both sides carry their keyword.
        assert!(matcher.is_tracked("Premium Soy Sauce Bottle"));
        assert!(!matcher.is_tracked("Rice Vinegar 300 ml"));
    }

    #[test]
    fn unrelated_names_do_not_match() {
        let matcher = ProductMatcher::new(
            catalog(&["Maggi Masala Instant Noodles 9.8 oz", "Amul Ghee clarified butter"]),
            MatcherConfig::default(),
        );
        assert!(!matcher.is_tracked("Sony WH-1000XM5 Wireless Headphones"));
        assert!(!matcher.is_tracked(""));
    }

    #[test]
    fn lowering_the_threshold_only_widens_the_match_set() {
        // ~0.80 similarity pair: inside the permissive band, outside strict.
        let tracked = "Laxmi Toor Dal";
        let candidate = "Laxmi Tuar Daal";

        let permissive = ProductMatcher::new(
            catalog(&[tracked]),
            MatcherConfig {
                profile: MatchProfile::Permissive,
                ..only_strategy(StrategyKind::Similarity)
            },
        );
        let strict = ProductMatcher::new(
            catalog(&[tracked]),
            MatcherConfig {
                profile: MatchProfile::Strict,
                ..only_strategy(StrategyKind::Similarity)
            },
        );

        assert!(permissive.is_tracked(candidate));
        assert!(!strict.is_tracked(candidate));

        // Anything strict accepts, permissive must accept too.
        for name in ["Laxmi Toor Dal", "Laxmi Toor Dall"] {
            if strict.is_tracked(name) {
                assert!(permissive.is_tracked(name));
            }
        }
    }

    #[test]
    fn explicit_threshold_overrides_profile() {
        let matcher = ProductMatcher::new(
            catalog(&["Laxmi Toor Dal"]),
            MatcherConfig {
                profile: MatchProfile::Strict,
                similarity_threshold: Some(0.5),
                ..only_strategy(StrategyKind::Similarity)
            },
        );
        assert!(matcher.is_tracked("Laxmi Tuar Daal"));
    }

    #[test]
    fn match_catalog_returns_canonical_entry() {
        let matcher = ProductMatcher::new(
            catalog(&["Amul Ghee clarified butter", "Maggi Masala Instant Noodles 9.8 oz"]),
            MatcherConfig::default(),
        );
        let hit = matcher.match_catalog("Maggi Masala instant noodles 9.8oz");
        assert_eq!(
            hit.map(|p| p.name.as_str()),
            Some("Maggi Masala Instant Noodles 9.8 oz")
        );
    }
}
