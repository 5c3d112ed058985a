use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rayon::prelude::*;

/// Default step budget for the backtracking engine before a match attempt is
/// abandoned (and treated as "no match").
pub(crate) const DEFAULT_BACKTRACK_LIMIT: usize = 100_000;

/// Capture groups of a successful match; index 0 is the whole match.
pub(crate) type Groups<'t> = Vec<Option<&'t str>>;

// ---------------------------------------------------------------------------
// Pattern: one compiled rule pattern, in whichever engine accepted it
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) enum Pattern {
    /// `regex` crate: linear time, no lookaround or backreferences.
    Linear(regex::Regex),
    /// `fancy_regex`: lookaround and backreferences, bounded by a backtrack limit.
    Backtracking(fancy_regex::Regex),
}

impl Pattern {
    /// Compile with the linear engine, falling back to the backtracking engine
    /// only when the linear one rejects the syntax. `None` when neither accepts it.
    pub fn compile(src: &str, backtrack_limit: usize) -> Option<Self> {
        let linear_err = match regex::Regex::new(src) {
            Ok(re) => return Some(Pattern::Linear(re)),
            Err(e) => e,
        };

        match fancy_regex::RegexBuilder::new(src)
            .backtrack_limit(backtrack_limit)
            .build()
        {
            Ok(re) => Some(Pattern::Backtracking(re)),
            Err(err) => {
                tracing::debug!(
                    pattern = src,
                    linear = %linear_err,
                    backtracking = %err,
                    "pattern rejected by both engines, skipping"
                );
                None
            }
        }
    }

    /// Leftmost match of the pattern in `subject`, as capture groups.
    pub fn captures<'t>(&self, subject: &'t str) -> Option<Groups<'t>> {
        match self {
            Pattern::Linear(re) => re
                .captures(subject)
                .map(|caps| caps.iter().map(|m| m.map(|m| m.as_str())).collect()),
            Pattern::Backtracking(re) => match re.captures(subject) {
                Ok(caps) => caps.map(|caps| caps.iter().map(|m| m.map(|m| m.as_str())).collect()),
                // Runaway backtracking counts as a miss.
                Err(err) => {
                    tracing::debug!(pattern = re.as_str(), %err, "match attempt abandoned");
                    None
                }
            },
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Pattern::Linear(_))
    }
}

// ---------------------------------------------------------------------------
// PatternCache: lazily compiled patterns keyed by source text
// ---------------------------------------------------------------------------

/// Concurrent cache of compiled patterns. Patterns that compile in neither
/// engine are cached as `None` so they are only attempted once.
#[derive(Debug)]
pub(crate) struct PatternCache {
    patterns: DashMap<String, Option<Arc<Pattern>>>,
    backtrack_limit: usize,
}

impl PatternCache {
    pub fn new(backtrack_limit: usize) -> Self {
        PatternCache {
            patterns: DashMap::new(),
            backtrack_limit,
        }
    }

    pub fn get(&self, src: &str) -> Option<Arc<Pattern>> {
        if let Some(hit) = self.patterns.get(src) {
            return hit.value().clone();
        }

        // The entry holds its shard locked while compiling, so concurrent
        // first uses of the same source compile it once.
        match self.patterns.entry(src.to_string()) {
            Entry::Occupied(e) => e.get().clone(),
            Entry::Vacant(e) => {
                let compiled = Pattern::compile(src, self.backtrack_limit).map(Arc::new);
                e.insert(compiled.clone());
                compiled
            }
        }
    }

    /// Compile every pattern up front, in parallel.
    pub fn warm<'a>(&self, patterns: impl Iterator<Item = &'a str>) {
        let patterns: Vec<&str> = patterns.collect();
        patterns.par_iter().for_each(|src| {
            self.get(src);
        });
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        PatternCache::new(DEFAULT_BACKTRACK_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_engine_preferred() {
        let p = Pattern::compile(r"(?i)edg(?:e|ios|a)?\/([\w\.]+)", DEFAULT_BACKTRACK_LIMIT).unwrap();
        assert!(p.is_linear());
        let groups = p.captures("Chrome/132.0.0.0 Edg/132.0.0.0").unwrap();
        assert_eq!(groups[1], Some("132.0.0.0"));
    }

    #[test]
    fn lookaround_falls_back_to_backtracking() {
        let p = Pattern::compile(r"(?i)webkit\/537\.36.+chrome\/(?!27)([\w\.]+)", DEFAULT_BACKTRACK_LIMIT)
            .unwrap();
        assert!(!p.is_linear());
        assert!(p.captures("AppleWebKit/537.36 Chrome/27.0.1453").is_none());
        let groups = p.captures("AppleWebKit/537.36 Chrome/120.0.1").unwrap();
        assert_eq!(groups[1], Some("120.0.1"));
    }

    #[test]
    fn backreference_falls_back_to_backtracking() {
        let p = Pattern::compile(r"(?i)\b; (\w+) build\/hm\1", DEFAULT_BACKTRACK_LIMIT).unwrap();
        assert!(!p.is_linear());
        assert!(p.captures("Linux; U; 2014813 Build/HM2014813").is_some());
    }

    #[test]
    fn unmatched_group_is_none() {
        let p = Pattern::compile(r"(a)|(b)", DEFAULT_BACKTRACK_LIMIT).unwrap();
        assert_eq!(p.captures("b").unwrap(), vec![Some("b"), None, Some("b")]);
    }

    #[test]
    fn invalid_in_both_engines() {
        assert!(Pattern::compile(r"(unclosed", DEFAULT_BACKTRACK_LIMIT).is_none());
    }

    #[test]
    fn backtrack_limit_counts_as_no_match() {
        let p = Pattern::compile(r"(?i)(a|b|ab)*(?=c)", 10_000).unwrap();
        let subject = "ab".repeat(28);
        assert!(p.captures(&subject).is_none());
    }

    #[test]
    fn cache_compiles_once() {
        let cache = PatternCache::default();
        let a = cache.get(r"(?i)opr\/([\w\.]+)").unwrap();
        let b = cache.get(r"(?i)opr\/([\w\.]+)").unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        assert!(cache.get("(").is_none());
        assert!(cache.get("(").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_first_use() {
        let cache = PatternCache::default();
        let compiled: Vec<Arc<Pattern>> = (0..16)
            .into_par_iter()
            .map(|_| cache.get(r"(?i)(firefox)\/([\w\.]+)").unwrap())
            .collect();
        assert!(compiled.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }
}
