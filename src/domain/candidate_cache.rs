//! Candidate Cache
//!
//! Remembers every mint address seen during the process lifetime so that a
//! mint is enriched at most once. Entries never expire.

use std::collections::HashSet;
use std::sync::Mutex;

/// Process-lifetime set of seen mint addresses
#[derive(Debug, Default)]
pub struct CandidateCache {
    seen: Mutex<HashSet<String>>,
}

impl CandidateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a mint as seen.
    ///
    /// Returns `true` only for the first caller with this mint; the check and
    /// the insert happen under one lock so exactly one worker wins.
    pub fn mark_seen(&self, mint: &str) -> bool {
        match self.seen.lock() {
            Ok(mut seen) => seen.insert(mint.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(mint.to_string()),
        }
    }

    /// Check if a mint was already seen
    pub fn contains(&self, mint: &str) -> bool {
        match self.seen.lock() {
            Ok(seen) => seen.contains(mint),
            Err(poisoned) => poisoned.into_inner().contains(mint),
        }
    }

    pub fn len(&self) -> usize {
        match self.seen.lock() {
            Ok(seen) => seen.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_mark_wins() {
        let cache = CandidateCache::new();
        assert!(cache.is_empty());

        assert!(cache.mark_seen("MintA"));
        assert!(!cache.mark_seen("MintA"));
        assert!(cache.mark_seen("MintB"));

        assert!(cache.contains("MintA"));
        assert!(!cache.contains("MintC"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_single_winner_across_threads() {
        let cache = Arc::new(CandidateCache::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.mark_seen("ContestedMint"))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(cache.len(), 1);
    }
}
