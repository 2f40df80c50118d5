// src/domain/dedup.rs

use crate::domain::listing::Listing;
use std::collections::HashSet;

/// How long a `DedupIndex` lives relative to the postal codes of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupScope {
    /// One index shared by every postal code of the run.
    Run,
    /// A fresh index for each postal code.
    PerPostalCode,
}

/// Collapse runs of whitespace to a single space and trim the ends.
/// Case and punctuation are left alone.
pub fn normalize_address(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Append-only set of normalized addresses.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the listing's address and returns true if it is new to this
    /// index. Listings without a usable address are never admitted.
    pub fn admit(&mut self, listing: &Listing) -> bool {
        let key = normalize_address(&listing.address);
        !key.is_empty() && self.seen.insert(key)
    }

    /// Keep only the listings this index has not seen, preserving input order.
    pub fn filter(&mut self, listings: impl IntoIterator<Item = Listing>) -> Vec<Listing> {
        listings.into_iter().filter(|l| self.admit(l)).collect()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}
