//! 64-bit Bloom summaries of term sets
//!
//! A `BloomSet` over-approximates a small set of terms in one machine word.
//! Overlap and subset tests are sound prefilters: a negative answer is
//! exact, a positive answer may be spurious.

use super::term::Term;
use serde::{Deserialize, Serialize};

/// Bloom summary of a term set
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomSet {
    mask: u64,
}

// Four 6-bit probes out of a splitmix64-mixed id.
fn mix(id: u32) -> u64 {
    let mut z = (id as u64).wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn probes(t: Term) -> u64 {
    let h = mix(t.id());
    let mut mask = 0u64;
    for i in 0..4 {
        mask |= 1 << ((h >> (6 * i)) & 0x3f);
    }
    mask
}

impl BloomSet {
    pub fn new() -> Self {
        BloomSet::default()
    }

    pub fn add(&mut self, t: Term) {
        self.mask |= probes(t);
    }

    pub fn union(&mut self, other: BloomSet) {
        self.mask |= other.mask;
    }

    pub fn clear(&mut self) {
        self.mask = 0;
    }

    /// May `t` be in the summarized set?
    pub fn possibly_contains(self, t: Term) -> bool {
        let p = probes(t);
        self.mask & p == p
    }

    /// May the two summarized sets share an element?
    pub fn possibly_overlaps(self, other: BloomSet) -> bool {
        self.mask & other.mask != 0
    }

    /// May the summarized set be a subset of `other`'s?
    pub fn possibly_subset_of(self, other: BloomSet) -> bool {
        self.mask & !other.mask == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::term::{SymbolFactory, TermFactory};

    #[test]
    fn test_contains_and_overlap() {
        let mut sf = SymbolFactory::new();
        let mut tf = TermFactory::new();
        let sort = sf.new_sort();
        let a = tf.name(sf.new_name(sort));
        let b = tf.name(sf.new_name(sort));

        let mut s = BloomSet::new();
        s.add(a);
        assert!(s.possibly_contains(a));

        let mut t = BloomSet::new();
        t.add(a);
        t.add(b);
        assert!(s.possibly_subset_of(t));
        assert!(s.possibly_overlaps(t));
        assert!(!BloomSet::new().possibly_overlaps(t));
    }

    #[test]
    fn test_empty_is_subset() {
        let mut sf = SymbolFactory::new();
        let mut tf = TermFactory::new();
        let sort = sf.new_sort();
        let a = tf.name(sf.new_name(sort));

        let mut s = BloomSet::new();
        s.add(a);
        assert!(BloomSet::new().possibly_subset_of(s));
        assert!(BloomSet::new().possibly_subset_of(BloomSet::new()));
    }
}
