//! Alphabet equivalence class partitioning.
//!
//! Partitions the code-point space `[0, MAX_CHAR]` into equivalence classes:
//! maximal sets of code points that behave identically across all NFA
//! transitions. The DFA transition table then has one column per class
//! instead of one per code point.
//!
//! The partition is computed by a boundary sweep, not per-character
//! enumeration: only the distinct range endpoints used by transitions can
//! separate two code points, so the domain splits into at most
//! `2 × endpoints + 1` intervals and each interval is classified as a whole.

use crate::ast::{CodePoint, MAX_CHAR};

use super::{ClassId, Nfa, StateId};

/// Result of alphabet partitioning: a mapping from code point → class.
#[derive(Debug, Clone)]
pub struct AlphabetPartition {
    /// Sorted `(interval_start, class)` pairs covering the whole domain.
    /// Lookup is a binary search on the start.
    intervals: Vec<(CodePoint, ClassId)>,
    /// Number of distinct equivalence classes.
    pub num_classes: usize,
    /// Representative code point for each class.
    pub class_representatives: Vec<CodePoint>,
    /// Class of the top of the domain. Code points above `MAX_CHAR` fold
    /// into it, and when parts of the domain are covered by no transition
    /// at all, those parts share this uncovered "rest" behavior.
    pub rest_class: ClassId,
}

impl AlphabetPartition {
    /// Look up the equivalence class for a code point.
    pub fn classify(&self, cp: CodePoint) -> ClassId {
        if cp > MAX_CHAR {
            return self.rest_class;
        }
        let idx = match self.intervals.binary_search_by_key(&cp, |&(start, _)| start) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        self.intervals[idx].1
    }

    /// Iterate the `(interval_start, class)` pairs, in domain order.
    pub fn intervals(&self) -> &[(CodePoint, ClassId)] {
        &self.intervals
    }
}

/// Compute equivalence classes from an NFA.
///
/// Two code points are equivalent if and only if they trigger the same
/// transitions in every NFA state:
/// 1. Collect every distinct range endpoint used by any transition and form
///    maximal intervals between consecutive endpoints.
/// 2. Build a signature for each interval (the set of transitions active on
///    it) and group intervals with identical signatures.
pub fn compute_equivalence_classes(nfa: &Nfa) -> AlphabetPartition {
    /* Collect interval boundaries: each range [lo, hi] contributes lo and
     * hi+1. Ranges entirely above the domain contribute nothing. */
    let mut boundaries: Vec<CodePoint> = vec![0, MAX_CHAR + 1];
    for state in &nfa.states {
        for &(range, _) in &state.transitions {
            if range.lo > MAX_CHAR {
                continue;
            }
            boundaries.push(range.lo);
            boundaries.push(range.hi.min(MAX_CHAR) + 1);
        }
    }
    boundaries.sort_unstable();
    boundaries.dedup();

    /* Signature of an interval: the sorted (from, to) transition pairs
     * active on it. Testing the interval start suffices since no range
     * endpoint falls inside an interval. */
    type Signature = Vec<(StateId, StateId)>;

    let mut intervals: Vec<(CodePoint, ClassId)> = Vec::with_capacity(boundaries.len());
    let mut class_representatives: Vec<CodePoint> = Vec::new();
    let mut num_classes: usize = 0;

    /* Linear scan grouping: the class count stays small enough that a map
     * would cost more than it saves. */
    let mut sig_to_class: Vec<(Signature, ClassId)> = Vec::new();

    for window in boundaries.windows(2) {
        let start = window[0];

        let mut sig: Signature = Vec::new();
        for (from, state) in nfa.states.iter().enumerate() {
            for &(range, target) in &state.transitions {
                if range.contains(start) {
                    sig.push((from as StateId, target));
                }
            }
        }
        sig.sort_unstable();
        sig.dedup();

        let class = if let Some((_, existing)) = sig_to_class.iter().find(|(s, _)| s == &sig) {
            *existing
        } else {
            let new_class = num_classes as ClassId;
            num_classes += 1;
            sig_to_class.push((sig, new_class));
            class_representatives.push(start);
            new_class
        };
        intervals.push((start, class));
    }

    let rest_class = intervals.last().map(|&(_, class)| class).unwrap_or(0);

    AlphabetPartition {
        intervals,
        num_classes,
        class_representatives,
        rest_class,
    }
}
