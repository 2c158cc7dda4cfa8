//! Pattern AST and character-range algebra.
//!
//! Rules arrive from the host-side regex parser already shaped as
//! [`PatternNode`] trees; this module defines that tree and the inclusive
//! code-point ranges its character classes are built from. Classes support
//! set operators (union, intersection, difference, symmetric difference)
//! over nested operand classes, with inversion applied last; resolution
//! collapses the whole expression to a sorted, pairwise-disjoint range list.
//!
//! The code-point domain is `[0, MAX_CHAR]` (16-bit character model). Ranges
//! are inclusive on both ends.

// ══════════════════════════════════════════════════════════════════════════════
// Code points and ranges
// ══════════════════════════════════════════════════════════════════════════════

/// A scalar input symbol. Values above [`MAX_CHAR`] never appear in compiled
/// tables; the runtime folds them into the rest class.
pub type CodePoint = u32;

/// Upper bound of the mapped code-point domain, inclusive.
pub const MAX_CHAR: CodePoint = 0xFFFF;

/// Inclusive code-point range `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CharRange {
    pub lo: CodePoint,
    pub hi: CodePoint,
}

impl CharRange {
    pub fn new(lo: CodePoint, hi: CodePoint) -> Self {
        CharRange { lo, hi }
    }

    /// Range covering a single code point.
    pub fn single(cp: CodePoint) -> Self {
        CharRange { lo: cp, hi: cp }
    }

    pub fn contains(&self, cp: CodePoint) -> bool {
        self.lo <= cp && cp <= self.hi
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Character classes
// ══════════════════════════════════════════════════════════════════════════════

/// Set operator combining a class with operand classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassSetOp {
    Union,
    Intersection,
    Difference,
    SymmetricDifference,
}

/// A character class: base ranges, optionally combined with operand classes
/// under one set operator, optionally inverted over the full domain.
///
/// Inversion applies after the set operation. `[^]` is the empty range list
/// inverted, i.e. every code point in `[0, MAX_CHAR]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    /// Base ranges. May overlap on input; resolution normalizes them.
    pub ranges: Vec<CharRange>,
    /// Set operation over nested operands, applied left to right.
    pub op: Option<ClassOp>,
    /// Complement the result over `[0, MAX_CHAR]`.
    pub invert: bool,
}

/// One set operator applied to a sequence of operand classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassOp {
    pub kind: ClassSetOp,
    pub operands: Vec<CharClass>,
}

impl CharClass {
    /// Plain class over the given ranges.
    pub fn from_ranges(ranges: Vec<CharRange>) -> Self {
        CharClass { ranges, op: None, invert: false }
    }

    /// Inverted class: everything in the domain except the given ranges.
    pub fn inverted(ranges: Vec<CharRange>) -> Self {
        CharClass { ranges, op: None, invert: true }
    }

    /// The `[^]` class: every code point in the domain.
    pub fn any() -> Self {
        CharClass { ranges: Vec::new(), op: None, invert: true }
    }

    /// Resolve the class expression to sorted, pairwise-disjoint ranges.
    ///
    /// Operands are resolved recursively, folded into the base ranges under
    /// the class operator, then inversion (if set) complements the result
    /// over `[0, MAX_CHAR]`. The output is empty iff the class matches no
    /// code point at all.
    pub fn resolve(&self) -> Vec<CharRange> {
        let mut result = sort_and_merge_ranges(&self.ranges);

        if let Some(op) = &self.op {
            for operand in &op.operands {
                let rhs = operand.resolve();
                result = match op.kind {
                    ClassSetOp::Union => union_ranges(&result, &rhs),
                    ClassSetOp::Intersection => intersect_ranges(&result, &rhs),
                    ClassSetOp::Difference => difference_ranges(&result, &rhs),
                    ClassSetOp::SymmetricDifference => {
                        symmetric_difference_ranges(&result, &rhs)
                    },
                };
            }
        }

        if self.invert {
            result = complement_ranges(&result);
        }
        result
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Pattern nodes
// ══════════════════════════════════════════════════════════════════════════════

/// One node of a rule's pattern tree.
///
/// The set of node kinds is closed; every pipeline stage matches on it
/// exhaustively. `MacroRef` nodes exist only before macro expansion; the
/// NFA builder never sees one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternNode {
    /// Match any one branch.
    Alternation(Vec<PatternNode>),
    /// Match all parts in sequence.
    Concatenation(Vec<PatternNode>),
    /// Match `node` between `min` and `max` times; `max = None` is unbounded.
    /// `(0, Some(1))` is optional, `(0, None)` star, `(1, None)` plus.
    Quantified {
        node: Box<PatternNode>,
        min: u32,
        max: Option<u32>,
    },
    /// Match one code point from a character class.
    Class(CharClass),
    /// Match an exact code-point sequence.
    Literal(Vec<CodePoint>),
    /// Reference to a named sub-pattern, inlined by the macro expander.
    MacroRef(String),
    /// Trailing context: match `before` followed by `after`, consuming only
    /// up to the end of `before`.
    Lookaround {
        before: Box<PatternNode>,
        after: Box<PatternNode>,
    },
}

impl PatternNode {
    /// Literal pattern from a string (one code point per char).
    pub fn literal(text: &str) -> Self {
        PatternNode::Literal(text.chars().map(|c| c as CodePoint).collect())
    }

    /// Class pattern over the given ranges.
    pub fn class(ranges: Vec<CharRange>) -> Self {
        PatternNode::Class(CharClass::from_ranges(ranges))
    }

    /// Whether the pattern can match the empty string.
    ///
    /// For a `Lookaround`, the token text is `before`'s match, so the node
    /// matches empty iff `before` does. `MacroRef` is reported non-empty;
    /// callers check expanded trees.
    pub fn matches_empty(&self) -> bool {
        match self {
            PatternNode::Alternation(branches) => {
                branches.iter().any(PatternNode::matches_empty)
            },
            PatternNode::Concatenation(parts) => {
                parts.iter().all(PatternNode::matches_empty)
            },
            PatternNode::Quantified { node, min, .. } => {
                *min == 0 || node.matches_empty()
            },
            PatternNode::Class(_) => false,
            PatternNode::Literal(seq) => seq.is_empty(),
            PatternNode::MacroRef(_) => false,
            PatternNode::Lookaround { before, .. } => before.matches_empty(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Range algebra
// ══════════════════════════════════════════════════════════════════════════════

/// Sort ranges by start, then merge overlapping/adjacent ranges.
pub fn sort_and_merge_ranges(ranges: &[CharRange]) -> Vec<CharRange> {
    if ranges.is_empty() {
        return Vec::new();
    }
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| r.lo);

    let mut merged: Vec<CharRange> = Vec::with_capacity(sorted.len());
    let mut cur = sorted[0];

    for &r in &sorted[1..] {
        if r.lo <= cur.hi.saturating_add(1) {
            cur.hi = cur.hi.max(r.hi);
        } else {
            merged.push(cur);
            cur = r;
        }
    }
    merged.push(cur);
    merged
}

/// Compute the complement of a set of ranges over `[0, MAX_CHAR]`.
pub fn complement_ranges(ranges: &[CharRange]) -> Vec<CharRange> {
    let merged = sort_and_merge_ranges(ranges);
    let mut complement: Vec<CharRange> = Vec::with_capacity(merged.len() + 1);
    let mut lo: CodePoint = 0;
    for r in &merged {
        if r.lo > lo {
            complement.push(CharRange::new(lo, r.lo - 1));
        }
        if r.hi >= MAX_CHAR {
            return complement;
        }
        lo = r.hi + 1;
    }
    complement.push(CharRange::new(lo, MAX_CHAR));
    complement
}

/// Union of two range sets.
pub fn union_ranges(a: &[CharRange], b: &[CharRange]) -> Vec<CharRange> {
    let mut all = a.to_vec();
    all.extend_from_slice(b);
    sort_and_merge_ranges(&all)
}

/// Intersection of two range sets, by linear merge over sorted inputs.
pub fn intersect_ranges(a: &[CharRange], b: &[CharRange]) -> Vec<CharRange> {
    let a = sort_and_merge_ranges(a);
    let b = sort_and_merge_ranges(b);
    let mut result: Vec<CharRange> = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);

    while i < a.len() && j < b.len() {
        let lo = a[i].lo.max(b[j].lo);
        let hi = a[i].hi.min(b[j].hi);
        if lo <= hi {
            result.push(CharRange::new(lo, hi));
        }
        /* Advance whichever range ends first */
        if a[i].hi < b[j].hi {
            i += 1;
        } else {
            j += 1;
        }
    }
    result
}

/// Ranges in `a` but not in `b`.
pub fn difference_ranges(a: &[CharRange], b: &[CharRange]) -> Vec<CharRange> {
    intersect_ranges(a, &complement_ranges(b))
}

/// Ranges in exactly one of `a`, `b`.
pub fn symmetric_difference_ranges(a: &[CharRange], b: &[CharRange]) -> Vec<CharRange> {
    union_ranges(&difference_ranges(a, b), &difference_ranges(b, a))
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════════════════════
