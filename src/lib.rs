//! # lextab: Table-Driven Scanner Generator Core
//!
//! lextab compiles lexical rule sets (pattern ASTs paired with actions) into
//! compact run-length-encoded DFA tables, and provides the **maximal-munch
//! runtime** that drives those tables over input text:
//!
//! - Classical automata pipeline: Thompson NFA → alphabet partitioning →
//!   subset construction → Hopcroft-style minimization
//! - Ambiguity resolved by declaration order (earliest rule wins ties)
//! - Trailing context (lookaround) via boundary tags carried through
//!   determinization, one DFA per start condition
//! - Start conditions compile independently and in parallel via rayon
//!
//! ## Architecture
//!
//! ```text
//! ScannerSpec (rules + macros + conditions)
//!        │
//!        ▼
//!  ┌──────────────────────────────────────────┐
//!  │              lextab crate                │
//!  │                                          │
//!  │  1. Macro expansion:                     │
//!  │     MacroRef inlining, cycle detection   │
//!  │                                          │
//!  │  2. Automata pipeline (per condition):   │
//!  │     Patterns → NFA → Symbol classes      │
//!  │     → DFA (subset) → Minimize            │
//!  │                                          │
//!  │  3. Table encoding:                      │
//!  │     CharacterMap / TransitionTable /     │
//!  │     ActionMap → RLE + width selection    │
//!  └──────────────────────────────────────────┘
//!        │
//!        ▼
//!  CompiledScanner (encoded tables + metadata)
//!        │
//!        ▼
//!  Scanner (maximal-munch matching runtime)
//! ```

pub mod ast;
pub mod automata;
pub mod diagnostics;
pub mod expand;
pub mod pipeline;
pub mod scanner;
pub mod tables;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use ast::PatternNode;
use pipeline::ScannerOutput;

/// Identifier of the action bound to a rule. Opaque to the core: the caller
/// maps it back to whatever code block or token constructor it stands for.
/// Action ids are packed into 16-bit table entries with a `+1` bias, so they
/// must stay below `0xFFFF`.
pub type ActionId = u32;

/// Name of the implicit start condition used when a specification declares
/// none.
pub const INITIAL_CONDITION: &str = "YYINITIAL";

/// Scanner definition input for the table compiler.
///
/// This is the in-memory boundary with the external rule collector: patterns
/// arrive already parsed into [`PatternNode`] trees, syntax-checked but not
/// yet macro-expanded or range-normalized.
#[derive(Debug, Clone)]
pub struct ScannerSpec {
    /// Scanner name (used in persisted table metadata).
    pub name: String,
    /// Declared start-condition names, in declaration order.
    /// Every scanner has at least one condition.
    pub conditions: Vec<String>,
    /// Named sub-patterns available to rules via `PatternNode::MacroRef`.
    pub macros: BTreeMap<String, PatternNode>,
    /// All rules, in declaration order. A rule's priority is its index here;
    /// lower index wins ties among equal-length matches.
    pub rules: Vec<Rule>,
}

/// A single lexical rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// The pattern to match.
    pub pattern: PatternNode,
    /// Start conditions in which this rule is active.
    pub conditions: ConditionSet,
    /// Action to dispatch when this rule produces the match.
    pub action: ActionId,
    /// Declared result type of the action, if the host language declares one.
    /// Rules sharing an `ActionId` must agree on this.
    pub action_type: Option<String>,
}

/// Which start conditions a rule participates in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionSet {
    /// Active in every declared condition.
    All,
    /// Active only in the named conditions.
    Named(Vec<String>),
}

impl ConditionSet {
    /// Whether a rule with this set is active in `condition`.
    pub fn contains(&self, condition: &str) -> bool {
        match self {
            ConditionSet::All => true,
            ConditionSet::Named(names) => names.iter().any(|n| n == condition),
        }
    }
}

/// Compile a scanner specification into per-condition DFA tables.
///
/// This is the main entry point. The output carries:
/// - the compiled scanner (encoded tables + metadata per start condition),
///   absent when errors prevented encoding,
/// - all collected diagnostics (errors and warnings),
/// - aggregate pipeline statistics.
///
/// Compilation never reads files and never prints; diagnostics are returned
/// for the caller to render.
#[inline]
pub fn compile(spec: &ScannerSpec) -> ScannerOutput {
    pipeline::compile(spec)
}
