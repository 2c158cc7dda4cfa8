//! Macro expansion: inlines named sub-patterns into rule ASTs.
//!
//! Macros expand in dependency order with memoization; each definition is
//! expanded once and substitution afterwards is a deep copy of the expanded
//! body. A macro that references itself, directly or transitively, is
//! rejected rather than looped on; macros outside the cycle still expand,
//! so one bad definition poisons only the rules that use it.
//!
//! Output trees are fully macro-free.

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::PatternNode;

/// Failure while expanding a macro reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    /// The named macro participates in a reference cycle.
    CyclicMacro(String),
    /// The named macro has no definition.
    UnknownMacro(String),
}

impl ExpandError {
    /// Name of the macro the error is about.
    pub fn macro_name(&self) -> &str {
        match self {
            ExpandError::CyclicMacro(name) => name,
            ExpandError::UnknownMacro(name) => name,
        }
    }
}

impl std::fmt::Display for ExpandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpandError::CyclicMacro(name) => {
                write!(f, "macro '{}' expands to itself (reference cycle)", name)
            },
            ExpandError::UnknownMacro(name) => {
                write!(f, "reference to undefined macro '{}'", name)
            },
        }
    }
}

impl std::error::Error for ExpandError {}

/// All macro definitions, expanded. Definitions that failed to expand are
/// kept with their error so rules referencing them report the root cause.
#[derive(Debug, Clone)]
pub struct MacroTable {
    expanded: BTreeMap<String, PatternNode>,
    failed: BTreeMap<String, ExpandError>,
}

impl MacroTable {
    /// Expand every definition. Never fails wholesale: cyclic or otherwise
    /// broken definitions are recorded and reported when referenced.
    pub fn build(defs: &BTreeMap<String, PatternNode>) -> Self {
        let mut expander = Expander {
            defs,
            expanded: BTreeMap::new(),
            failed: BTreeMap::new(),
            in_progress: BTreeSet::new(),
        };
        for name in defs.keys() {
            /* Result is recorded inside the expander either way */
            let _ = expander.expand_def(name);
        }
        MacroTable { expanded: expander.expanded, failed: expander.failed }
    }

    /// Replace every `MacroRef` in `pattern` with a deep copy of the named
    /// macro's expanded body.
    pub fn expand(&self, pattern: &PatternNode) -> Result<PatternNode, ExpandError> {
        match pattern {
            PatternNode::MacroRef(name) => {
                if let Some(body) = self.expanded.get(name) {
                    return Ok(body.clone());
                }
                if let Some(err) = self.failed.get(name) {
                    return Err(err.clone());
                }
                Err(ExpandError::UnknownMacro(name.clone()))
            },
            PatternNode::Alternation(branches) => Ok(PatternNode::Alternation(
                branches.iter().map(|b| self.expand(b)).collect::<Result<_, _>>()?,
            )),
            PatternNode::Concatenation(parts) => Ok(PatternNode::Concatenation(
                parts.iter().map(|p| self.expand(p)).collect::<Result<_, _>>()?,
            )),
            PatternNode::Quantified { node, min, max } => Ok(PatternNode::Quantified {
                node: Box::new(self.expand(node)?),
                min: *min,
                max: *max,
            }),
            PatternNode::Lookaround { before, after } => Ok(PatternNode::Lookaround {
                before: Box::new(self.expand(before)?),
                after: Box::new(self.expand(after)?),
            }),
            PatternNode::Class(_) | PatternNode::Literal(_) => Ok(pattern.clone()),
        }
    }
}

/// Working state for definition expansion.
struct Expander<'a> {
    defs: &'a BTreeMap<String, PatternNode>,
    expanded: BTreeMap<String, PatternNode>,
    failed: BTreeMap<String, ExpandError>,
    /// Names on the current expansion path; re-entering one is a cycle.
    in_progress: BTreeSet<String>,
}

impl Expander<'_> {
    fn expand_def(&mut self, name: &str) -> Result<(), ExpandError> {
        if self.expanded.contains_key(name) {
            return Ok(());
        }
        if let Some(err) = self.failed.get(name) {
            return Err(err.clone());
        }
        if self.in_progress.contains(name) {
            let err = ExpandError::CyclicMacro(name.to_string());
            self.failed.insert(name.to_string(), err.clone());
            return Err(err);
        }

        let def = match self.defs.get(name) {
            Some(def) => def.clone(),
            None => {
                let err = ExpandError::UnknownMacro(name.to_string());
                self.failed.insert(name.to_string(), err.clone());
                return Err(err);
            },
        };

        self.in_progress.insert(name.to_string());
        let result = self.substitute(&def);
        self.in_progress.remove(name);

        match result {
            Ok(body) => {
                self.expanded.insert(name.to_string(), body);
                Ok(())
            },
            Err(err) => {
                self.failed.insert(name.to_string(), err.clone());
                Err(err)
            },
        }
    }

    fn substitute(&mut self, node: &PatternNode) -> Result<PatternNode, ExpandError> {
        match node {
            PatternNode::MacroRef(name) => {
                self.expand_def(name)?;
                Ok(self.expanded[name].clone())
            },
            PatternNode::Alternation(branches) => Ok(PatternNode::Alternation(
                branches.iter().map(|b| self.substitute(b)).collect::<Result<_, _>>()?,
            )),
            PatternNode::Concatenation(parts) => Ok(PatternNode::Concatenation(
                parts.iter().map(|p| self.substitute(p)).collect::<Result<_, _>>()?,
            )),
            PatternNode::Quantified { node, min, max } => Ok(PatternNode::Quantified {
                node: Box::new(self.substitute(node)?),
                min: *min,
                max: *max,
            }),
            PatternNode::Lookaround { before, after } => Ok(PatternNode::Lookaround {
                before: Box::new(self.substitute(before)?),
                after: Box::new(self.substitute(after)?),
            }),
            PatternNode::Class(_) | PatternNode::Literal(_) => Ok(node.clone()),
        }
    }
}
