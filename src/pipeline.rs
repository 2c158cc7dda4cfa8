//! Scanner compilation pipeline.
//!
//! Orchestrates the full path from a rule specification to encoded tables:
//! 1. Expand macro references and validate pattern structure
//! 2. Check condition declarations, action id range, and action-type
//!    consistency
//! 3. Per start condition: build NFA, compute equivalence classes,
//!    determinize, minimize
//! 4. Enforce the global state ceiling
//! 5. Encode each condition's tables
//!
//! Diagnostics are collected, not fail-fast: one run reports every problem
//! that can be determined independently. A start condition containing an
//! errored rule is skipped entirely; healthy conditions still compile and
//! encode. The capacity ceiling is the one whole-compilation abort.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::ast::{CharClass, PatternNode};
use crate::automata::minimize::minimize_dfa;
use crate::automata::nfa::{build_nfa, RulePattern};
use crate::automata::partition::{compute_equivalence_classes, AlphabetPartition};
use crate::automata::subset::subset_construction;
use crate::automata::{Dfa, Priority};
use crate::diagnostics::{has_errors, Diagnostic, DiagnosticCode};
use crate::expand::{ExpandError, MacroTable};
use crate::tables::{encode_automaton, CompiledScanner, ScannerStats, ACTION_LIMIT, STATE_LIMIT};
use crate::{ActionId, ConditionSet, ScannerSpec, INITIAL_CONDITION};

/// Result of one compilation run.
pub struct ScannerOutput {
    /// Encoded tables for every condition that compiled cleanly. `None`
    /// when nothing could be encoded (all conditions errored, or the state
    /// ceiling was hit). May be present alongside error diagnostics when
    /// only some conditions failed.
    pub scanner: Option<CompiledScanner>,
    /// Everything wrong (errors) or suspicious (warnings), in detection
    /// order.
    pub diagnostics: Vec<Diagnostic>,
    /// Aggregate sizes over the conditions that compiled.
    pub stats: ScannerStats,
}

impl ScannerOutput {
    /// Whether any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

/// Compile a scanner specification into encoded tables plus diagnostics.
pub fn compile(spec: &ScannerSpec) -> ScannerOutput {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    // Declared start conditions, first occurrence wins; an empty
    // declaration list gets the implicit initial condition.
    let conditions: Vec<String> = if spec.conditions.is_empty() {
        vec![INITIAL_CONDITION.to_string()]
    } else {
        let mut seen = BTreeSet::new();
        spec.conditions
            .iter()
            .filter(|c| seen.insert(c.as_str()))
            .cloned()
            .collect()
    };

    // Step 1: Expand and validate each rule independently
    let macro_table = MacroTable::build(&spec.macros);
    let mut expanded: Vec<Option<PatternNode>> = Vec::with_capacity(spec.rules.len());
    let mut rule_failed: Vec<bool> = vec![false; spec.rules.len()];

    for (index, rule) in spec.rules.iter().enumerate() {
        match macro_table.expand(&rule.pattern) {
            Ok(pattern) => {
                if let Err(message) = validate_pattern(&pattern) {
                    diagnostics.push(
                        Diagnostic::error(DiagnosticCode::InvalidExpression, message)
                            .with_rule(index),
                    );
                    rule_failed[index] = true;
                    expanded.push(None);
                    continue;
                }
                if pattern.matches_empty() {
                    diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticCode::EmptyMatch,
                            "rule can match the empty string",
                        )
                        .with_rule(index),
                    );
                }
                expanded.push(Some(pattern));
            },
            Err(err) => {
                let code = match err {
                    ExpandError::CyclicMacro(_) => DiagnosticCode::CyclicMacro,
                    ExpandError::UnknownMacro(_) => DiagnosticCode::UnknownMacro,
                };
                diagnostics.push(Diagnostic::error(code, err.to_string()).with_rule(index));
                rule_failed[index] = true;
                expanded.push(None);
            },
        }
    }

    // Step 2a: Rules must name declared conditions
    for (index, rule) in spec.rules.iter().enumerate() {
        if let ConditionSet::Named(names) = &rule.conditions {
            for name in names {
                if !conditions.iter().any(|c| c == name) {
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::UndeclaredCondition,
                            format!("start condition '{}' is not declared", name),
                        )
                        .with_rule(index)
                        .with_condition(name.clone()),
                    );
                    rule_failed[index] = true;
                }
            }
        }
    }

    // Step 2b: Action ids fit the 16-bit packed tables; larger ids would
    // silently truncate at encode time.
    for (index, rule) in spec.rules.iter().enumerate() {
        if rule.action > ACTION_LIMIT {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::InvalidAction,
                    format!(
                        "action id {} exceeds the table limit of {}",
                        rule.action, ACTION_LIMIT
                    ),
                )
                .with_rule(index),
            );
            rule_failed[index] = true;
        }
    }

    // Step 2c: Rules sharing an ActionId dispatch to one handler, so their
    // declared types must agree.
    let mut action_types: BTreeMap<ActionId, (usize, &str)> = BTreeMap::new();
    for (index, rule) in spec.rules.iter().enumerate() {
        let Some(declared) = rule.action_type.as_deref() else {
            continue;
        };
        match action_types.get(&rule.action) {
            None => {
                action_types.insert(rule.action, (index, declared));
            },
            Some(&(first_index, first_type)) => {
                if first_type != declared {
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::AmbiguousAction,
                            format!(
                                "action {} returns '{}' in rule {} but '{}' here",
                                rule.action, first_type, first_index, declared
                            ),
                        )
                        .with_rule(index),
                    );
                    rule_failed[index] = true;
                    rule_failed[first_index] = true;
                }
            },
        }
    }

    // An errored rule aborts every condition it belongs to; the other
    // conditions keep compiling.
    let mut poisoned: BTreeSet<&str> = BTreeSet::new();
    for (index, rule) in spec.rules.iter().enumerate() {
        if !rule_failed[index] {
            continue;
        }
        match &rule.conditions {
            ConditionSet::All => {
                poisoned.extend(conditions.iter().map(String::as_str));
            },
            ConditionSet::Named(names) => {
                for name in names {
                    if let Some(declared) = conditions.iter().find(|c| *c == name) {
                        poisoned.insert(declared.as_str());
                    }
                }
            },
        }
    }

    // Step 3: Compile the healthy conditions, in declaration order
    let assignments: Vec<(&str, Vec<RulePattern>)> = conditions
        .iter()
        .filter(|c| !poisoned.contains(c.as_str()))
        .map(|condition| {
            let rules: Vec<RulePattern> = spec
                .rules
                .iter()
                .enumerate()
                .filter(|(index, rule)| {
                    !rule_failed[*index] && rule.conditions.contains(condition)
                })
                .filter_map(|(index, rule)| {
                    expanded[index].as_ref().map(|pattern| RulePattern {
                        priority: index as Priority,
                        action: rule.action,
                        pattern: pattern.clone(),
                    })
                })
                .collect();
            (condition.as_str(), rules)
        })
        .collect();

    let builds: Vec<ConditionBuild> = assignments
        .par_iter()
        .map(|(condition, rules)| compile_condition(condition, rules))
        .collect();

    for build in &builds {
        diagnostics.extend(build.warnings.iter().cloned());
    }

    let stats = ScannerStats {
        rule_count: spec.rules.len(),
        condition_count: conditions.len(),
        nfa_states: builds.iter().map(|b| b.nfa_states).sum(),
        dfa_states: builds.iter().map(|b| b.dfa_states).sum(),
        min_dfa_states: builds.iter().map(|b| b.min_dfa.states.len()).sum(),
        alphabet_size: builds.iter().map(|b| b.partition.num_classes).max().unwrap_or(0),
    };
    log::debug!(
        "compiled {} of {} conditions: {} NFA states, {} DFA states, {} after minimization",
        builds.len(),
        conditions.len(),
        stats.nfa_states,
        stats.dfa_states,
        stats.min_dfa_states
    );

    // Step 4: Global ceiling across all conditions; table indices cannot
    // reach past it, so nothing is encoded when it overflows.
    if stats.min_dfa_states > STATE_LIMIT {
        diagnostics.push(Diagnostic::error(
            DiagnosticCode::TooManyStates,
            format!(
                "{} DFA states after minimization exceed the table limit of {}",
                stats.min_dfa_states, STATE_LIMIT
            ),
        ));
        return ScannerOutput { scanner: None, diagnostics, stats };
    }

    // Step 5: Encode
    let automata: Vec<_> = builds
        .iter()
        .map(|b| encode_automaton(&b.condition, &b.min_dfa, &b.partition))
        .collect();

    let scanner = if automata.is_empty() {
        None
    } else {
        Some(CompiledScanner { name: spec.name.clone(), automata, stats: stats.clone() })
    };

    ScannerOutput { scanner, diagnostics, stats }
}

/// Intermediate result of compiling one start condition.
struct ConditionBuild {
    condition: String,
    nfa_states: usize,
    dfa_states: usize,
    min_dfa: Dfa,
    partition: AlphabetPartition,
    warnings: Vec<Diagnostic>,
}

fn compile_condition(condition: &str, rules: &[RulePattern]) -> ConditionBuild {
    let nfa = build_nfa(rules);
    let partition = compute_equivalence_classes(&nfa);
    let dfa = subset_construction(&nfa, &partition);

    // Shadow detection runs on the pre-minimization DFA: a rule whose
    // priority wins no accepting state can never produce a token.
    let winners: BTreeSet<Priority> =
        dfa.states.iter().filter_map(|s| s.accept.map(|t| t.priority)).collect();
    let warnings: Vec<Diagnostic> = rules
        .iter()
        .filter(|rule| !winners.contains(&rule.priority))
        .map(|rule| {
            Diagnostic::warning(DiagnosticCode::UnmatchableRule, "rule can never be matched")
                .with_rule(rule.priority as usize)
                .with_condition(condition)
        })
        .collect();

    let min_dfa = minimize_dfa(&dfa);
    log::debug!(
        "condition '{}': {} rules, {} NFA states, {} DFA states, {} minimized, {} classes",
        condition,
        rules.len(),
        nfa.states.len(),
        dfa.states.len(),
        min_dfa.states.len(),
        partition.num_classes
    );

    ConditionBuild {
        condition: condition.to_string(),
        nfa_states: nfa.states.len(),
        dfa_states: dfa.states.len(),
        min_dfa,
        partition,
        warnings,
    }
}

/// Reject pattern structure the automata passes cannot represent.
fn validate_pattern(pattern: &PatternNode) -> Result<(), String> {
    match pattern {
        PatternNode::Alternation(nodes) | PatternNode::Concatenation(nodes) => {
            for node in nodes {
                validate_pattern(node)?;
            }
            Ok(())
        },
        PatternNode::Quantified { node, min, max } => {
            if let Some(max) = max {
                if min > max {
                    return Err(format!(
                        "quantifier lower bound {} exceeds upper bound {}",
                        min, max
                    ));
                }
            }
            validate_pattern(node)
        },
        PatternNode::Class(class) => validate_class(class),
        PatternNode::Lookaround { before, after } => {
            validate_pattern(before)?;
            validate_pattern(after)
        },
        PatternNode::Literal(_) | PatternNode::MacroRef(_) => Ok(()),
    }
}

fn validate_class(class: &CharClass) -> Result<(), String> {
    for range in &class.ranges {
        if range.lo > range.hi {
            return Err(format!(
                "character range U+{:04X}-U+{:04X} is reversed",
                range.lo, range.hi
            ));
        }
    }
    if let Some(op) = &class.op {
        for operand in &op.operands {
            validate_class(operand)?;
        }
    }
    Ok(())
}
