//! Scanner specification builders and precomputed intermediates for benchmarks.
//!
//! Provides scanner specifications of varying complexity, plus a
//! `PreparedSpec` struct that precomputes each stage's input by replicating
//! the pipeline from `compile()`.

// Each benchmark file compiles this module independently and uses different subsets,
// so dead_code warnings are expected and harmless.
#![allow(dead_code)]

use std::collections::BTreeMap;

use lextab::ast::{CharClass, CharRange, PatternNode};
use lextab::automata::minimize::minimize_dfa;
use lextab::automata::nfa::{build_nfa, RulePattern};
use lextab::automata::partition::{compute_equivalence_classes, AlphabetPartition};
use lextab::automata::subset::subset_construction;
use lextab::automata::{Dfa, Nfa, Priority};
use lextab::expand::MacroTable;
use lextab::{ActionId, ConditionSet, Rule, ScannerSpec, INITIAL_CONDITION};

// ══════════════════════════════════════════════════════════════════════════════
// Pattern builder helpers
// ══════════════════════════════════════════════════════════════════════════════

fn span(lo: char, hi: char) -> CharRange {
    CharRange::new(lo as u32, hi as u32)
}

fn single(c: char) -> CharRange {
    CharRange::single(c as u32)
}

fn plus(node: PatternNode) -> PatternNode {
    PatternNode::Quantified { node: Box::new(node), min: 1, max: None }
}

fn star(node: PatternNode) -> PatternNode {
    PatternNode::Quantified { node: Box::new(node), min: 0, max: None }
}

fn opt(node: PatternNode) -> PatternNode {
    PatternNode::Quantified { node: Box::new(node), min: 0, max: Some(1) }
}

fn rule(pattern: PatternNode, action: ActionId) -> Rule {
    Rule { pattern, conditions: ConditionSet::All, action, action_type: None }
}

fn in_condition(pattern: PatternNode, action: ActionId, condition: &str) -> Rule {
    Rule {
        pattern,
        conditions: ConditionSet::Named(vec![condition.to_string()]),
        action,
        action_type: None,
    }
}

fn whitespace() -> PatternNode {
    plus(PatternNode::Class(CharClass::from_ranges(vec![
        single(' '),
        single('\t'),
        single('\n'),
        single('\r'),
    ])))
}

fn ident() -> PatternNode {
    let head = PatternNode::class(vec![span('a', 'z'), span('A', 'Z'), single('_')]);
    let tail = PatternNode::class(vec![span('a', 'z'), span('A', 'Z'), span('0', '9'), single('_')]);
    PatternNode::Concatenation(vec![head, star(tail)])
}

// ══════════════════════════════════════════════════════════════════════════════
// Specs
// ══════════════════════════════════════════════════════════════════════════════

/// Four rules: numbers, words, whitespace, and a catch-all.
pub fn minimal_spec() -> ScannerSpec {
    let digits = plus(PatternNode::class(vec![span('0', '9')]));
    let letters = plus(PatternNode::class(vec![span('a', 'z'), span('A', 'Z')]));
    let any = PatternNode::Class(CharClass::any());

    ScannerSpec {
        name: "Tokens".to_string(),
        conditions: Vec::new(),
        macros: BTreeMap::new(),
        rules: vec![rule(digits, 0), rule(letters, 1), rule(whitespace(), 2), rule(any, 3)],
    }
}

/// A small expression language: keywords, identifiers, numbers, operators,
/// delimiters, line comments, whitespace.
pub fn small_spec() -> ScannerSpec {
    let digits = plus(PatternNode::class(vec![span('0', '9')]));
    let float = PatternNode::Concatenation(vec![
        digits.clone(),
        PatternNode::literal("."),
        digits.clone(),
    ]);
    let comment = PatternNode::Concatenation(vec![
        PatternNode::literal("//"),
        star(PatternNode::Class(CharClass::inverted(vec![single('\n')]))),
    ]);

    let mut rules = Vec::new();
    let mut action: ActionId = 0;
    for keyword in ["if", "else", "while", "return"] {
        rules.push(rule(PatternNode::literal(keyword), action));
        action += 1;
    }
    rules.push(rule(ident(), action));
    action += 1;
    rules.push(rule(float, action));
    action += 1;
    rules.push(rule(digits, action));
    action += 1;
    for op in [
        "==", "!=", "<=", ">=", "<", ">", "=", "+", "-", "*", "/", "(", ")", "{", "}", ",", ";",
    ] {
        rules.push(rule(PatternNode::literal(op), action));
        action += 1;
    }
    rules.push(rule(comment, action));
    action += 1;
    rules.push(rule(whitespace(), action));

    ScannerSpec {
        name: "Calculator".to_string(),
        conditions: Vec::new(),
        macros: BTreeMap::new(),
        rules,
    }
}

/// Two start conditions with macros and a trailing-context rule: the default
/// condition lexes a scripting language, the second lexes string bodies.
pub fn medium_spec() -> ScannerSpec {
    let mut macros = BTreeMap::new();
    macros.insert("DIGIT".to_string(), PatternNode::class(vec![span('0', '9')]));
    macros.insert(
        "LETTER".to_string(),
        PatternNode::class(vec![span('a', 'z'), span('A', 'Z'), single('_')]),
    );

    let digits = plus(PatternNode::MacroRef("DIGIT".to_string()));
    let exponent = PatternNode::Concatenation(vec![
        PatternNode::class(vec![single('e'), single('E')]),
        opt(PatternNode::class(vec![single('+'), single('-')])),
        digits.clone(),
    ]);
    let number = PatternNode::Concatenation(vec![
        digits.clone(),
        opt(PatternNode::Concatenation(vec![PatternNode::literal("."), digits.clone()])),
        opt(exponent),
    ]);
    let word = PatternNode::Concatenation(vec![
        PatternNode::MacroRef("LETTER".to_string()),
        star(PatternNode::Alternation(vec![
            PatternNode::MacroRef("LETTER".to_string()),
            PatternNode::MacroRef("DIGIT".to_string()),
        ])),
    ]);
    // An integer before a range operator stays an integer
    let int_before_range = PatternNode::Lookaround {
        before: Box::new(digits.clone()),
        after: Box::new(PatternNode::literal("..")),
    };

    let initial = INITIAL_CONDITION;
    let mut rules = Vec::new();
    let mut action: ActionId = 0;
    for keyword in ["let", "fn", "if", "else", "for", "in"] {
        rules.push(in_condition(PatternNode::literal(keyword), action, initial));
        action += 1;
    }
    rules.push(in_condition(word, action, initial));
    action += 1;
    rules.push(in_condition(int_before_range, action, initial));
    action += 1;
    rules.push(in_condition(number, action, initial));
    action += 1;
    for op in ["..", ".", "==", "=", "+", "-", "*", "/", "(", ")", "{", "}", ",", ";"] {
        rules.push(in_condition(PatternNode::literal(op), action, initial));
        action += 1;
    }
    rules.push(in_condition(PatternNode::literal("\""), action, initial));
    action += 1;

    // String bodies: plain chunks, escapes, and the closing quote
    let chunk = plus(PatternNode::Class(CharClass::inverted(vec![single('"'), single('\\')])));
    let escape = PatternNode::Concatenation(vec![
        PatternNode::literal("\\"),
        PatternNode::Class(CharClass::any()),
    ]);
    rules.push(in_condition(chunk, action, "STRING"));
    action += 1;
    rules.push(in_condition(escape, action, "STRING"));
    action += 1;
    rules.push(in_condition(PatternNode::literal("\""), action, "STRING"));
    action += 1;
    rules.push(rule(whitespace(), action));

    ScannerSpec {
        name: "Scriptlet".to_string(),
        conditions: vec![initial.to_string(), "STRING".to_string()],
        macros,
        rules,
    }
}

/// `n_keywords` distinct keyword literals plus identifier and whitespace
/// rules, for scaling measurements over rule count.
pub fn synthetic_spec(n_keywords: usize) -> ScannerSpec {
    let mut rules = Vec::new();
    for i in 0..n_keywords {
        rules.push(rule(PatternNode::literal(&format!("kw{}", i)), i as ActionId));
    }
    rules.push(rule(ident(), n_keywords as ActionId));
    rules.push(rule(whitespace(), n_keywords as ActionId + 1));

    ScannerSpec {
        name: format!("Synthetic{}", n_keywords),
        conditions: Vec::new(),
        macros: BTreeMap::new(),
        rules,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Prepared intermediates
// ══════════════════════════════════════════════════════════════════════════════

/// A spec with every pipeline stage's input precomputed for the first start
/// condition, so each stage can be measured in isolation.
pub struct PreparedSpec {
    pub spec: ScannerSpec,
    pub rules: Vec<RulePattern>,
    pub nfa: Nfa,
    pub partition: AlphabetPartition,
    pub dfa: Dfa,
    pub min_dfa: Dfa,
}

pub fn prepare(spec: &ScannerSpec) -> PreparedSpec {
    let condition = spec
        .conditions
        .first()
        .map(String::as_str)
        .unwrap_or(INITIAL_CONDITION);

    let macro_table = MacroTable::build(&spec.macros);
    let rules: Vec<RulePattern> = spec
        .rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.conditions.contains(condition))
        .map(|(index, rule)| RulePattern {
            priority: index as Priority,
            action: rule.action,
            pattern: macro_table
                .expand(&rule.pattern)
                .expect("benchmark specs expand cleanly"),
        })
        .collect();

    let nfa = build_nfa(&rules);
    let partition = compute_equivalence_classes(&nfa);
    let dfa = subset_construction(&nfa, &partition);
    let min_dfa = minimize_dfa(&dfa);

    PreparedSpec { spec: spec.clone(), rules, nfa, partition, dfa, min_dfa }
}
