//! Table-driven maximal-munch scanner runtime.
//!
//! Drives the tables produced by [`crate::pipeline::compile`] over a string
//! region:
//! 1. Decode the run-length streams into dense lookup arrays
//! 2. From the cursor, walk the DFA as far as the input allows
//! 3. The last accepting state seen wins (longest match); ties between
//!    rules were already resolved toward the earliest declaration during
//!    DFA construction
//! 4. For trailing-context rules, the token ends at the recorded boundary
//!    crossing instead of the final accepting state
//!
//! Decoded tables are read-only; any number of scanners may share one
//! [`ScannerTables`] concurrently, each owning its own cursor.

use std::fmt;

use crate::ast::MAX_CHAR;
use crate::automata::{Priority, StateId};
use crate::tables::{decode_rle, decode_rle_biased, CompiledAutomaton, CompiledScanner};
use crate::ActionId;

// ══════════════════════════════════════════════════════════════════════════════
// Tokens and errors
// ══════════════════════════════════════════════════════════════════════════════

/// Byte range of a token in the scanned input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// One matched token: the action bound to the winning rule plus the
/// consumed span. The matched text is `&input[span.start..span.end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub action: ActionId,
    pub span: Span,
}

/// Fatal scan failure: no rule matches at the cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    /// Byte offset where no rule matched.
    pub position: usize,
    pub message: String,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan error at position {}: {}", self.position, self.message)
    }
}

impl std::error::Error for ScanError {}

// ══════════════════════════════════════════════════════════════════════════════
// Decoded tables
// ══════════════════════════════════════════════════════════════════════════════

/// Dense lookup tables for one start condition, expanded from the
/// run-length streams.
#[derive(Debug)]
struct ConditionTables {
    condition: String,
    start: StateId,
    state_count: usize,
    class_count: usize,
    /// Code point → equivalence class, full 16-bit domain.
    char_map: Vec<u16>,
    /// State × class → next state, row-major, -1 for no transition.
    transitions: Vec<i32>,
    /// State → bound action, -1 for non-accepting.
    actions: Vec<i32>,
    /// State → resolved rule, -1 for non-accepting.
    rules: Vec<i32>,
    /// State → whether the resolved rule has trailing context.
    lookahead: Vec<bool>,
    /// State → rules whose boundary can fall here.
    boundaries: Vec<Vec<Priority>>,
    /// Size of the per-rule boundary tracking buffer.
    rule_count: usize,
    has_lookahead: bool,
}

impl ConditionTables {
    fn decode(automaton: &CompiledAutomaton) -> Result<Self, String> {
        let state_count = automaton.state_count;
        let class_count = automaton.class_count;

        let char_map = decode_rle(&automaton.char_map);
        if char_map.len() != MAX_CHAR as usize + 1 {
            return Err(format!(
                "condition '{}': character map decodes to {} entries, expected {}",
                automaton.condition,
                char_map.len(),
                MAX_CHAR as usize + 1
            ));
        }
        for (cp, &class) in char_map.iter().enumerate() {
            if class as usize >= class_count {
                return Err(format!(
                    "condition '{}': code point {:#x} maps to class {} of {}",
                    automaton.condition, cp, class, class_count
                ));
            }
        }

        let transitions = decode_rle_biased(&automaton.transitions);
        if transitions.len() != state_count * class_count {
            return Err(format!(
                "condition '{}': transition table decodes to {} entries, expected {}",
                automaton.condition,
                transitions.len(),
                state_count * class_count
            ));
        }
        for &target in &transitions {
            if target >= state_count as i32 {
                return Err(format!(
                    "condition '{}': transition target {} of {} states",
                    automaton.condition, target, state_count
                ));
            }
        }

        let actions = decode_rle_biased(&automaton.action_map);
        if actions.len() != state_count {
            return Err(format!(
                "condition '{}': action map decodes to {} entries, expected {}",
                automaton.condition,
                actions.len(),
                state_count
            ));
        }

        let mut rules = vec![-1i32; state_count];
        let mut lookahead = vec![false; state_count];
        for accept in &automaton.accepts {
            if accept.state as usize >= state_count {
                return Err(format!(
                    "condition '{}': accepting state {} of {} states",
                    automaton.condition, accept.state, state_count
                ));
            }
            rules[accept.state as usize] = accept.rule as i32;
            lookahead[accept.state as usize] = accept.lookahead;
        }

        let mut boundaries = vec![Vec::new(); state_count];
        for boundary in &automaton.boundaries {
            if boundary.state as usize >= state_count {
                return Err(format!(
                    "condition '{}': boundary state {} of {} states",
                    automaton.condition, boundary.state, state_count
                ));
            }
            boundaries[boundary.state as usize] = boundary.rules.clone();
        }

        let rule_count = automaton
            .accepts
            .iter()
            .map(|a| a.rule as usize + 1)
            .chain(
                automaton
                    .boundaries
                    .iter()
                    .flat_map(|b| b.rules.iter().map(|&r| r as usize + 1)),
            )
            .max()
            .unwrap_or(0);
        let has_lookahead =
            automaton.accepts.iter().any(|a| a.lookahead) || !automaton.boundaries.is_empty();

        Ok(ConditionTables {
            condition: automaton.condition.clone(),
            start: automaton.start,
            state_count,
            class_count,
            char_map,
            transitions,
            actions,
            rules,
            lookahead,
            boundaries,
            rule_count,
            has_lookahead,
        })
    }

    /// Map a code point to its equivalence class. Code points above the
    /// mapped domain fold into the rest class.
    #[inline]
    fn classify(&self, cp: u32) -> u16 {
        let idx = if cp > MAX_CHAR { MAX_CHAR } else { cp };
        self.char_map[idx as usize]
    }

    #[inline]
    fn transition(&self, state: usize, class: u16) -> i32 {
        self.transitions[state * self.class_count + class as usize]
    }
}

/// Decoded scanner tables, shareable read-only across scan cursors.
#[derive(Debug)]
pub struct ScannerTables {
    conditions: Vec<ConditionTables>,
}

impl ScannerTables {
    /// Expand a compiled scanner's run-length streams into dense tables,
    /// validating table shapes along the way.
    pub fn decode(compiled: &CompiledScanner) -> Result<Self, String> {
        let conditions = compiled
            .automata
            .iter()
            .map(ConditionTables::decode)
            .collect::<Result<Vec<_>, String>>()?;
        if conditions.is_empty() {
            return Err("compiled scanner has no start conditions".to_string());
        }
        Ok(ScannerTables { conditions })
    }

    /// Names of the start conditions, in declaration order.
    pub fn condition_names(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|c| c.condition.as_str())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Scanner
// ══════════════════════════════════════════════════════════════════════════════

/// A scan cursor over one input region.
///
/// The scanner advances strictly forward through `[region start, region
/// end)`, yielding one token per [`Scanner::next_token`] call, `Ok(None)`
/// at end of region.
pub struct Scanner<'a> {
    tables: &'a ScannerTables,
    input: &'a str,
    dot: usize,
    region_end: usize,
    condition: usize,
    /// Last boundary crossing per rule, reused across scan steps.
    boundary_buf: Vec<Option<usize>>,
}

impl<'a> Scanner<'a> {
    /// Create a scanner over the whole input, starting in the first
    /// declared condition.
    pub fn new(tables: &'a ScannerTables, input: &'a str) -> Self {
        Scanner {
            tables,
            input,
            dot: 0,
            region_end: input.len(),
            condition: 0,
            boundary_buf: Vec::new(),
        }
    }

    /// Restrict scanning to `[start, end)`. Both offsets must lie on char
    /// boundaries. The cursor moves to `start`.
    pub fn set_region(&mut self, start: usize, end: usize) {
        debug_assert!(self.input.is_char_boundary(start));
        debug_assert!(self.input.is_char_boundary(end));
        self.dot = start;
        self.region_end = end;
    }

    /// Switch the active start condition.
    pub fn begin(&mut self, condition: &str) -> Result<(), String> {
        match self.tables.conditions.iter().position(|c| c.condition == condition) {
            Some(idx) => {
                self.condition = idx;
                Ok(())
            },
            None => Err(format!("unknown start condition '{}'", condition)),
        }
    }

    /// Name of the active start condition.
    pub fn condition(&self) -> &str {
        &self.tables.conditions[self.condition].condition
    }

    /// Current cursor position (byte offset).
    pub fn position(&self) -> usize {
        self.dot
    }

    /// Scan the next token, advancing the cursor past it. `Ok(None)` means
    /// the region is exhausted.
    pub fn next_token(&mut self) -> Result<Option<Token>, ScanError> {
        if self.dot >= self.region_end {
            return Ok(None);
        }
        let auto = &self.tables.conditions[self.condition];

        let mut state = auto.start as usize;
        // (state, end offset, trailing-context end) of the last accept seen
        let mut matched: Option<(usize, usize, Option<usize>)> = None;

        if auto.has_lookahead {
            self.boundary_buf.clear();
            self.boundary_buf.resize(auto.rule_count, None);
            for &rule in &auto.boundaries[state] {
                self.boundary_buf[rule as usize] = Some(self.dot);
            }
        }

        for (offset, ch) in self.input[self.dot..self.region_end].char_indices() {
            let class = auto.classify(ch as u32);
            let next = auto.transition(state, class);
            if next < 0 {
                break;
            }
            state = next as usize;
            let end = self.dot + offset + ch.len_utf8();

            // The accept is recorded before this state's own boundary
            // candidacy: a crossing at the accept position would leave the
            // trailing context empty.
            if auto.actions[state] >= 0 {
                let pending = if auto.lookahead[state] {
                    self.boundary_buf[auto.rules[state] as usize]
                } else {
                    None
                };
                matched = Some((state, end, pending));
            }
            if auto.has_lookahead {
                for &rule in &auto.boundaries[state] {
                    self.boundary_buf[rule as usize] = Some(end);
                }
            }
        }

        match matched {
            Some((accept_state, full_end, pending)) => {
                // A trailing-context match ends at the boundary crossing;
                // the inspected tail past it is not consumed.
                let end = match pending {
                    Some(boundary_end) if boundary_end > self.dot => boundary_end,
                    _ => full_end,
                };
                let span = Span { start: self.dot, end };
                self.dot = end;
                Ok(Some(Token { action: auto.actions[accept_state] as ActionId, span }))
            },
            None => {
                let ch = self.input[self.dot..].chars().next().unwrap_or('\u{FFFD}');
                Err(ScanError {
                    position: self.dot,
                    message: format!("unexpected character '{}'", ch),
                })
            },
        }
    }

    /// Scan the remaining region to completion.
    pub fn tokens(&mut self) -> Result<Vec<Token>, ScanError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CharClass, CharRange, PatternNode};
    use crate::automata::minimize::minimize_dfa;
    use crate::automata::nfa::{build_nfa, RulePattern};
    use crate::automata::partition::compute_equivalence_classes;
    use crate::automata::subset::subset_construction;
    use crate::tables::{encode_automaton, ScannerStats};

    fn class_plus(ranges: Vec<CharRange>) -> PatternNode {
        PatternNode::Quantified {
            node: Box::new(PatternNode::class(ranges)),
            min: 1,
            max: None,
        }
    }

    fn compile_condition(condition: &str, rules: &[RulePattern]) -> crate::tables::CompiledAutomaton {
        let nfa = build_nfa(rules);
        let partition = compute_equivalence_classes(&nfa);
        let dfa = minimize_dfa(&subset_construction(&nfa, &partition));
        encode_automaton(condition, &dfa, &partition)
    }

    fn tables_for(rules: Vec<RulePattern>) -> ScannerTables {
        let compiled = CompiledScanner {
            name: "test".to_string(),
            automata: vec![compile_condition("YYINITIAL", &rules)],
            stats: ScannerStats::default(),
        };
        ScannerTables::decode(&compiled).expect("tables should decode")
    }

    fn digit_word_rules() -> Vec<RulePattern> {
        vec![
            RulePattern {
                priority: 0,
                action: 0,
                pattern: class_plus(vec![CharRange::new('0' as u32, '9' as u32)]),
            },
            RulePattern {
                priority: 1,
                action: 1,
                pattern: class_plus(vec![
                    CharRange::new('a' as u32, 'z' as u32),
                    CharRange::new('A' as u32, 'Z' as u32),
                ]),
            },
        ]
    }

    /* ── basic scanning ──────────────────────────────────────────────────── */

    #[test]
    fn test_scans_alternating_tokens() {
        let tables = tables_for(digit_word_rules());
        let mut scanner = Scanner::new(&tables, "abc123xy");

        let tokens = scanner.tokens().expect("input should scan cleanly");
        assert_eq!(
            tokens,
            vec![
                Token { action: 1, span: Span { start: 0, end: 3 } },
                Token { action: 0, span: Span { start: 3, end: 6 } },
                Token { action: 1, span: Span { start: 6, end: 8 } },
            ]
        );
    }

    #[test]
    fn test_empty_region_yields_no_tokens() {
        let tables = tables_for(digit_word_rules());
        let mut scanner = Scanner::new(&tables, "");
        assert_eq!(scanner.next_token(), Ok(None));
    }

    #[test]
    fn test_unmatched_character_is_a_scan_error() {
        let tables = tables_for(digit_word_rules());
        let mut scanner = Scanner::new(&tables, "abc!");

        assert!(scanner.next_token().expect("first token").is_some());
        let err = scanner.next_token().expect_err("'!' matches no rule");
        assert_eq!(err.position, 3);
        assert!(err.message.contains('!'), "message should name the character: {}", err.message);
    }

    #[test]
    fn test_longest_match_wins() {
        let rules = vec![
            RulePattern { priority: 0, action: 0, pattern: PatternNode::literal("=") },
            RulePattern { priority: 1, action: 1, pattern: PatternNode::literal("==") },
        ];
        let tables = tables_for(rules);
        let mut scanner = Scanner::new(&tables, "===");

        let tokens = scanner.tokens().expect("scan");
        assert_eq!(
            tokens,
            vec![
                Token { action: 1, span: Span { start: 0, end: 2 } },
                Token { action: 0, span: Span { start: 2, end: 3 } },
            ]
        );
    }

    #[test]
    fn test_earlier_rule_wins_equal_length() {
        let rules = vec![
            RulePattern { priority: 0, action: 7, pattern: PatternNode::literal("if") },
            RulePattern {
                priority: 1,
                action: 8,
                pattern: class_plus(vec![CharRange::new('a' as u32, 'z' as u32)]),
            },
        ];
        let tables = tables_for(rules);

        let mut scanner = Scanner::new(&tables, "if");
        assert_eq!(scanner.next_token().expect("scan").map(|t| t.action), Some(7));

        let mut scanner = Scanner::new(&tables, "iffy");
        assert_eq!(
            scanner.next_token().expect("scan").map(|t| t.action),
            Some(8),
            "longer identifier must beat the keyword prefix"
        );
    }

    #[test]
    fn test_supplementary_plane_folds_to_rest_class() {
        let rules = vec![
            RulePattern {
                priority: 0,
                action: 0,
                pattern: class_plus(vec![CharRange::new('a' as u32, 'z' as u32)]),
            },
            RulePattern { priority: 1, action: 1, pattern: PatternNode::Class(CharClass::any()) },
        ];
        let tables = tables_for(rules);
        let mut scanner = Scanner::new(&tables, "ab\u{1F980}cd");

        let tokens = scanner.tokens().expect("scan");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].action, 1);
        assert_eq!(tokens[1].span, Span { start: 2, end: 6 }, "astral char spans 4 bytes");
    }

    /* ── regions and conditions ──────────────────────────────────────────── */

    #[test]
    fn test_set_region_scans_subslice() {
        let tables = tables_for(digit_word_rules());
        let mut scanner = Scanner::new(&tables, "abc123xyz");
        scanner.set_region(3, 6);

        let tokens = scanner.tokens().expect("scan");
        assert_eq!(tokens, vec![Token { action: 0, span: Span { start: 3, end: 6 } }]);
        assert_eq!(scanner.position(), 6);
    }

    #[test]
    fn test_begin_switches_condition() {
        let word = vec![RulePattern {
            priority: 0,
            action: 0,
            pattern: class_plus(vec![CharRange::new('a' as u32, 'z' as u32)]),
        }];
        let digit = vec![RulePattern {
            priority: 0,
            action: 1,
            pattern: class_plus(vec![CharRange::new('0' as u32, '9' as u32)]),
        }];
        let compiled = CompiledScanner {
            name: "two".to_string(),
            automata: vec![
                compile_condition("YYINITIAL", &word),
                compile_condition("DIGITS", &digit),
            ],
            stats: ScannerStats::default(),
        };
        let tables = ScannerTables::decode(&compiled).expect("decode");

        let mut scanner = Scanner::new(&tables, "ab12");
        assert_eq!(scanner.condition(), "YYINITIAL");
        assert_eq!(scanner.next_token().expect("scan").map(|t| t.action), Some(0));

        scanner.begin("DIGITS").expect("condition exists");
        assert_eq!(scanner.next_token().expect("scan").map(|t| t.action), Some(1));

        assert!(scanner.begin("NOSUCH").is_err());
    }

    /* ── trailing context ────────────────────────────────────────────────── */

    #[test]
    fn test_trailing_context_consumes_only_before() {
        let rules = vec![
            RulePattern {
                priority: 0,
                action: 0,
                pattern: PatternNode::Lookaround {
                    before: Box::new(class_plus(vec![CharRange::single('a' as u32)])),
                    after: Box::new(PatternNode::literal("b")),
                },
            },
            RulePattern { priority: 1, action: 1, pattern: PatternNode::literal("b") },
        ];
        let tables = tables_for(rules);
        let mut scanner = Scanner::new(&tables, "aaab");

        let tokens = scanner.tokens().expect("scan");
        assert_eq!(
            tokens,
            vec![
                Token { action: 0, span: Span { start: 0, end: 3 } },
                Token { action: 1, span: Span { start: 3, end: 4 } },
            ],
            "the trailing 'b' is inspected for the first token but not consumed by it"
        );
    }

    #[test]
    fn test_variable_length_trailing_context_takes_longest_before() {
        let rules = vec![
            RulePattern {
                priority: 0,
                action: 0,
                pattern: PatternNode::Lookaround {
                    before: Box::new(class_plus(vec![CharRange::single('a' as u32)])),
                    after: Box::new(class_plus(vec![CharRange::single('a' as u32)])),
                },
            },
            RulePattern {
                priority: 1,
                action: 1,
                pattern: class_plus(vec![CharRange::single('a' as u32)]),
            },
        ];
        let tables = tables_for(rules);
        let mut scanner = Scanner::new(&tables, "aaaa");

        let tokens = scanner.tokens().expect("scan");
        assert_eq!(
            tokens,
            vec![
                Token { action: 0, span: Span { start: 0, end: 3 } },
                Token { action: 1, span: Span { start: 3, end: 4 } },
            ],
            "before takes all but one 'a', leaving the shortest valid trailing context"
        );
    }

    /* ── decode validation ───────────────────────────────────────────────── */

    #[test]
    fn test_decode_rejects_truncated_transitions() {
        let mut compiled = CompiledScanner {
            name: "bad".to_string(),
            automata: vec![compile_condition("YYINITIAL", &digit_word_rules())],
            stats: ScannerStats::default(),
        };
        compiled.automata[0].transitions.truncate(2);
        let err = ScannerTables::decode(&compiled).expect_err("truncated stream must not decode");
        assert!(err.contains("transition table"), "unexpected error: {}", err);
    }

    #[test]
    fn test_decode_rejects_empty_scanner() {
        let compiled = CompiledScanner {
            name: "empty".to_string(),
            automata: vec![],
            stats: ScannerStats::default(),
        };
        assert!(ScannerTables::decode(&compiled).is_err());
    }
}
