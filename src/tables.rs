//! Run-length table encoding for compiled automata.
//!
//! The scanner runtime is table-driven: a character map (code point →
//! equivalence class), a transition table (state × class → state), and an
//! action map (state → bound action). All three are stored run-length
//! encoded as flat `u16` streams of `(value, runLength)` pairs, built by
//! scanning the source array left to right and coalescing consecutive equal
//! values.
//!
//! Tables that use `-1`/NONE as a sentinel (transitions, actions) store each
//! value with a `+1` bias so the sentinel packs as 0 and real entries stay
//! in `1..`. The character map has no sentinel and packs values directly.
//! Decoding must reproduce the source array exactly; the runtime in
//! [`crate::scanner`] works only from decoded streams.

use serde::{Deserialize, Serialize};

use crate::ast::MAX_CHAR;
use crate::automata::{partition::AlphabetPartition, Dfa, Priority, StateId, DEAD_STATE};
use crate::ActionId;

/// Hard ceiling on the minimized state count, summed across all start
/// conditions of one compilation. Table entries are 16-bit with a `+1`
/// bias, so state IDs beyond this cannot be represented.
pub const STATE_LIMIT: usize = 32767;

/// Hard ceiling on action ids. The action map shares the 16-bit `+1` biased
/// packing, so ids above this cannot be represented.
pub const ACTION_LIMIT: ActionId = 0xFFFE;

// ══════════════════════════════════════════════════════════════════════════════
// Run-length streams
// ══════════════════════════════════════════════════════════════════════════════

/// Run-length encode an array of plain values.
///
/// The stream alternates `value, runLength`. Runs longer than `u16::MAX`
/// are split into multiple pairs; decoding concatenates them back.
pub fn encode_rle(values: &[u16]) -> Vec<u16> {
    let mut stream = Vec::new();
    let mut i = 0;
    while i < values.len() {
        let value = values[i];
        let mut run = 1usize;
        while i + run < values.len() && values[i + run] == value {
            run += 1;
        }
        i += run;
        while run > u16::MAX as usize {
            stream.push(value);
            stream.push(u16::MAX);
            run -= u16::MAX as usize;
        }
        stream.push(value);
        stream.push(run as u16);
    }
    stream
}

/// Expand a run-length stream back into the source array.
pub fn decode_rle(stream: &[u16]) -> Vec<u16> {
    debug_assert!(stream.len() % 2 == 0, "RLE stream must be (value, run) pairs");
    let mut values = Vec::new();
    for pair in stream.chunks_exact(2) {
        let (value, run) = (pair[0], pair[1] as usize);
        values.extend(std::iter::repeat(value).take(run));
    }
    values
}

/// Run-length encode a sentinel-bearing array. Each value is stored with a
/// `+1` bias: the `-1` sentinel packs as 0, real entries as `value + 1`.
pub fn encode_rle_biased(values: &[i32]) -> Vec<u16> {
    let biased: Vec<u16> = values
        .iter()
        .map(|&v| {
            debug_assert!((-1..0xFFFF).contains(&v), "value {} out of packed range", v);
            (v + 1) as u16
        })
        .collect();
    encode_rle(&biased)
}

/// Expand a biased run-length stream, restoring the `-1` sentinel.
pub fn decode_rle_biased(stream: &[u16]) -> Vec<i32> {
    decode_rle(stream).iter().map(|&v| v as i32 - 1).collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// Encoded automata
// ══════════════════════════════════════════════════════════════════════════════

/// Integer width of the packed table entries in generated output.
///
/// The narrowest width that holds `max(stateCount, classCount, actionCount)`
/// is chosen so the emitting side can shrink static data; the streams here
/// are always `u16`, the width is recorded for the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableWidth {
    /// All counts fit in 8 bits.
    Byte,
    /// Some count needs 16 bits.
    Wide,
}

/// Select the narrowest width holding every table's value range.
pub fn select_width(state_count: usize, class_count: usize, action_count: usize) -> TableWidth {
    if state_count.max(class_count).max(action_count) <= 0xFF {
        TableWidth::Byte
    } else {
        TableWidth::Wide
    }
}

/// An accepting state and the rule it resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateAccept {
    pub state: StateId,
    /// Declaration index of the winning rule.
    pub rule: Priority,
    /// Whether the rule carries trailing context.
    pub lookahead: bool,
}

/// A state marking a candidate trailing-context boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateBoundary {
    pub state: StateId,
    /// Rules whose `before` part can end when the scan reaches this state.
    pub rules: Vec<Priority>,
}

/// The encoded tables and metadata for one start condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledAutomaton {
    /// Start condition this automaton serves.
    pub condition: String,
    /// Start state of the minimized DFA.
    pub start: StateId,
    /// Number of DFA states.
    pub state_count: usize,
    /// Number of character equivalence classes.
    pub class_count: usize,
    /// Packed entry width for the consumer.
    pub width: TableWidth,
    /// Code point → equivalence class, RLE over the full 16-bit domain.
    pub char_map: Vec<u16>,
    /// State × class → next state, row-major, RLE with `+1` bias.
    pub transitions: Vec<u16>,
    /// State → bound ActionId, RLE with `+1` bias.
    pub action_map: Vec<u16>,
    /// Accepting states with their resolved rules.
    pub accepts: Vec<StateAccept>,
    /// States with trailing-context boundary candidacy.
    pub boundaries: Vec<StateBoundary>,
}

/// Encode one minimized DFA into its table form.
pub fn encode_automaton(
    condition: &str,
    dfa: &Dfa,
    partition: &AlphabetPartition,
) -> CompiledAutomaton {
    let state_count = dfa.states.len();
    let class_count = dfa.num_classes;

    let mut char_map_dense: Vec<u16> = Vec::with_capacity(MAX_CHAR as usize + 1);
    for cp in 0..=MAX_CHAR {
        char_map_dense.push(partition.classify(cp));
    }

    let mut transitions_dense: Vec<i32> = Vec::with_capacity(state_count * class_count);
    for state in &dfa.states {
        for &target in &state.transitions {
            transitions_dense.push(if target == DEAD_STATE { -1 } else { target as i32 });
        }
    }

    let action_dense: Vec<i32> = dfa
        .states
        .iter()
        .map(|s| s.accept.map_or(-1, |t| t.action as i32))
        .collect();

    let accepts: Vec<StateAccept> = dfa
        .states
        .iter()
        .enumerate()
        .filter_map(|(i, s)| {
            s.accept.map(|t| StateAccept {
                state: i as StateId,
                rule: t.priority,
                lookahead: t.lookahead,
            })
        })
        .collect();

    let boundaries: Vec<StateBoundary> = dfa
        .states
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.boundary.is_empty())
        .map(|(i, s)| StateBoundary { state: i as StateId, rules: s.boundary.clone() })
        .collect();

    let action_count = dfa
        .states
        .iter()
        .filter_map(|s| s.accept.map(|t| t.action as usize + 1))
        .max()
        .unwrap_or(0);

    CompiledAutomaton {
        condition: condition.to_string(),
        start: dfa.start,
        state_count,
        class_count,
        width: select_width(state_count, class_count, action_count),
        char_map: encode_rle(&char_map_dense),
        transitions: encode_rle_biased(&transitions_dense),
        action_map: encode_rle_biased(&action_dense),
        accepts,
        boundaries,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Persisted scanner artifact
// ══════════════════════════════════════════════════════════════════════════════

/// Aggregate compilation statistics. Advisory only; nothing in the runtime
/// reads these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerStats {
    /// Rules in the source specification.
    pub rule_count: usize,
    /// Start conditions compiled.
    pub condition_count: usize,
    /// NFA states, summed across conditions.
    pub nfa_states: usize,
    /// DFA states before minimization, summed across conditions.
    pub dfa_states: usize,
    /// DFA states after minimization, summed across conditions.
    pub min_dfa_states: usize,
    /// Largest equivalence-class count of any condition.
    pub alphabet_size: usize,
}

/// Serializable compiled scanner, produced by [`crate::pipeline::compile`]
/// and consumed by [`crate::scanner::Scanner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledScanner {
    /// Scanner name from the source specification.
    pub name: String,
    /// One automaton per start condition, in declaration order.
    pub automata: Vec<CompiledAutomaton>,
    /// Aggregate statistics for the whole compilation.
    pub stats: ScannerStats,
}

impl CompiledScanner {
    /// Look up the automaton for a start condition by name.
    pub fn automaton(&self, condition: &str) -> Option<&CompiledAutomaton> {
        self.automata.iter().find(|a| a.condition == condition)
    }

    /// Save compiled tables to a JSON file.
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load compiled tables from a JSON file.
    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    /// Deserialize from an embedded JSON string (e.g., from `include_str!`).
    ///
    /// ```text
    /// static TABLES: LazyLock<CompiledScanner> = LazyLock::new(|| {
    ///     CompiledScanner::from_embedded(include_str!("path/to/tables.json"))
    ///         .expect("embedded tables should be valid JSON")
    /// });
    /// ```
    pub fn from_embedded(json_str: &str) -> Result<Self, String> {
        serde_json::from_str(json_str)
            .map_err(|e| format!("failed to deserialize embedded scanner tables: {}", e))
    }
}
