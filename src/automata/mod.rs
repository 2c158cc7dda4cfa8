//! Automata infrastructure for table compilation.
//!
//! Provides NFA/DFA types and the per-condition pipeline:
//! `Rules -> NFA -> Symbol classes -> DFA (subset) -> Minimize`
//!
//! States live in arenas indexed by [`StateId`]; transition graphs are
//! cyclic (loops for `*`/`+`) but ownership never is.

pub mod minimize;
pub mod nfa;
pub mod partition;
pub mod subset;

use crate::ast::CharRange;
use crate::ActionId;

/// Identifier for an automaton state.
pub type StateId = u32;

/// Identifier for an equivalence class of code points.
pub type ClassId = u16;

/// A sentinel value representing a non-existent / dead state.
pub const DEAD_STATE: StateId = u32::MAX;

/// Rule priority: the rule's declaration index. Lower wins ties.
pub type Priority = u32;

/// Acceptance data carried by an accepting state.
///
/// Ordering is priority-major, so resolving a set of candidates to the
/// winning rule is a plain `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AcceptToken {
    /// Declaration index of the originating rule.
    pub priority: Priority,
    /// Action bound to the rule.
    pub action: ActionId,
    /// Whether the rule carries trailing context; the runtime then takes the
    /// match end from the recorded boundary position.
    pub lookahead: bool,
}

/// NFA state with range-labeled, epsilon, and boundary transitions.
#[derive(Debug, Clone)]
pub struct NfaState {
    /// Labeled transitions: (code-point range, target state).
    pub transitions: Vec<(CharRange, StateId)>,
    /// Epsilon transitions: target states reachable without consuming input.
    pub epsilon: Vec<StateId>,
    /// Boundary transitions: epsilon edges marking the end of a trailing
    /// context rule's consumed part. `(target, rule priority)`.
    pub boundary: Vec<(StateId, Priority)>,
    /// If this is an accepting state, the rule it accepts for.
    pub accept: Option<AcceptToken>,
}

impl NfaState {
    /// Create a new non-accepting NFA state with no transitions.
    pub fn new() -> Self {
        NfaState {
            transitions: Vec::new(),
            epsilon: Vec::new(),
            boundary: Vec::new(),
            accept: None,
        }
    }

    /// Create a new accepting NFA state.
    pub fn accepting(token: AcceptToken) -> Self {
        NfaState {
            transitions: Vec::new(),
            epsilon: Vec::new(),
            boundary: Vec::new(),
            accept: Some(token),
        }
    }
}

impl Default for NfaState {
    fn default() -> Self {
        Self::new()
    }
}

/// A complete NFA (collection of states with a designated start state).
#[derive(Debug, Clone)]
pub struct Nfa {
    pub states: Vec<NfaState>,
    pub start: StateId,
}

impl Nfa {
    /// Create a new NFA with a single non-accepting start state.
    pub fn new() -> Self {
        Nfa { states: vec![NfaState::new()], start: 0 }
    }

    /// Add a new state and return its ID.
    pub fn add_state(&mut self, state: NfaState) -> StateId {
        let id = self.states.len() as StateId;
        self.states.push(state);
        id
    }

    /// Add an epsilon transition from `from` to `to`.
    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self.states[from as usize].epsilon.push(to);
    }

    /// Add a boundary transition from `from` to `to` for `rule`.
    pub fn add_boundary(&mut self, from: StateId, to: StateId, rule: Priority) {
        self.states[from as usize].boundary.push((to, rule));
    }

    /// Add a labeled transition from `from` to `to` on `range`.
    pub fn add_transition(&mut self, from: StateId, to: StateId, range: CharRange) {
        self.states[from as usize].transitions.push((range, to));
    }
}

impl Default for Nfa {
    fn default() -> Self {
        Self::new()
    }
}

/// DFA state with deterministic transitions.
///
/// Transitions are stored as a dense array indexed by equivalence class ID.
/// `transitions[class_id]` gives the target state, or `DEAD_STATE` if no
/// transition exists for that class.
#[derive(Debug, Clone)]
pub struct DfaState {
    /// Dense transition table: `transitions[class_id] = target_state`.
    /// Length is always `num_classes` (stored in parent `Dfa`).
    pub transitions: Vec<StateId>,
    /// If this is an accepting state, the winning rule (lowest priority
    /// among the underlying NFA accepts).
    pub accept: Option<AcceptToken>,
    /// Priorities of trailing-context rules for which this state marks a
    /// candidate match boundary. Sorted, deduplicated.
    pub boundary: Vec<Priority>,
}

impl DfaState {
    /// Create a new non-accepting DFA state with `num_classes` dead transitions.
    pub fn with_classes(num_classes: usize) -> Self {
        DfaState {
            transitions: vec![DEAD_STATE; num_classes],
            accept: None,
            boundary: Vec::new(),
        }
    }
}

/// A complete DFA (collection of states with a designated start state).
#[derive(Debug, Clone)]
pub struct Dfa {
    pub states: Vec<DfaState>,
    pub start: StateId,
    /// Number of equivalence classes (alphabet size after partitioning).
    pub num_classes: usize,
}

impl Dfa {
    /// Create a new DFA with a single non-accepting start state.
    pub fn new(num_classes: usize) -> Self {
        Dfa {
            states: vec![DfaState::with_classes(num_classes)],
            start: 0,
            num_classes,
        }
    }

    /// Add a new state and return its ID.
    pub fn add_state(&mut self, state: DfaState) -> StateId {
        let id = self.states.len() as StateId;
        self.states.push(state);
        id
    }

    /// O(1) transition lookup: returns target state or `DEAD_STATE`.
    #[inline]
    pub fn transition(&self, state: StateId, class: ClassId) -> StateId {
        self.states[state as usize].transitions[class as usize]
    }

    /// Set a transition: `state --class--> target`.
    #[inline]
    pub fn set_transition(&mut self, state: StateId, class: ClassId, target: StateId) {
        self.states[state as usize].transitions[class as usize] = target;
    }
}

/// An NFA fragment (sub-automaton) with a designated start and accept state.
/// Used during Thompson's construction to build up the NFA incrementally.
#[derive(Debug, Clone)]
pub struct NfaFragment {
    pub start: StateId,
    pub accept: StateId,
}
