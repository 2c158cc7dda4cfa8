//! Subset construction: NFA → DFA conversion.
//!
//! Implements the standard powerset construction algorithm:
//! 1. Compute epsilon-closure of the NFA start state → DFA start state
//! 2. For each DFA state and each equivalence class, compute reachable NFA states
//! 3. DFA accept state inherits the lowest-priority (earliest-declared) token
//!
//! Besides epsilon elimination, this pass propagates trailing-context
//! boundary tags: a DFA state whose closure crossed a boundary edge is a
//! candidate match-boundary for that rule, which the runtime uses to place
//! the match end at the boundary crossing.

use std::collections::HashMap;

use super::{
    nfa::epsilon_closure, partition::AlphabetPartition, AcceptToken, ClassId, Dfa, DfaState, Nfa,
    Priority, StateId, DEAD_STATE,
};

/// Convert an NFA to a DFA using subset construction with alphabet partitioning.
///
/// The resulting DFA uses equivalence class IDs for transitions (not raw
/// code points), so transition tables are compact. Transitions are stored as
/// dense arrays indexed by class ID for O(1) lookup.
pub fn subset_construction(nfa: &Nfa, partition: &AlphabetPartition) -> Dfa {
    let num_classes = partition.num_classes;
    let mut dfa = Dfa::new(num_classes);

    // Map from sorted set of NFA states → DFA state ID
    let mut state_map: HashMap<Vec<StateId>, StateId> = HashMap::new();
    // Worklist of DFA states to process
    let mut worklist: Vec<Vec<StateId>> = Vec::new();

    // Start state: epsilon-closure of NFA start
    let start_set = epsilon_closure(nfa, &[nfa.start]);
    dfa.states[0].accept = resolve_accept(nfa, &start_set);
    dfa.states[0].boundary = resolve_boundary(nfa, &start_set);
    state_map.insert(start_set.clone(), 0);
    worklist.push(start_set);

    while let Some(current_set) = worklist.pop() {
        let current_dfa_state = *state_map
            .get(&current_set)
            .expect("current set should be in state_map");

        // For each equivalence class, compute the set of NFA states reachable
        for class_id in 0..num_classes as ClassId {
            let rep = partition.class_representatives[class_id as usize];

            // move(current_set, class_id): all NFA states reachable via
            // transitions whose range covers this class. Ranges are built
            // from whole classes, so testing the representative suffices.
            let mut target_set: Vec<StateId> = Vec::new();
            for &nfa_state in &current_set {
                for &(range, target) in &nfa.states[nfa_state as usize].transitions {
                    if range.contains(rep) {
                        target_set.push(target);
                    }
                }
            }

            if target_set.is_empty() {
                continue; // No transition for this class; the row keeps DEAD_STATE
            }

            // Compute epsilon-closure of the target set
            target_set = epsilon_closure(nfa, &target_set);

            // Look up or create the DFA state for this NFA state set
            let target_dfa_state = if let Some(&existing) = state_map.get(&target_set) {
                existing
            } else {
                let accept = resolve_accept(nfa, &target_set);
                let boundary = resolve_boundary(nfa, &target_set);
                let new_state = dfa.add_state(DfaState {
                    transitions: vec![DEAD_STATE; num_classes],
                    accept,
                    boundary,
                });
                state_map.insert(target_set.clone(), new_state);
                log::trace!("dfa state {} interned from {} nfa states", new_state, target_set.len());
                worklist.push(target_set);
                new_state
            };

            dfa.set_transition(current_dfa_state, class_id, target_dfa_state);
        }
    }

    dfa
}

/// Resolve the accept token for a set of NFA states.
/// If multiple NFA states in the set are accepting, the lowest declaration
/// priority (earliest rule) wins.
fn resolve_accept(nfa: &Nfa, states: &[StateId]) -> Option<AcceptToken> {
    states
        .iter()
        .filter_map(|&s| nfa.states[s as usize].accept)
        .min_by_key(|token| token.priority)
}

/// Collect the trailing-context rules whose boundary was crossed inside this
/// closure: the closure contains the source state of a boundary edge, so the
/// target was entered through it.
fn resolve_boundary(nfa: &Nfa, states: &[StateId]) -> Vec<Priority> {
    let mut rules: Vec<Priority> = states
        .iter()
        .flat_map(|&s| nfa.states[s as usize].boundary.iter().map(|&(_, rule)| rule))
        .collect();
    rules.sort_unstable();
    rules.dedup();
    rules
}
