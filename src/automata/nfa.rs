//! NFA construction from expanded rule patterns.
//!
//! Each rule compiles to an independent Thompson fragment; the per-condition
//! NFA is the epsilon-alternation of all active rule fragments from a shared
//! start state. Quantifiers lower to epsilon-wrapped sub-fragments (bounded
//! repetition by fragment cloning), and trailing context lowers to a
//! boundary-flagged epsilon edge between the consumed part and the
//! lookahead part. Boundary edges behave like epsilon edges for closure
//! purposes but additionally tag the crossing rule, which determinization
//! propagates into DFA states.

use crate::ast::{CharRange, PatternNode};
use crate::ActionId;

use super::{AcceptToken, Nfa, NfaFragment, NfaState, Priority, StateId};

/// One expanded rule as the NFA builder sees it: macro-free pattern plus the
/// identity it stamps on its accepting state.
#[derive(Debug, Clone)]
pub struct RulePattern {
    /// Declaration index of the rule; doubles as the tie-break priority.
    pub priority: Priority,
    /// Action dispatched when this rule wins.
    pub action: ActionId,
    /// Expanded, macro-free pattern.
    pub pattern: PatternNode,
}

/// Build a complete NFA for one start condition from its active rules.
///
/// Every rule contributes exactly one accepting state, reachable only at the
/// end of its full pattern (including the lookahead part when trailing
/// context is used).
pub fn build_nfa(rules: &[RulePattern]) -> Nfa {
    let mut nfa = Nfa::new();
    let global_start = nfa.start;

    for rule in rules {
        let frag = compile_pattern(&mut nfa, &rule.pattern, rule.priority);
        nfa.states[frag.accept as usize].accept = Some(AcceptToken {
            priority: rule.priority,
            action: rule.action,
            lookahead: contains_lookaround(&rule.pattern),
        });
        nfa.add_epsilon(global_start, frag.start);
    }

    nfa
}

/// Whether a pattern contains a trailing-context node anywhere.
pub fn contains_lookaround(node: &PatternNode) -> bool {
    match node {
        PatternNode::Lookaround { .. } => true,
        PatternNode::Alternation(branches) => branches.iter().any(contains_lookaround),
        PatternNode::Concatenation(parts) => parts.iter().any(contains_lookaround),
        PatternNode::Quantified { node, .. } => contains_lookaround(node),
        PatternNode::Class(_) | PatternNode::Literal(_) | PatternNode::MacroRef(_) => false,
    }
}

/// Compile one pattern node into an NFA fragment.
///
/// `rule` is the declaring rule's priority; boundary edges created for
/// trailing context are tagged with it.
fn compile_pattern(nfa: &mut Nfa, node: &PatternNode, rule: Priority) -> NfaFragment {
    match node {
        PatternNode::Alternation(branches) => {
            let alt_start = nfa.add_state(NfaState::new());
            let alt_accept = nfa.add_state(NfaState::new());
            for branch in branches {
                let frag = compile_pattern(nfa, branch, rule);
                nfa.add_epsilon(alt_start, frag.start);
                nfa.add_epsilon(frag.accept, alt_accept);
            }
            NfaFragment { start: alt_start, accept: alt_accept }
        },

        PatternNode::Concatenation(parts) => {
            let mut fragments: Vec<NfaFragment> = Vec::with_capacity(parts.len());
            for part in parts {
                fragments.push(compile_pattern(nfa, part, rule));
            }
            link_concat(nfa, fragments)
        },

        PatternNode::Quantified { node, min, max } => {
            let frag = compile_pattern(nfa, node, rule);
            apply_quantifier(nfa, frag, *min, *max)
        },

        PatternNode::Class(class) => {
            let start = nfa.add_state(NfaState::new());
            let accept = nfa.add_state(NfaState::new());
            /* An empty resolved class produces no edges: matches nothing */
            for range in class.resolve() {
                nfa.add_transition(start, accept, range);
            }
            NfaFragment { start, accept }
        },

        PatternNode::Literal(seq) => {
            let start = nfa.add_state(NfaState::new());
            let mut current = start;
            for &cp in seq {
                let next = nfa.add_state(NfaState::new());
                nfa.add_transition(current, next, CharRange::single(cp));
                current = next;
            }
            NfaFragment { start, accept: current }
        },

        PatternNode::MacroRef(_) => {
            unreachable!("macro references are inlined before NFA construction")
        },

        PatternNode::Lookaround { before, after } => {
            let before_frag = compile_pattern(nfa, before, rule);
            let after_frag = compile_pattern(nfa, after, rule);
            nfa.add_boundary(before_frag.accept, after_frag.start, rule);
            NfaFragment { start: before_frag.start, accept: after_frag.accept }
        },
    }
}

/// Link a sequence of NFA fragments into a single concatenation fragment.
///
/// Each fragment's accept state is epsilon-connected to the next fragment's
/// start. An empty sequence yields a single-state fragment matching the
/// empty string.
fn link_concat(nfa: &mut Nfa, mut fragments: Vec<NfaFragment>) -> NfaFragment {
    if fragments.is_empty() {
        let s = nfa.add_state(NfaState::new());
        return NfaFragment { start: s, accept: s };
    }
    let mut result = fragments.remove(0);
    for next in fragments {
        nfa.add_epsilon(result.accept, next.start);
        result = NfaFragment { start: result.start, accept: next.accept };
    }
    result
}

/// Apply quantifier bounds to an NFA fragment.
///
/// The three classic shapes get dedicated epsilon wrappers; general bounds
/// expand to concatenated fragment copies.
fn apply_quantifier(nfa: &mut Nfa, frag: NfaFragment, min: u32, max: Option<u32>) -> NfaFragment {
    match (min, max) {
        (0, None) => {
            /* a* : new_start -> frag.start, new_start -> new_accept, frag.accept -> frag.start, frag.accept -> new_accept */
            let new_start = nfa.add_state(NfaState::new());
            let new_accept = nfa.add_state(NfaState::new());
            nfa.add_epsilon(new_start, frag.start);
            nfa.add_epsilon(new_start, new_accept);
            nfa.add_epsilon(frag.accept, frag.start);
            nfa.add_epsilon(frag.accept, new_accept);
            NfaFragment { start: new_start, accept: new_accept }
        },
        (1, None) => {
            /* a+ : new_start -> frag.start, frag.accept -> frag.start, frag.accept -> new_accept */
            let new_start = nfa.add_state(NfaState::new());
            let new_accept = nfa.add_state(NfaState::new());
            nfa.add_epsilon(new_start, frag.start);
            nfa.add_epsilon(frag.accept, frag.start);
            nfa.add_epsilon(frag.accept, new_accept);
            NfaFragment { start: new_start, accept: new_accept }
        },
        (0, Some(1)) => {
            /* a? : new_start -> frag.start, new_start -> new_accept, frag.accept -> new_accept */
            let new_start = nfa.add_state(NfaState::new());
            let new_accept = nfa.add_state(NfaState::new());
            nfa.add_epsilon(new_start, frag.start);
            nfa.add_epsilon(new_start, new_accept);
            nfa.add_epsilon(frag.accept, new_accept);
            NfaFragment { start: new_start, accept: new_accept }
        },
        (1, Some(1)) => frag,
        _ => apply_bounded_repeat(nfa, frag, min, max),
    }
}

/// Apply bounded repetition `{min,max}` by expanding to concatenated copies.
///
/// - `min` mandatory copies linked in sequence (the original fragment is the
///   first copy)
/// - For each of the `max - min` optional copies, an epsilon-bypassed copy
/// - For `{min,}` (unbounded), a Kleene-starred copy closes the sequence
fn apply_bounded_repeat(
    nfa: &mut Nfa,
    frag: NfaFragment,
    min: u32,
    max: Option<u32>,
) -> NfaFragment {
    if max == Some(0) {
        /* {0} matches only the empty string; the fragment itself is abandoned */
        let s = nfa.add_state(NfaState::new());
        return NfaFragment { start: s, accept: s };
    }

    /* The original fragment serves as the first copy; every further copy is
     * a fresh clone. All cloning happens before any wrapping or linking, so
     * the clone source never carries wrapper or sequence edges. */
    let total = match max {
        None => min as usize + 1,
        Some(max_val) => max_val as usize,
    };
    let mut copies: Vec<NfaFragment> = Vec::with_capacity(total);
    copies.push(frag.clone());
    for _ in 1..total {
        copies.push(clone_fragment(nfa, &frag));
    }

    /* Copies past the mandatory prefix become optional; with no upper bound
     * the final copy is starred instead. */
    for i in min as usize..total {
        let upper = if max.is_none() && i + 1 == total { None } else { Some(1) };
        copies[i] = apply_quantifier(nfa, copies[i].clone(), 0, upper);
    }

    /* Link all copies in sequence */
    let mut result = copies.remove(0);
    for next in copies {
        nfa.add_epsilon(result.accept, next.start);
        result = NfaFragment { start: result.start, accept: next.accept };
    }
    result
}

/// Clone an NFA fragment by creating fresh states with the same transitions.
///
/// Boundary edges are cloned along with labeled and epsilon edges, so
/// trailing context survives repetition expansion.
fn clone_fragment(nfa: &mut Nfa, frag: &NfaFragment) -> NfaFragment {
    /* Collect all reachable states. The accept seeds the walk alongside the
     * start: a class resolving to no code points compiles to a fragment with
     * no path between the two, and the clone still needs both endpoints. */
    let mut visited: Vec<StateId> = Vec::new();
    let mut queue: Vec<StateId> = vec![frag.start];
    let mut seen = std::collections::HashSet::new();
    seen.insert(frag.start);
    if seen.insert(frag.accept) {
        queue.push(frag.accept);
    }

    while let Some(state) = queue.pop() {
        visited.push(state);
        let s = &nfa.states[state as usize];
        for &(_, target) in &s.transitions {
            if seen.insert(target) {
                queue.push(target);
            }
        }
        for &target in &s.epsilon {
            if seen.insert(target) {
                queue.push(target);
            }
        }
        for &(target, _) in &s.boundary {
            if seen.insert(target) {
                queue.push(target);
            }
        }
    }

    /* Create new states and build old→new mapping */
    let mut mapping: std::collections::HashMap<StateId, StateId> =
        std::collections::HashMap::new();
    for &old_id in &visited {
        let new_id = nfa.add_state(NfaState::new());
        mapping.insert(old_id, new_id);
    }

    /* Copy transitions (clone avoids holding a borrow across add calls) */
    for &old_id in &visited {
        let transitions: Vec<(CharRange, StateId)> =
            nfa.states[old_id as usize].transitions.clone();
        let epsilons: Vec<StateId> = nfa.states[old_id as usize].epsilon.clone();
        let boundaries: Vec<(StateId, Priority)> = nfa.states[old_id as usize].boundary.clone();
        let new_id = mapping[&old_id];

        for (range, target) in transitions {
            if let Some(&new_target) = mapping.get(&target) {
                nfa.add_transition(new_id, new_target, range);
            }
        }
        for target in epsilons {
            if let Some(&new_target) = mapping.get(&target) {
                nfa.add_epsilon(new_id, new_target);
            }
        }
        for (target, rule) in boundaries {
            if let Some(&new_target) = mapping.get(&target) {
                nfa.add_boundary(new_id, new_target, rule);
            }
        }
    }

    NfaFragment {
        start: mapping[&frag.start],
        accept: mapping[&frag.accept],
    }
}

/// Compute the epsilon closure of a set of NFA states.
///
/// Returns all states reachable from `states` via zero or more epsilon or
/// boundary transitions, sorted and deduplicated. Boundary edges are
/// closure-transparent; their rule tags are read off separately during
/// determinization.
pub fn epsilon_closure(nfa: &Nfa, states: &[StateId]) -> Vec<StateId> {
    let mut closure: Vec<StateId> = states.to_vec();
    let mut stack: Vec<StateId> = states.to_vec();
    let mut visited = vec![false; nfa.states.len()];

    for &s in states {
        visited[s as usize] = true;
    }

    while let Some(state) = stack.pop() {
        for &target in &nfa.states[state as usize].epsilon {
            if !visited[target as usize] {
                visited[target as usize] = true;
                closure.push(target);
                stack.push(target);
            }
        }
        for &(target, _) in &nfa.states[state as usize].boundary {
            if !visited[target as usize] {
                visited[target as usize] = true;
                closure.push(target);
                stack.push(target);
            }
        }
    }

    closure.sort_unstable();
    closure.dedup();
    closure
}
