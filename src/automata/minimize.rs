//! Hopcroft's DFA minimization.
//!
//! Merges equivalent DFA states: states that carry the same accept token,
//! the same trailing-context boundary set, and transition identically on all
//! equivalence classes. Rule sets with many literals sharing common prefixes
//! (keywords over an identifier rule, operator families like `=`, `==`, `=>`)
//! shrink substantially here because the shared prefixes collapse into
//! single states.
//!
//! **Algorithm:** True Hopcroft's minimization using an inverse transition map.
//! For each splitter (partition + equivalence class), only the predecessors
//! of splitter states are examined, yielding O(|transitions| × log p) work
//! where p is the number of partitions, instead of the naive O(n² × k) scan.
//!
//! Boundary sets take part in the initial partition: two states with
//! different trailing-context candidacy are distinguishable to the runtime
//! even when their transitions agree, so they must never merge.

use super::{AcceptToken, ClassId, Dfa, DfaState, Priority, StateId, DEAD_STATE};
use std::collections::BTreeMap;

/// Minimize a DFA using Hopcroft's algorithm with an inverse transition map.
///
/// Returns a new DFA with equivalent states merged. The start state of the
/// result is always state 0.
pub fn minimize_dfa(dfa: &Dfa) -> Dfa {
    let n = dfa.states.len();
    if n <= 1 {
        return dfa.clone();
    }

    let num_classes = dfa.num_classes;

    // --- Step 1: Build inverse transition map ---
    // inverse[target_state][class_id] = predecessor states that transition
    // to target_state on class_id.
    let mut inverse: Vec<Vec<Vec<StateId>>> = vec![vec![Vec::new(); num_classes]; n];
    for (state_idx, state) in dfa.states.iter().enumerate() {
        let state_id = state_idx as StateId;
        for (class_id, &target) in state.transitions.iter().enumerate() {
            if target != DEAD_STATE {
                inverse[target as usize][class_id].push(state_id);
            }
        }
    }

    // --- Step 2: Initial partition by accept token and boundary set ---
    // AcceptToken derives Ord, so the pair keys a BTreeMap directly.
    let mut groups: BTreeMap<(Option<AcceptToken>, &[Priority]), Vec<StateId>> = BTreeMap::new();
    for (i, state) in dfa.states.iter().enumerate() {
        groups
            .entry((state.accept, state.boundary.as_slice()))
            .or_default()
            .push(i as StateId);
    }

    // partition_of[state] = partition index for that state
    let mut partition_of: Vec<usize> = vec![0; n];
    // partitions: each partition is a sorted Vec<StateId>
    let mut partitions: Vec<Vec<StateId>> = Vec::with_capacity(groups.len());

    for (_key, states) in groups {
        let part_idx = partitions.len();
        for &s in &states {
            partition_of[s as usize] = part_idx;
        }
        partitions.push(states);
    }

    // --- Step 3: Worklist initialization ---
    // All initial partitions are queued for every class; refinement below
    // only ever adds the smaller half of a split.
    let num_initial = partitions.len();
    let mut worklist: Vec<(usize, ClassId)> = Vec::with_capacity(num_initial * num_classes);
    for part_idx in 0..num_initial {
        for class_id in 0..num_classes as ClassId {
            worklist.push((part_idx, class_id));
        }
    }

    // --- Step 4: Iterative refinement with inverse transition map ---
    // Reusable buffers to avoid repeated allocation
    let mut affected_partitions: Vec<usize> = Vec::new();

    while let Some((splitter_idx, class_id)) = worklist.pop() {
        if partitions[splitter_idx].is_empty() {
            continue;
        }

        // Only partitions holding a predecessor of a splitter state can
        // split on this class.
        affected_partitions.clear();
        let num_partitions = partitions.len();
        let mut partition_seen = vec![false; num_partitions];

        for &splitter_state in &partitions[splitter_idx] {
            for &pred in &inverse[splitter_state as usize][class_id as usize] {
                let pred_part = partition_of[pred as usize];
                if !partition_seen[pred_part] {
                    partition_seen[pred_part] = true;
                    affected_partitions.push(pred_part);
                }
            }
        }

        for &part_idx in &affected_partitions {
            if partitions[part_idx].len() <= 1 {
                continue;
            }

            // Count which side of the split each member falls on: a state
            // splits off when its transition on class_id lands inside the
            // splitter partition.
            let splitter_part = splitter_idx;
            let mut split_count = 0;
            let mut keep_count = 0;
            for &state in &partitions[part_idx] {
                let target = dfa.transition(state, class_id);
                if target != DEAD_STATE && partition_of[target as usize] == splitter_part {
                    split_count += 1;
                } else {
                    keep_count += 1;
                }
            }

            // If all states agree, no split needed
            if split_count == 0 || keep_count == 0 {
                continue;
            }

            // Split: keep the larger group in place, move the smaller group
            // into a fresh partition (Hopcroft's small-half rule).
            let new_part_idx = partitions.len();
            let small_goes_to_splitter = split_count <= keep_count;

            let mut new_partition =
                Vec::with_capacity(split_count.min(keep_count));
            let mut kept = Vec::with_capacity(split_count.max(keep_count));
            for &state in &partitions[part_idx] {
                let target = dfa.transition(state, class_id);
                let goes_to_splitter =
                    target != DEAD_STATE && partition_of[target as usize] == splitter_part;
                if goes_to_splitter == small_goes_to_splitter {
                    partition_of[state as usize] = new_part_idx;
                    new_partition.push(state);
                } else {
                    kept.push(state);
                }
            }
            partitions[part_idx] = kept;
            log::trace!(
                "split partition {} on class {}: {} states move to partition {}",
                part_idx,
                class_id,
                new_partition.len(),
                new_part_idx
            );
            partitions.push(new_partition);

            // Queue the new (smaller) partition for all classes. Each state
            // can move to a smaller partition at most O(log n) times, which
            // bounds total worklist growth.
            for c in 0..num_classes as ClassId {
                worklist.push((new_part_idx, c));
            }
        }
    }

    // --- Step 5: Build minimized DFA ---
    let mut new_dfa = Dfa::new(num_classes);

    let non_empty: Vec<usize> = (0..partitions.len())
        .filter(|&i| !partitions[i].is_empty())
        .collect();

    let mut partition_to_new_state: Vec<StateId> = vec![DEAD_STATE; partitions.len()];

    // The partition containing the original start state becomes state 0.
    let start_partition = partition_of[dfa.start as usize];
    partition_to_new_state[start_partition] = 0;
    let representative = partitions[start_partition][0];
    new_dfa.states[0].accept = dfa.states[representative as usize].accept;
    new_dfa.states[0].boundary = dfa.states[representative as usize].boundary.clone();

    for &part_idx in &non_empty {
        if partition_to_new_state[part_idx] != DEAD_STATE {
            continue; // already assigned (start partition)
        }
        let rep = partitions[part_idx][0];
        let new_state = new_dfa.add_state(DfaState {
            transitions: vec![DEAD_STATE; num_classes],
            accept: dfa.states[rep as usize].accept,
            boundary: dfa.states[rep as usize].boundary.clone(),
        });
        partition_to_new_state[part_idx] = new_state;
    }

    // Transitions follow any representative; all members agree by
    // construction once refinement has stabilized.
    for &part_idx in &non_empty {
        let rep = partitions[part_idx][0];
        let new_state_id = partition_to_new_state[part_idx];

        for class_id in 0..num_classes as ClassId {
            let target = dfa.transition(rep, class_id);
            if target != DEAD_STATE {
                let target_partition = partition_of[target as usize];
                let new_target = partition_to_new_state[target_partition];
                if new_target != DEAD_STATE {
                    new_dfa.set_transition(new_state_id, class_id, new_target);
                }
            }
        }
    }

    new_dfa.start = 0;
    new_dfa
}
