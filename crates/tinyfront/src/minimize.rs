//! DFA minimization by partition refinement.

use crate::automaton::{Automaton, StateID};

/// Build the minimal automaton equivalent to a deterministic one.
///
/// States start out split into accepting and non-accepting blocks. A block
/// is refined by comparing each member against its first one, using the
/// destination block of every alphabet byte as the signature, until a full
/// pass moves nothing. Tags do not take part in the refinement; the tag of a
/// merged state is copied from its block representative.
pub fn minimize(dfa: &Automaton) -> Automaton {
    let span = tracing::trace_span!("minimize");
    let _entered = span.enter();

    let Some(start) = dfa.start() else {
        return Automaton::new();
    };
    let alphabet = dfa.alphabet_bytes();

    let mut block_of = vec![0usize; dfa.len()];
    let mut blocks: Vec<Vec<StateID>> = vec![];
    let (accepting, rest): (Vec<_>, Vec<_>) = dfa
        .states()
        .map(|(id, _)| id)
        .partition(|id| dfa.state(*id).is_accepting());
    for block in [accepting, rest] {
        if block.is_empty() {
            continue;
        }
        for id in &block {
            block_of[id.index()] = blocks.len();
        }
        blocks.push(block);
    }

    let signature = |id: StateID, block_of: &[usize]| -> Vec<isize> {
        alphabet
            .iter()
            .map(|&b| match dfa.step(id, b) {
                Some(to) => block_of[to.index()] as isize,
                None => -1,
            })
            .collect()
    };

    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = false;
        let mut i = 0;
        while i < blocks.len() {
            if blocks[i].len() >= 2 {
                let reference = signature(blocks[i][0], &block_of);
                let (stay, moved): (Vec<_>, Vec<_>) = blocks[i]
                    .iter()
                    .copied()
                    .partition(|id| signature(*id, &block_of) == reference);
                if !moved.is_empty() {
                    let new_block = blocks.len();
                    for id in &moved {
                        block_of[id.index()] = new_block;
                    }
                    blocks[i] = stay;
                    blocks.push(moved);
                    changed = true;
                }
            }
            i += 1;
        }
        if !changed {
            break;
        }
    }

    // the block holding the start state becomes state 0
    let start_block = block_of[start.index()];
    let mut order: Vec<usize> = (0..blocks.len()).collect();
    order.sort_by_key(|&b| b != start_block);
    let mut new_id = vec![StateID::new(0); blocks.len()];

    let mut minimal = Automaton::new();
    for &b in &order {
        new_id[b] = minimal.add_state();
    }
    minimal.set_start(new_id[start_block]);

    for &b in &order {
        let representative = blocks[b][0];
        let state = dfa.state(representative);
        if state.is_accepting() {
            match state.tag() {
                Some(tag) => minimal.set_accepting(new_id[b], tag),
                None => minimal.set_accepting_untagged(new_id[b]),
            }
        }
        for edge in dfa.edges(representative) {
            minimal.add_transition(
                new_id[b],
                new_id[block_of[edge.to.index()]],
                edge.input,
                edge.tag,
            );
        }
    }

    tracing::debug!(
        "minimize: {} -> {} states after {} pass(es)",
        dfa.len(),
        minimal.len(),
        passes
    );
    minimal
}
