//! The implementation of LR(1) automaton.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    types::{Map, Set},
    util::display_fn,
};
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum MergeMode {
    /// Item sets are merged only when their LR(0) cores and lookahead
    /// symbols are equal (Knuth's canonical LR(1)).
    Canonical,

    /// Item sets with the same LR(0) cores are merged regardless of their
    /// lookahead symbols (DeRemer's LALR(1)).
    LALR,
}

#[derive(Debug, Clone)]
pub struct Config {
    merge_mode: MergeMode,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            merge_mode: MergeMode::Canonical,
        }
    }

    /// Build the canonical collection of LR(1) item sets.
    ///
    /// This is the default.
    pub fn use_canonical(&mut self) -> &mut Self {
        self.merge_mode = MergeMode::Canonical;
        self
    }

    /// Merge the states sharing the same LR(0) core as in LALR(1).
    pub fn use_lalr(&mut self) -> &mut Self {
        self.merge_mode = MergeMode::LALR;
        self
    }

    pub fn is_canonical(&self) -> bool {
        self.merge_mode == MergeMode::Canonical
    }
}

/// The state machine recognizing viable prefixes of a grammar.
///
/// Each node is labeled by a set of LR(1) items and has outgoing edges
/// labeled by grammar symbols; terminal edges become shift actions and
/// nonterminal edges become gotos.
#[derive(Debug)]
pub struct LR1Automaton {
    nodes: Map<NodeID, Node>,
}

impl LR1Automaton {
    pub fn generate(grammar: &Grammar) -> Self {
        Self::generate_with_config(grammar, &Config::new())
    }

    pub fn generate_with_config(grammar: &Grammar, config: &Config) -> Self {
        let span = tracing::trace_span!("lr1");
        let _entered = span.enter();

        let mut gen = Generator::new(grammar, config);
        gen.populate_nodes();
        let automaton = gen.finalize();
        tracing::debug!("LR(1) automaton: {} states", automaton.nodes.len());
        automaton
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeID, &Node)> + '_ {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn node(&self, id: NodeID) -> &Node {
        &self.nodes[&id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, (id, node)) in self.nodes().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## item_sets")?;
                for (core, ctx) in &node.item_set {
                    write!(f, "- {}  [", core.display(g))?;
                    for (i, lookahead) in ctx.lookaheads.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        write!(f, "{}", g.terminals[lookahead])?;
                    }
                    f.write_str("]\n")?;
                }

                writeln!(f, "## edges")?;
                for (symbol, target) in &node.edges {
                    writeln!(f, "- {} => {:02}", g.symbol_name(*symbol), target)?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeID {
    raw: u32,
}

impl NodeID {
    /// The node holding `$start -> . S`.
    pub const START: Self = Self::new(0);

    const fn new(raw: u32) -> Self {
        Self { raw }
    }

    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

#[derive(Debug)]
pub struct Node {
    item_set: LRItemSet,
    edges: Map<SymbolID, NodeID>,
    reductions: Vec<(RuleID, Vec<TerminalID>)>,
}

impl Node {
    /// The outgoing edges, used both as shifts and as gotos.
    pub fn edges(&self) -> impl Iterator<Item = (SymbolID, NodeID)> + '_ {
        self.edges.iter().map(|(symbol, target)| (*symbol, *target))
    }

    pub fn edge(&self, symbol: SymbolID) -> Option<NodeID> {
        self.edges.get(&symbol).copied()
    }

    /// The completed items of this node with their lookahead symbols,
    /// ordered by rule.
    pub fn reductions(&self) -> impl Iterator<Item = (RuleID, &[TerminalID])> + '_ {
        self.reductions
            .iter()
            .map(|(rule, lookaheads)| (*rule, &lookaheads[..]))
    }

    pub fn item_count(&self) -> usize {
        self.item_set.len()
    }
}

// A production with a marker position, `X -> Y1 . Y2 ... Yn`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct LRItemCore {
    rule: RuleID,
    marker: usize,
}
impl LRItemCore {
    fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = &g.rules[&self.rule];
            write!(f, "({} ->", g.nonterminals[&rule.left()])?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.marker == rule.right().len() {
                f.write_str(" .")?;
            }

            f.write_str(")")
        })
    }
}

#[derive(Debug, Clone)]
struct LRItemContext {
    lookaheads: Set<TerminalID>,
}

// lookaheads are kept apart from the cores so that the cores can be used as keys
type LRItemSet = BTreeMap<LRItemCore, LRItemContext>;
type LRItemCores = BTreeSet<LRItemCore>;

// === Generator ===

#[derive(Debug)]
struct PendingNodes {
    next_node_id: u32,
    queue: VecDeque<(NodeID, LRItemSet, Option<NodeID>)>,
}
impl PendingNodes {
    /// Push a LR(1) item set into the queue, and obtain registered NodeID.
    fn enqueue(&mut self, item_set: LRItemSet, prev_node: Option<NodeID>) -> NodeID {
        let id = NodeID::new(self.next_node_id);
        self.next_node_id += 1;
        self.queue.push_back((id, item_set, prev_node));
        id
    }

    fn dequeue(&mut self) -> Option<(NodeID, LRItemSet, Option<NodeID>)> {
        self.queue.pop_front()
    }
}

#[derive(Debug)]
struct NodeExtractor<'g> {
    grammar: &'g Grammar,
    first_sets: FirstSets,
}

impl NodeExtractor<'_> {
    /// Add `[Y -> . gamma, First(beta a)]` for every `[X -> alpha . Y beta, a]`
    /// until nothing changes.
    fn expand_closures(&self, items: &mut LRItemSet) {
        let mut changed = true;
        while changed {
            changed = false;

            let mut added: Map<LRItemCore, Set<TerminalID>> = Map::default();
            for (core, ctx) in &*items {
                let rule = &self.grammar.rules[&core.rule];

                let (y_symbol, beta) = match &rule.right()[core.marker..] {
                    [SymbolID::N(y_symbol), beta @ ..] => (y_symbol, beta),
                    _ => continue,
                };

                let x = self.first_sets.get(beta, ctx.lookaheads.iter().copied());
                for rule in self.grammar.rules.values() {
                    if rule.left() != *y_symbol {
                        continue;
                    }

                    added
                        .entry(LRItemCore {
                            rule: rule.id(),
                            marker: 0,
                        })
                        .or_default()
                        .extend(x.iter().copied());
                }
            }

            for (core, lookaheads) in added {
                let ctx = items.entry(core).or_insert_with(|| {
                    changed = true;
                    LRItemContext {
                        lookaheads: Set::default(),
                    }
                });
                for l in lookaheads {
                    changed |= ctx.lookaheads.insert(l);
                }
            }
        }
    }

    /// Group the items by the symbol after their marker, advancing the
    /// marker over it. The results are not closed yet.
    fn extract_transitions(&self, items: &LRItemSet) -> Map<SymbolID, LRItemSet> {
        let mut item_sets: Map<SymbolID, LRItemSet> = Map::default();
        for (core, ctx) in items {
            let rule = &self.grammar.rules[&core.rule];
            let Some(label) = rule.right().get(core.marker) else {
                continue;
            };
            item_sets.entry(*label).or_default().insert(
                LRItemCore {
                    marker: core.marker + 1,
                    ..*core
                },
                ctx.clone(),
            );
        }
        item_sets
    }
}

#[derive(Debug)]
struct Generator<'g> {
    extractor: NodeExtractor<'g>,
    pending_nodes: PendingNodes,
    nodes: Map<NodeID, (LRItemSet, Map<SymbolID, NodeID>)>,
    same_cores: Map<LRItemCores, Set<NodeID>>,
    config: &'g Config,
}

impl<'g> Generator<'g> {
    fn new(grammar: &'g Grammar, config: &'g Config) -> Self {
        let mut pending_nodes = PendingNodes {
            next_node_id: 1,
            queue: VecDeque::new(),
        };
        let mut item_set = BTreeMap::new();
        item_set.insert(
            LRItemCore {
                rule: RuleID::ACCEPT,
                marker: 0,
            },
            LRItemContext {
                lookaheads: Some(TerminalID::EOI).into_iter().collect(),
            },
        );
        pending_nodes
            .queue
            .push_back((NodeID::START, item_set, None));

        Self {
            extractor: NodeExtractor {
                grammar,
                first_sets: FirstSets::new(grammar),
            },
            pending_nodes,
            nodes: Map::default(),
            same_cores: Map::default(),
            config,
        }
    }

    fn populate_nodes(&mut self) {
        'dequeue: while let Some((new_id, mut new_item_set, prev_node)) =
            self.pending_nodes.dequeue()
        {
            self.extractor.expand_closures(&mut new_item_set);

            let cores: LRItemCores = new_item_set.keys().copied().collect();

            // reuse an existing node with the same cores when allowed
            if let Some(same_cores) = self.same_cores.get(&cores) {
                for &orig_id in same_cores {
                    let orig_node = &mut self.nodes[&orig_id];
                    match compare_item_sets(self.config.merge_mode, &orig_node.0, &new_item_set) {
                        ItemSetDiff::Same => (),

                        ItemSetDiff::Compatible => {
                            let mut modified = false;
                            for (new_core, new_ctx) in &new_item_set {
                                if let Some(orig_ctx) = orig_node.0.get_mut(new_core) {
                                    for l in &new_ctx.lookaheads {
                                        modified |= orig_ctx.lookaheads.insert(*l);
                                    }
                                }
                            }

                            // successors only need revisiting when lookaheads grew
                            if modified {
                                for (symbol, new_item_set) in
                                    self.extractor.extract_transitions(&new_item_set)
                                {
                                    let id =
                                        self.pending_nodes.enqueue(new_item_set, Some(orig_id));
                                    orig_node.1.insert(symbol, id);
                                }
                            }
                        }

                        ItemSetDiff::Different => continue,
                    }

                    // the edge of the predecessor still points to the discarded ID
                    if let Some(prev_node_id) = prev_node {
                        let prev_node = &mut self.nodes[&prev_node_id];
                        for edge in prev_node.1.values_mut() {
                            if *edge == new_id {
                                *edge = orig_id;
                            }
                        }
                    }

                    continue 'dequeue;
                }
            }

            let mut edges = Map::default();
            for (symbol, new_item_set) in self.extractor.extract_transitions(&new_item_set) {
                let id = self.pending_nodes.enqueue(new_item_set, Some(new_id));
                edges.insert(symbol, id);
            }

            self.nodes.insert(new_id, (new_item_set, edges));

            self.same_cores.entry(cores).or_default().insert(new_id);
        }
    }

    fn finalize(self) -> LR1Automaton {
        // node IDs may be sparse after merging, so renumber them
        let new_node_ids: Map<NodeID, NodeID> = self
            .nodes
            .keys()
            .enumerate()
            .map(|(i, orig_id)| (*orig_id, NodeID::new(i as u32)))
            .collect();

        let grammar = self.extractor.grammar;
        let mut nodes = Map::default();
        for (orig_id, (item_set, edges)) in self.nodes {
            let edges = edges
                .into_iter()
                .map(|(symbol, target)| (symbol, new_node_ids[&target]))
                .collect();

            let reductions = item_set
                .iter()
                .filter(|(core, _)| core.marker == grammar.rules[&core.rule].right().len())
                .map(|(core, ctx)| {
                    let mut lookaheads: Vec<TerminalID> =
                        ctx.lookaheads.iter().copied().collect();
                    lookaheads.sort();
                    (core.rule, lookaheads)
                })
                .collect();

            nodes.insert(
                new_node_ids[&orig_id],
                Node {
                    item_set,
                    edges,
                    reductions,
                },
            );
        }

        LR1Automaton { nodes }
    }
}

enum ItemSetDiff {
    Same,
    Compatible,
    Different,
}

fn compare_item_sets(mode: MergeMode, left: &LRItemSet, right: &LRItemSet) -> ItemSetDiff {
    // `left` and `right` are assumed to have the same LR(0) cores.
    let is_canonically_same = left
        .values()
        .zip(right.values())
        .all(|(left, right)| left.lookaheads == right.lookaheads);
    if is_canonically_same {
        return ItemSetDiff::Same;
    }

    match mode {
        MergeMode::LALR => ItemSetDiff::Compatible,
        MergeMode::Canonical => ItemSetDiff::Different,
    }
}
