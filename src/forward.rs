//! Topological forward dataflow over the inner-node DAG.
//!
//! [`run`] propagates a per-node summary from the root downwards in Kahn
//! order: in-degrees are counted in a first traversal (a `Repeat` edge
//! never contributes — it resolves dynamically to the root), then each
//! node is finalized exactly once, after all its inner in-edges have
//! delivered their values. Termination is the finiteness of the DAG.
//!
//! `Repeat` edges are surfaced to the pass through a separate hook; each
//! instantiation decides what a back-edge means for it (an unbounded
//! length, a cycle congruence, automaton states fed back around the loop).

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use log::debug;

use crate::interval::{Bound, Congruence, Interval};
use crate::node::{addr, reachable, NodeRef};
use crate::utils::gcd;

/// A monotone per-node summary propagated root-to-leaves.
pub trait ForwardPass {
    type Value: Clone;

    /// Value seeded at the root.
    fn start(&self) -> Self::Value;

    /// Commutative, associative combination of values arriving over
    /// different in-edges.
    fn merge(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Value pushed along an inner child edge labelled `edge`.
    fn step(&mut self, node: &NodeRef, value: &Self::Value, edge: char) -> Self::Value;

    /// A `Repeat` child edge was encountered.
    fn repeat_edge(&mut self, _node: &NodeRef, _value: &Self::Value, _edge: char) {}

    /// Called once per node with its finalized value.
    fn finish(&mut self, _node: &NodeRef, _value: &Self::Value) {}
}

/// Run `pass` over every inner node reachable from `root`; returns the
/// finalized value per node identity.
pub fn run<P: ForwardPass>(root: &NodeRef, pass: &mut P) -> HashMap<usize, P::Value> {
    let nodes = reachable(root);
    let mut indegree: HashMap<usize, usize> = nodes.iter().map(|n| (addr(n), 0)).collect();
    for n in &nodes {
        for child in n.children().values() {
            if !child.is_repeat() {
                *indegree.get_mut(&addr(child)).expect("forward: unseen child") += 1;
            }
        }
    }
    assert_eq!(
        indegree[&addr(root)],
        0,
        "forward: the root cannot be an inner child (the DAG would be cyclic)"
    );

    let mut values: HashMap<usize, P::Value> = HashMap::new();
    values.insert(addr(root), pass.start());
    let mut queue: VecDeque<NodeRef> = VecDeque::new();
    queue.push_back(root.clone());

    while let Some(n) = queue.pop_front() {
        let value = values[&addr(&n)].clone();
        pass.finish(&n, &value);
        for (c, child) in n.children() {
            if child.is_repeat() {
                pass.repeat_edge(&n, &value, *c);
                continue;
            }
            let pushed = pass.step(&n, &value, *c);
            let key = addr(child);
            let merged = match values.get(&key) {
                Some(old) => pass.merge(old, &pushed),
                None => pushed,
            };
            values.insert(key, merged);
            let d = indegree.get_mut(&key).expect("forward: unseen child");
            *d -= 1;
            if *d == 0 {
                queue.push_back(child.clone());
            }
        }
    }
    debug!("forward: finalized {} nodes", values.len());
    values
}

/// Depth intervals: at which distances from the root can each node be
/// reached, and at which depths does the language accept.
pub struct DepthPass {
    /// Depths of accepting nodes (loop-free).
    pub accepted: Interval,
    pub has_repeat: bool,
}

impl DepthPass {
    pub fn new() -> Self {
        Self {
            accepted: Interval::bottom(),
            has_repeat: false,
        }
    }
}

impl Default for DepthPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ForwardPass for DepthPass {
    type Value = Interval;

    fn start(&self) -> Interval {
        Interval::constant(0)
    }

    fn merge(&self, a: &Interval, b: &Interval) -> Interval {
        a.join(b)
    }

    fn step(&mut self, _node: &NodeRef, value: &Interval, _edge: char) -> Interval {
        value.shift(1)
    }

    fn repeat_edge(&mut self, _node: &NodeRef, _value: &Interval, _edge: char) {
        self.has_repeat = true;
    }

    fn finish(&mut self, node: &NodeRef, value: &Interval) {
        if node.accepting() {
            self.accepted = self.accepted.join(value);
        }
    }
}

/// Per-node depth intervals. With any `Repeat` edge present, paths can
/// revisit every node arbitrarily often, so upper bounds widen to +∞.
pub fn depth_map(root: &NodeRef) -> (HashMap<usize, Interval>, DepthPass) {
    let mut pass = DepthPass::new();
    let mut map = run(root, &mut pass);
    if pass.has_repeat {
        for v in map.values_mut() {
            if !v.is_empty() {
                v.high = Bound::PosInf;
            }
        }
    }
    (map, pass)
}

/// `[min, max]` length of the accepted strings of the tree.
pub fn length_interval(root: &NodeRef) -> Interval {
    let mut pass = DepthPass::new();
    run(root, &mut pass);
    if pass.accepted.is_empty() {
        return Interval::bottom();
    }
    if pass.has_repeat {
        Interval::new(pass.accepted.low, Bound::PosInf)
    } else {
        pass.accepted
    }
}

/// Congruence pass: depths as `remainder (mod divisor)` classes.
pub struct CongruencePass {
    pub accepted: Option<Congruence>,
    pub loops: Option<Congruence>,
}

impl CongruencePass {
    pub fn new() -> Self {
        Self {
            accepted: None,
            loops: None,
        }
    }
}

impl Default for CongruencePass {
    fn default() -> Self {
        Self::new()
    }
}

fn join_opt(acc: &Option<Congruence>, v: &Congruence) -> Option<Congruence> {
    Some(match acc {
        Some(old) => old.join(v),
        None => *v,
    })
}

impl ForwardPass for CongruencePass {
    type Value = Congruence;

    fn start(&self) -> Congruence {
        Congruence::exactly(0)
    }

    fn merge(&self, a: &Congruence, b: &Congruence) -> Congruence {
        a.join(b)
    }

    fn step(&mut self, _node: &NodeRef, value: &Congruence, _edge: char) -> Congruence {
        value.shift(1)
    }

    fn repeat_edge(&mut self, _node: &NodeRef, value: &Congruence, _edge: char) {
        self.loops = join_opt(&self.loops, &value.shift(1));
    }

    fn finish(&mut self, node: &NodeRef, value: &Congruence) {
        if node.accepting() {
            self.accepted = join_opt(&self.accepted, value);
        }
    }
}

/// Every accepted length is `remainder (mod divisor)`; `None` for the
/// empty language.
pub fn length_congruence(root: &NodeRef) -> Option<Congruence> {
    let mut pass = CongruencePass::new();
    run(root, &mut pass);
    let accepted = pass.accepted?;
    match pass.loops {
        None => Some(accepted),
        Some(l) => {
            // Loop lengths contribute increments generated by gcd(d, r).
            let g = gcd(l.divisor, l.remainder);
            let d = gcd(accepted.divisor, g);
            Some(Congruence::new(d, accepted.remainder))
        }
    }
}

fn kmp_failure(needle: &[char]) -> Vec<usize> {
    let m = needle.len();
    let mut fail = vec![0; m + 1];
    let mut k = 0;
    for i in 1..m {
        while k > 0 && needle[i] != needle[k] {
            k = fail[k];
        }
        if needle[i] == needle[k] {
            k += 1;
        }
        fail[i + 1] = k;
    }
    fail
}

fn kmp_delta(needle: &[char], fail: &[usize], absorbing: bool, state: usize, c: char) -> usize {
    let m = needle.len();
    let mut s = state;
    if s == m {
        if absorbing {
            return m;
        }
        s = fail[m];
    }
    loop {
        if needle[s] == c {
            return s + 1;
        }
        if s == 0 {
            return 0;
        }
        s = fail[s];
    }
}

/// Possible needle-automaton states at each node. The full-match state is
/// absorbing when looking for "contains", non-absorbing for "ends with".
pub struct KmpPass<'a> {
    needle: &'a [char],
    fail: Vec<usize>,
    absorbing: bool,
    seed: BTreeSet<usize>,
    /// States possible at accepting nodes.
    pub accepted: BTreeSet<usize>,
    /// States carried around `Repeat` back-edges.
    pub feedback: BTreeSet<usize>,
}

impl<'a> KmpPass<'a> {
    fn new(needle: &'a [char], absorbing: bool, seed: BTreeSet<usize>) -> Self {
        Self {
            needle,
            fail: kmp_failure(needle),
            absorbing,
            seed,
            accepted: BTreeSet::new(),
            feedback: BTreeSet::new(),
        }
    }
}

impl ForwardPass for KmpPass<'_> {
    type Value = BTreeSet<usize>;

    fn start(&self) -> BTreeSet<usize> {
        self.seed.clone()
    }

    fn merge(&self, a: &BTreeSet<usize>, b: &BTreeSet<usize>) -> BTreeSet<usize> {
        a.union(b).copied().collect()
    }

    fn step(&mut self, _node: &NodeRef, value: &BTreeSet<usize>, edge: char) -> BTreeSet<usize> {
        value
            .iter()
            .map(|s| kmp_delta(self.needle, &self.fail, self.absorbing, *s, edge))
            .collect()
    }

    fn repeat_edge(&mut self, _node: &NodeRef, value: &BTreeSet<usize>, edge: char) {
        for s in value {
            self.feedback
                .insert(kmp_delta(self.needle, &self.fail, self.absorbing, *s, edge));
        }
    }

    fn finish(&mut self, node: &NodeRef, value: &BTreeSet<usize>) {
        if node.accepting() {
            self.accepted.extend(value.iter().copied());
        }
    }
}

/// Automaton states possible at accepting nodes, iterating the pass until
/// the states fed back over `Repeat` edges stabilize (they are drawn from
/// a set of `|needle| + 1` states, so the loop is bounded).
pub fn kmp_accepting_states(root: &NodeRef, needle: &[char], absorbing: bool) -> BTreeSet<usize> {
    let mut seed: BTreeSet<usize> = BTreeSet::from([0]);
    loop {
        let mut pass = KmpPass::new(needle, absorbing, seed.clone());
        run(root, &mut pass);
        let mut grown = seed.clone();
        grown.extend(pass.feedback.iter().copied());
        if grown == seed {
            return pass.accepted;
        }
        seed = grown;
    }
}

/// Match-position pass: automaton states paired with the depth interval at
/// which they may occur; completed matches record their start offsets.
struct IndexPass<'a> {
    needle: &'a [char],
    fail: Vec<usize>,
    seed: BTreeMap<usize, Interval>,
    matches: Interval,
    feedback: BTreeMap<usize, Interval>,
}

impl<'a> IndexPass<'a> {
    fn new(needle: &'a [char], seed: BTreeMap<usize, Interval>) -> Self {
        Self {
            needle,
            fail: kmp_failure(needle),
            seed,
            matches: Interval::bottom(),
            feedback: BTreeMap::new(),
        }
    }

    fn advance(&mut self, states: &BTreeMap<usize, Interval>, c: char, looped: bool) -> BTreeMap<usize, Interval> {
        let m = self.needle.len();
        let mut out: BTreeMap<usize, Interval> = BTreeMap::new();
        for (s, iv) in states {
            let s2 = kmp_delta(self.needle, &self.fail, false, *s, c);
            let mut iv2 = iv.shift(1);
            if looped {
                iv2.high = Bound::PosInf;
            }
            if s2 == m {
                self.matches = self.matches.join(&iv2.shift(-(m as i64)));
            }
            let merged = match out.get(&s2) {
                Some(old) => old.join(&iv2),
                None => iv2,
            };
            out.insert(s2, merged);
        }
        out
    }
}

impl ForwardPass for IndexPass<'_> {
    type Value = BTreeMap<usize, Interval>;

    fn start(&self) -> Self::Value {
        self.seed.clone()
    }

    fn merge(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        let mut out = a.clone();
        for (s, iv) in b {
            let merged = match out.get(s) {
                Some(old) => old.join(iv),
                None => *iv,
            };
            out.insert(*s, merged);
        }
        out
    }

    fn step(&mut self, _node: &NodeRef, value: &Self::Value, edge: char) -> Self::Value {
        self.advance(value, edge, false)
    }

    fn repeat_edge(&mut self, _node: &NodeRef, value: &Self::Value, edge: char) {
        let fed = self.advance(value, edge, true);
        for (s, iv) in fed {
            let merged = match self.feedback.get(&s) {
                Some(old) => old.join(&iv),
                None => iv,
            };
            self.feedback.insert(s, merged);
        }
    }
}

/// Interval of offsets at which an occurrence of `needle` may start, over
/// all strings of the tree; empty when no string can contain it.
pub fn match_positions(root: &NodeRef, needle: &[char]) -> Interval {
    assert!(!needle.is_empty(), "match_positions requires a non-empty needle");
    let mut seed: BTreeMap<usize, Interval> = BTreeMap::new();
    seed.insert(0, Interval::constant(0));
    let mut rounds = 0;
    loop {
        let mut pass = IndexPass::new(needle, seed.clone());
        run(root, &mut pass);
        let mut grown = seed.clone();
        let mut changed = false;
        for (s, iv) in &pass.feedback {
            let merged = match grown.get(s) {
                Some(old) => old.join(iv),
                None => *iv,
            };
            if grown.get(s) != Some(&merged) {
                grown.insert(*s, merged);
                changed = true;
            }
        }
        if !changed {
            return pass.matches;
        }
        rounds += 1;
        if rounds > needle.len() + 2 {
            // Give up on precision: any fed-back state at any offset.
            for iv in grown.values_mut() {
                *iv = Interval::at_least(0);
            }
            let mut pass = IndexPass::new(needle, grown);
            run(root, &mut pass);
            return pass.matches;
        }
        seed = grown;
    }
}
