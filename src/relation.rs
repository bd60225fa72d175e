//! Generic pairwise fixpoint over two rooted tries.
//!
//! A [`PairSolver`] drains a worklist of node pairs, one from each operand.
//! [`PairSolver::request`] resolves a `Repeat` operand to that side's own
//! root before deduplication, so the frontier only ever holds pairs of
//! inner nodes and the pair set is bounded by |left| x |right| — that bound
//! is the termination argument for every relation below.
//!
//! The per-pair transition rule is supplied through [`Relation`]: returning
//! `false` from [`Relation::next`] short-circuits the whole solve.
//! Instantiations: language inclusion ([`includes`]), equality ([`equal`]),
//! lexicographic comparison ([`can_be_less`], [`can_be_less_equal`]), and
//! intersection ([`meet`], which records matched structure while solving
//! and rebuilds the result tree in a second pass).

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use log::debug;

use crate::merger::Merger;
use crate::node::{addr, language_nonempty, Inner, Node, NodeRef};
use crate::transform::prune;

type PairKey = (usize, usize);

pub struct PairSolver {
    left_root: NodeRef,
    right_root: NodeRef,
    queue: VecDeque<(NodeRef, NodeRef)>,
    seen: HashSet<PairKey>,
}

/// Per-pair transition rule driven by [`PairSolver::solve`].
pub trait Relation {
    /// Seed the worklist. The default schedules the root pair.
    fn init(&mut self, solver: &mut PairSolver) {
        solver.seed();
    }

    /// Examine one dequeued pair of inner nodes. Request follow-up pairs
    /// through the solver; return `false` to fail the whole relation.
    fn next(&mut self, solver: &mut PairSolver, left: &NodeRef, right: &NodeRef) -> bool;
}

impl PairSolver {
    pub fn new(left_root: &NodeRef, right_root: &NodeRef) -> Self {
        assert!(
            !left_root.is_repeat() && !right_root.is_repeat(),
            "relation operands must be rooted at inner nodes"
        );
        Self {
            left_root: left_root.clone(),
            right_root: right_root.clone(),
            queue: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Schedule the root pair.
    pub fn seed(&mut self) {
        let (l, r) = (self.left_root.clone(), self.right_root.clone());
        self.request(&l, &r);
    }

    /// Resolve `Repeat` operands to their side's root, then enqueue the
    /// pair unless it was already visited. Returns the resolved pair.
    pub fn request(&mut self, left: &NodeRef, right: &NodeRef) -> (NodeRef, NodeRef) {
        let l = if left.is_repeat() {
            self.left_root.clone()
        } else {
            left.clone()
        };
        let r = if right.is_repeat() {
            self.right_root.clone()
        } else {
            right.clone()
        };
        if self.seen.insert((addr(&l), addr(&r))) {
            debug!("request: scheduling pair ({:#x}, {:#x})", addr(&l), addr(&r));
            self.queue.push_back((l.clone(), r.clone()));
        }
        (l, r)
    }

    /// Drain the worklist; `false` as soon as the rule fails a pair.
    pub fn solve(&mut self, rule: &mut impl Relation) -> bool {
        rule.init(self);
        while let Some((l, r)) = self.queue.pop_front() {
            if !rule.next(self, &l, &r) {
                return false;
            }
        }
        true
    }
}

/// Preorder rule: every left continuation must exist on the right.
struct Preorder;

impl Relation for Preorder {
    fn next(&mut self, solver: &mut PairSolver, left: &NodeRef, right: &NodeRef) -> bool {
        let (li, ri) = (left.inner(), right.inner());
        if li.accepting() && !ri.accepting() {
            return false;
        }
        for (c, lc) in li.children() {
            match ri.children().get(c) {
                None => return false,
                Some(rc) => {
                    solver.request(lc, rc);
                }
            }
        }
        true
    }
}

/// `L(left) ⊆ L(right)` (the lattice order of the domain).
pub fn includes(left: &NodeRef, right: &NodeRef) -> bool {
    PairSolver::new(left, right).solve(&mut Preorder)
}

/// Bisimulation rule: fails on the first distinguishable pair.
struct Refute;

impl Relation for Refute {
    fn next(&mut self, solver: &mut PairSolver, left: &NodeRef, right: &NodeRef) -> bool {
        let (li, ri) = (left.inner(), right.inner());
        if li.accepting() != ri.accepting() {
            return false;
        }
        if li.children().len() != ri.children().len() {
            return false;
        }
        for (c, lc) in li.children() {
            match ri.children().get(c) {
                None => return false,
                Some(rc) => {
                    solver.request(lc, rc);
                }
            }
        }
        true
    }
}

/// Language equality: the refutation rule found no distinguishing pair.
pub fn equal(left: &NodeRef, right: &NodeRef) -> bool {
    PairSolver::new(left, right).solve(&mut Refute)
}

/// Existential lexicographic comparison: is there `s` in the left language
/// and `t` in the right one with `s < t` (or `s <= t`)?
struct Lexicographic {
    left_root: NodeRef,
    right_root: NodeRef,
    or_equal: bool,
    found: bool,
}

impl Lexicographic {
    fn nonempty(&self, node: &NodeRef, left: bool) -> bool {
        let root = if left { &self.left_root } else { &self.right_root };
        language_nonempty(node, root)
    }
}

impl Relation for Lexicographic {
    fn next(&mut self, solver: &mut PairSolver, left: &NodeRef, right: &NodeRef) -> bool {
        let (li, ri) = (left.inner(), right.inner());

        // The consumed prefixes are equal here. A left end makes the left
        // string a prefix of anything the right side still produces.
        if li.accepting() {
            let strictly_longer = ri
                .children()
                .iter()
                .any(|(_, rc)| self.nonempty(rc, false));
            if strictly_longer || (self.or_equal && ri.accepting()) {
                self.found = true;
                return false;
            }
        }

        // Diverging characters decide the order immediately.
        let min_left = li
            .children()
            .iter()
            .find(|(_, lc)| self.nonempty(lc, true))
            .map(|(c, _)| *c);
        let max_right = ri
            .children()
            .iter()
            .rev()
            .find(|(_, rc)| self.nonempty(rc, false))
            .map(|(c, _)| *c);
        if let (Some(a), Some(b)) = (min_left, max_right) {
            if a < b {
                self.found = true;
                return false;
            }
        }

        // Otherwise the order can only be decided deeper, along equal
        // characters.
        for (c, lc) in li.children() {
            if let Some(rc) = ri.children().get(c) {
                solver.request(lc, rc);
            }
        }
        true
    }
}

fn lexicographic(left: &NodeRef, right: &NodeRef, or_equal: bool) -> bool {
    let mut rule = Lexicographic {
        left_root: left.clone(),
        right_root: right.clone(),
        or_equal,
        found: false,
    };
    let mut solver = PairSolver::new(left, right);
    solver.solve(&mut rule);
    rule.found
}

/// Can some left string be strictly below some right string?
pub fn can_be_less(left: &NodeRef, right: &NodeRef) -> bool {
    lexicographic(left, right, false)
}

/// Can some left string be below or equal to some right string?
pub fn can_be_less_equal(left: &NodeRef, right: &NodeRef) -> bool {
    lexicographic(left, right, true)
}

/// Records which pairs are doubly accepting and which edges exist on both
/// sides, for the rebuild pass.
struct MeetRecorder {
    accepting: HashSet<PairKey>,
    edges: HashMap<PairKey, BTreeMap<char, (NodeRef, NodeRef)>>,
}

impl Relation for MeetRecorder {
    fn next(&mut self, solver: &mut PairSolver, left: &NodeRef, right: &NodeRef) -> bool {
        let key = (addr(left), addr(right));
        let (li, ri) = (left.inner(), right.inner());
        if li.accepting() && ri.accepting() {
            self.accepting.insert(key);
        }
        let mut common = BTreeMap::new();
        for (c, lc) in li.children() {
            if let Some(rc) = ri.children().get(c) {
                let resolved = solver.request(lc, rc);
                common.insert(*c, resolved);
            }
        }
        self.edges.insert(key, common);
        true
    }
}

/// Intersection of two rooted tries. The pair graph recorded while solving
/// is rebuilt into one tree; pairs revisited through `Repeat` resolution
/// become back-edges, and any non-root pair targeted by a back-edge is cut
/// off into the merger so the final root over-approximates its content.
/// Unreachable (dead) branches are pruned from the result.
pub fn meet(left: &NodeRef, right: &NodeRef) -> NodeRef {
    let mut recorder = MeetRecorder {
        accepting: HashSet::new(),
        edges: HashMap::new(),
    };
    let mut solver = PairSolver::new(left, right);
    let solved = solver.solve(&mut recorder);
    assert!(solved, "meet recording never fails a pair");

    let mut merger = Merger::new();
    let root = rebuild(&recorder, (addr(left), addr(right)), &mut merger);
    merger.cutoff(&root);
    let built = merger.build();
    prune(&mut merger, &built)
}

enum Rebuilt {
    Open,
    Done(NodeRef),
}

fn rebuild(recorder: &MeetRecorder, root_key: PairKey, merger: &mut Merger) -> NodeRef {
    enum Frame {
        Enter(PairKey),
        Exit(PairKey),
    }

    let mut state: HashMap<PairKey, Rebuilt> = HashMap::new();
    let mut looped: HashSet<PairKey> = HashSet::new();
    let mut stack = vec![Frame::Enter(root_key)];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(key) => {
                if state.contains_key(&key) {
                    continue;
                }
                state.insert(key, Rebuilt::Open);
                stack.push(Frame::Exit(key));
                for (l, r) in recorder.edges[&key].values() {
                    let child = (addr(l), addr(r));
                    if !state.contains_key(&child) {
                        stack.push(Frame::Enter(child));
                    }
                }
            }
            Frame::Exit(key) => {
                let mut children = BTreeMap::new();
                for (c, (l, r)) in &recorder.edges[&key] {
                    let child = (addr(l), addr(r));
                    match &state[&child] {
                        Rebuilt::Done(node) => {
                            children.insert(*c, node.clone());
                        }
                        Rebuilt::Open => {
                            // Back-edge: the child is an ancestor pair.
                            children.insert(*c, Node::repeat());
                            looped.insert(child);
                        }
                    }
                }
                let node = merger.share(Inner::new(recorder.accepting.contains(&key), children));
                if looped.contains(&key) && key != root_key {
                    merger.cutoff(&node);
                }
                state.insert(key, Rebuilt::Done(node));
            }
        }
    }

    match &state[&root_key] {
        Rebuilt::Done(node) => node.clone(),
        Rebuilt::Open => unreachable!("meet rebuild left the root open"),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::share::Sharing;
    use crate::text::{parse, to_text};

    fn t(sharing: &mut Sharing, s: &str) -> NodeRef {
        parse(s, sharing).unwrap()
    }

    #[test]
    fn test_includes() {
        let mut sh = Sharing::new();
        let a = t(&mut sh, "{a*}!");
        let ab = t(&mut sh, "{a*b*}!");
        assert!(includes(&a, &ab));
        assert!(!includes(&ab, &a));
        assert!(includes(&a, &a));

        let bottom = sh.leaf(false);
        assert!(includes(&bottom, &a));
        assert!(!includes(&a, &bottom));
    }

    #[test]
    fn test_includes_constant_in_loop() {
        let mut sh = Sharing::new();
        let aa = t(&mut sh, "{a{a{}!}.}.");
        let astar = t(&mut sh, "{a*}!");
        assert!(includes(&aa, &astar));
        assert!(!includes(&astar, &aa));
    }

    #[test]
    fn test_equal() {
        let mut sh = Sharing::new();
        let a1 = t(&mut sh, "{a*b*}!");
        let mut sh2 = Sharing::new();
        let a2 = t(&mut sh2, "{a*b*}!");
        assert!(equal(&a1, &a2));
        let b = t(&mut sh, "{a*}!");
        assert!(!equal(&a1, &b));
    }

    #[test]
    fn test_meet_idempotent() {
        let mut sh = Sharing::new();
        let a = t(&mut sh, "{a{b{}!}.b{}!}!");
        let m = meet(&a, &a);
        assert!(equal(&m, &a));
    }

    #[test]
    fn test_meet_of_loops() {
        let mut sh = Sharing::new();
        let ab = t(&mut sh, "{a*b*}!");
        let bc = t(&mut sh, "{b*c*}!");
        let m = meet(&ab, &bc);
        assert_eq!(to_text(&m), "{b*}!");
    }

    #[test]
    fn test_meet_disjoint() {
        let mut sh = Sharing::new();
        let a = t(&mut sh, "{a{b{}!}.}.");
        let b = t(&mut sh, "{a{c{}!}.}.");
        let m = meet(&a, &b);
        assert_eq!(to_text(&m), "{}.");
    }

    #[test]
    fn test_lexicographic() {
        let mut sh = Sharing::new();
        let ab = sh.constant("ab");
        let ac = sh.constant("ac");
        assert!(can_be_less(&ab, &ac));
        assert!(!can_be_less(&ac, &ab));
        assert!(can_be_less_equal(&ab, &ab));
        assert!(!can_be_less(&ab, &ab));

        // "a" is a strict prefix of "ab".
        let a = sh.constant("a");
        assert!(can_be_less(&a, &ab));
        assert!(!can_be_less(&ab, &a));
    }

    #[test]
    fn test_lexicographic_sets() {
        let mut sh = Sharing::new();
        // {ab, b} vs {ba}: "ab" < "ba" but also "b" > "ba"? No: "b" < "ba".
        let left = t(&mut sh, "{a{b{}!}.b{}!}.");
        let right = t(&mut sh, "{b{a{}!}.}.");
        assert!(can_be_less(&left, &right));
        assert!(!can_be_less(&right, &left));
    }
}
