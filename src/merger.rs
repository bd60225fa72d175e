//! Combining and cutting subtrees.
//!
//! The merger accumulates "roots to merge" and folds them into one inner
//! root. Transducers call [`Merger::cutoff`] to bound growth: the subtree is
//! replaced by a `Repeat` back-edge on the spot and its content is
//! reconciled into the shared root by the final [`Merger::build`].
//!
//! Three merge policies are provided:
//!
//! - [`Merger::merge`] — exact union-shaped merge. A `Repeat` operand
//!   absorbs the finite side (a back-edge already stands for unbounded
//!   content), which is itself cut off for later reconciliation.
//! - [`Merger::underapproximating_merge`] — never denotes more than the
//!   union: on a `Repeat`/`Inner` conflict the inner side is discarded.
//! - [`Merger::widening_merge`] — guarantees a fixpoint across repeated
//!   calls: structure the new operand would add (a fresh child character,
//!   a newly accepting node) is cut off instead of grown, so the node
//!   count never increases from one widening iteration to the next.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;

use crate::node::{addr, Inner, Node, NodeRef};
use crate::share::Sharing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    Exact,
    Under,
    Widen,
}

#[derive(Default)]
pub struct Merger {
    sharing: Sharing,
    pending: Vec<NodeRef>,
}

enum Frame {
    Enter(NodeRef, NodeRef),
    Exit(NodeRef, NodeRef),
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sharing(&mut self) -> &mut Sharing {
        &mut self.sharing
    }

    pub fn share(&mut self, inner: Inner) -> NodeRef {
        self.sharing.share(inner)
    }

    /// Number of roots waiting to be folded by [`Merger::build`].
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Replace `node` by a back-edge, queueing its content for the final
    /// fold. A `Repeat` is returned as-is.
    pub fn cutoff(&mut self, node: &NodeRef) -> NodeRef {
        if node.is_repeat() {
            return Node::repeat();
        }
        debug!("cutoff: deferring node {:#x}", node.structural_hash());
        self.pending.push(node.clone());
        Node::repeat()
    }

    /// Exact merge: the result denotes the union of both languages, with
    /// `Repeat` absorbing (and cutting off) a finite counterpart.
    pub fn merge(&mut self, a: &NodeRef, b: &NodeRef) -> NodeRef {
        self.merge_with(Policy::Exact, a, b)
    }

    /// Merge that never exceeds the union: an `Inner` meeting a `Repeat`
    /// is dropped rather than folded into the root.
    pub fn underapproximating_merge(&mut self, a: &NodeRef, b: &NodeRef) -> NodeRef {
        self.merge_with(Policy::Under, a, b)
    }

    /// Terminating merge of `old` with `new`: anything `new` would add to
    /// the shape of `old` is cut off instead of grown.
    pub fn widening_merge(&mut self, old: &NodeRef, new: &NodeRef) -> NodeRef {
        self.merge_with(Policy::Widen, old, new)
    }

    /// Fold all pending roots, last queued first, into one inner root.
    /// Panics when nothing is pending: a transducer must have produced at
    /// least one root before building.
    pub fn build(&mut self) -> NodeRef {
        let mut current = self
            .pending
            .pop()
            .expect("merger: build() called with no pending roots");
        while let Some(next) = self.pending.pop() {
            current = self.merge(&next, &current);
        }
        assert!(!current.is_repeat(), "merger: built root must be inner");
        current
    }

    fn merge_with(&mut self, policy: Policy, a: &NodeRef, b: &NodeRef) -> NodeRef {
        let mut memo: HashMap<(usize, usize), NodeRef> = HashMap::new();
        let mut open: HashSet<(usize, usize)> = HashSet::new();
        let mut stack = vec![Frame::Enter(a.clone(), b.clone())];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(x, y) => {
                    let key = (addr(&x), addr(&y));
                    if memo.contains_key(&key) || !open.insert(key) {
                        continue;
                    }
                    match (x.is_repeat(), y.is_repeat()) {
                        (true, true) => {
                            memo.insert(key, Node::repeat());
                        }
                        (true, false) => {
                            let r = match policy {
                                Policy::Under => Node::repeat(),
                                _ => self.cutoff(&y),
                            };
                            memo.insert(key, r);
                        }
                        (false, true) => {
                            let r = match policy {
                                Policy::Under => Node::repeat(),
                                _ => self.cutoff(&x),
                            };
                            memo.insert(key, r);
                        }
                        (false, false) => {
                            if policy == Policy::Widen && Self::widening_cut(&x, &y) {
                                debug!("widening: cutting off grown pair");
                                self.cutoff(&x);
                                self.cutoff(&y);
                                memo.insert(key, Node::repeat());
                                continue;
                            }
                            stack.push(Frame::Exit(x.clone(), y.clone()));
                            for (c, cx) in x.children() {
                                if let Some(cy) = y.children().get(c) {
                                    stack.push(Frame::Enter(cx.clone(), cy.clone()));
                                }
                            }
                        }
                    }
                }
                Frame::Exit(x, y) => {
                    let key = (addr(&x), addr(&y));
                    let (xi, yi) = (x.inner(), y.inner());
                    let mut children: BTreeMap<char, NodeRef> = BTreeMap::new();
                    for (c, cx) in xi.children() {
                        let merged = match yi.children().get(c) {
                            Some(cy) => memo
                                .get(&(addr(cx), addr(cy)))
                                .expect("merger: child pair not merged yet")
                                .clone(),
                            None => cx.clone(),
                        };
                        children.insert(*c, merged);
                    }
                    if policy != Policy::Widen {
                        for (c, cy) in yi.children() {
                            if !xi.children().contains_key(c) {
                                children.insert(*c, cy.clone());
                            }
                        }
                    }
                    let accepting = match policy {
                        Policy::Widen => xi.accepting(),
                        _ => xi.accepting() || yi.accepting(),
                    };
                    let node = self.share(Inner::new(accepting, children));
                    memo.insert(key, node);
                }
            }
        }

        memo[&(addr(a), addr(b))].clone()
    }

    /// Would merging `new` into `old` grow the structure?
    fn widening_cut(old: &NodeRef, new: &NodeRef) -> bool {
        let (oi, ni) = (old.inner(), new.inner());
        if ni.accepting() && !oi.accepting() {
            return true;
        }
        ni.children().keys().any(|c| !oi.children().contains_key(c))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::text::{parse, to_text};

    fn roundtrip(m: &mut Merger, s: &str) -> NodeRef {
        parse(s, m.sharing()).unwrap()
    }

    #[test]
    fn test_exact_merge_constants() {
        let mut m = Merger::new();
        let a = m.sharing().constant("ab");
        let b = m.sharing().constant("ac");
        let joined = m.merge(&a, &b);
        assert_eq!(to_text(&joined), "{a{b{}!c{}!}.}.");
    }

    #[test]
    fn test_exact_merge_absorbs_into_loop() {
        let mut m = Merger::new();
        let loopy = roundtrip(&mut m, "{a*}!");
        let plain = roundtrip(&mut m, "{b*}!");
        m.cutoff(&loopy);
        m.cutoff(&plain);
        let joined = m.build();
        assert_eq!(to_text(&joined), "{a*b*}!");
    }

    #[test]
    fn test_underapproximating_merge_drops_inner() {
        let mut m = Merger::new();
        let a = roundtrip(&mut m, "{a*}!");
        let b = roundtrip(&mut m, "{a{b{}!}.}!");
        // Exact merge would fold "{b}" into the loop; the
        // underapproximation must not.
        let merged = m.underapproximating_merge(&a, &b);
        assert_eq!(to_text(&merged), "{a*}!");
        assert_eq!(m.pending(), 0);
    }

    #[test]
    fn test_widening_cuts_new_children() {
        let mut m = Merger::new();
        let old = roundtrip(&mut m, "{a{}!}.");
        let new = roundtrip(&mut m, "{a{a{}!}.}.");
        let w = m.widening_merge(&old, &new);
        m.cutoff(&w);
        let out = m.build();
        // The grown tail is folded into the root: any number of "a"s.
        assert_eq!(to_text(&out), "{a*}!");
    }

    #[test]
    fn test_widening_reaches_fixpoint() {
        // Iterate widening over a growing chain of "a"s; the shape must
        // stabilize in a few steps regardless of chain length.
        let mut m = Merger::new();
        let mut current = m.sharing().constant("a");
        let mut last = to_text(&current);
        let mut stable_at = None;
        for k in 2..20 {
            let s = "a".repeat(k);
            let next = m.sharing().constant(&s);
            let grown = m.merge(&current, &next);
            let widened = m.widening_merge(&current, &grown);
            m.cutoff(&widened);
            current = m.build();
            let text = to_text(&current);
            if text == last {
                stable_at = Some(k);
                break;
            }
            last = text;
        }
        assert!(stable_at.is_some(), "widening did not stabilize");
        assert!(stable_at.unwrap() <= 5);
    }

    #[test]
    #[should_panic(expected = "no pending roots")]
    fn test_build_requires_pending() {
        Merger::new().build();
    }
}
