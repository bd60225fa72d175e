//! Per-operation hash-consing of trie nodes.
//!
//! Every operation owns one [`Sharing`] table for its lifetime and routes
//! every freshly built inner node through [`Sharing::share`]. Structurally
//! equal subtrees then collapse to a single allocation, so the rest of the
//! engine can use pointer identity as a cheap "did this subtree change"
//! check. The table is dropped with the operation; there is no process-wide
//! canonicalization state.

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use log::debug;

use crate::interval::{Bound, CharInterval};
use crate::node::{Inner, Node, NodeRef};

#[derive(Default)]
pub struct Sharing {
    table: HashSet<NodeRef>,
}

impl Sharing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of canonical nodes interned so far.
    pub fn size(&self) -> usize {
        self.table.len()
    }

    /// Return the canonical representative of `inner`, interning it if no
    /// structurally equal node exists yet. `Repeat` never needs sharing.
    pub fn share(&mut self, inner: Inner) -> NodeRef {
        let node: NodeRef = Rc::new(Node::Inner(inner));
        if let Some(existing) = self.table.get(&node) {
            debug!("share: hit for hash {:#x}", node.structural_hash());
            return existing.clone();
        }
        self.table.insert(node.clone());
        node
    }

    /// Leaf node: the empty language (`accepting = false`) or the language
    /// containing only the empty string (`accepting = true`).
    pub fn leaf(&mut self, accepting: bool) -> NodeRef {
        self.share(Inner::new(accepting, BTreeMap::new()))
    }

    /// Chain of nodes denoting exactly the string `s`.
    pub fn constant(&mut self, s: &str) -> NodeRef {
        let mut node = self.leaf(true);
        for c in s.chars().rev() {
            let mut children = BTreeMap::new();
            children.insert(c, node);
            node = self.share(Inner::new(false, children));
        }
        node
    }

    /// All one-character strings over the given range.
    pub fn chars(&mut self, range: CharInterval) -> NodeRef {
        let end = self.leaf(true);
        let mut children = BTreeMap::new();
        for c in range.iter() {
            children.insert(c, end.clone());
        }
        self.share(Inner::new(false, children))
    }

    /// Runs of the padding character `c` with a count between `min` and
    /// `max`. An unbounded `max` degrades to "any number of pads" (the
    /// single-node loop `{c*}!`): once concatenated into a bigger tree its
    /// `Repeat` re-targets the final root anyway, so a lower bound cannot
    /// be kept there.
    pub fn pad_chain(&mut self, c: char, min: u64, max: Bound) -> NodeRef {
        match max {
            Bound::Finite(h) => {
                let h = h.max(0) as u64;
                let mut node = self.leaf(true);
                let mut i = h;
                while i > 0 {
                    i -= 1;
                    let mut children = BTreeMap::new();
                    children.insert(c, node);
                    node = self.share(Inner::new(i >= min, children));
                }
                node
            }
            _ => {
                let mut children = BTreeMap::new();
                children.insert(c, Node::repeat());
                self.share(Inner::new(true, children))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::as_constant;
    use crate::text::to_text;

    #[test]
    fn test_sharing_collapses_equal_subtrees() {
        let mut sh = Sharing::new();
        let a = sh.constant("ab");
        let b = sh.constant("ab");
        assert!(Rc::ptr_eq(&a, &b));

        // Shared suffix: "xb" and "ab" end in the same "b" subtree.
        let c = sh.constant("xb");
        let sub_b = a.children().get(&'a').unwrap();
        let sub_b2 = c.children().get(&'x').unwrap();
        assert!(Rc::ptr_eq(sub_b, sub_b2));
    }

    #[test]
    fn test_constant_builder() {
        let mut sh = Sharing::new();
        let t = sh.constant("const");
        assert_eq!(as_constant(&t).as_deref(), Some("const"));
        assert_eq!(to_text(&t), "{c{o{n{s{t{}!}.}.}.}.}.");
    }

    #[test]
    fn test_chars_builder() {
        let mut sh = Sharing::new();
        let t = sh.chars(CharInterval::new('a', 'c'));
        assert_eq!(to_text(&t), "{a{}!b{}!c{}!}.");
    }

    #[test]
    fn test_pad_chain_bounded() {
        let mut sh = Sharing::new();
        // 1 to 2 pads: "p" and "pp", not "".
        let t = sh.pad_chain('p', 1, Bound::Finite(2));
        assert_eq!(to_text(&t), "{p{p{}!}!}.");
    }

    #[test]
    fn test_pad_chain_unbounded() {
        let mut sh = Sharing::new();
        let t = sh.pad_chain('p', 0, Bound::PosInf);
        assert_eq!(to_text(&t), "{p*}!");
    }
}
