//! The node model of a compressed cyclic trie.
//!
//! A trie is a finite DAG of [`Inner`] nodes. Each inner node carries an
//! `accepting` flag (the empty continuation belongs to the language at this
//! point) and a sorted per-character child map. The only way to encode
//! repetition is the [`Node::Repeat`] sentinel: a leaf that every traversal
//! resolves to the *root of that traversal*. Ignoring `Repeat` edges the
//! structure is always acyclic, which is what makes structural equality,
//! hashing, and every worklist below terminate.
//!
//! Nodes are immutable once built and are handed around as [`NodeRef`]
//! (`Rc<Node>`). After a pass through the per-operation sharing table
//! (see [`crate::share`]), structurally equal subtrees are the same
//! allocation, so pointer equality implies structural equality.

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use crate::utils::mix2;

/// Shared handle to an immutable node.
pub type NodeRef = Rc<Node>;

const REPEAT_HASH: u64 = 0x9E37_79B9_7F4A_7C15;

/// Branching node: accepting flag plus per-character children.
#[derive(Debug, Clone)]
pub struct Inner {
    accepting: bool,
    children: BTreeMap<char, NodeRef>,
    hash: u64,
}

impl Inner {
    /// Build an inner node. The children are expected to be canonical
    /// already (fresh nodes go through [`crate::share::Sharing::share`]).
    pub fn new(accepting: bool, children: BTreeMap<char, NodeRef>) -> Self {
        // chi = sum over edges of char * child hash, order-independent.
        let mut chi: u64 = 0;
        for (c, child) in &children {
            chi = chi.wrapping_add((*c as u64).wrapping_mul(child.structural_hash()));
        }
        let hash = mix2(accepting as u64 + 1, chi);
        Self {
            accepting,
            children,
            hash,
        }
    }

    pub fn accepting(&self) -> bool {
        self.accepting
    }

    pub fn children(&self) -> &BTreeMap<char, NodeRef> {
        &self.children
    }
}

/// A trie node: a branching point or the loop-back sentinel.
#[derive(Debug, Clone)]
pub enum Node {
    /// "Continue matching from the root of the current traversal."
    Repeat,
    Inner(Inner),
}

thread_local! {
    static REPEAT: NodeRef = Rc::new(Node::Repeat);
}

impl Node {
    /// The `Repeat` sentinel (one shared allocation per thread).
    pub fn repeat() -> NodeRef {
        REPEAT.with(|r| r.clone())
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self, Node::Repeat)
    }

    /// The inner payload. Panics on `Repeat`: callers that reach this in a
    /// `Repeat` position have already broken the rooted-tree invariant.
    pub fn inner(&self) -> &Inner {
        match self {
            Node::Inner(inner) => inner,
            Node::Repeat => panic!("expected an inner node, found Repeat"),
        }
    }

    pub fn accepting(&self) -> bool {
        self.inner().accepting
    }

    pub fn children(&self) -> &BTreeMap<char, NodeRef> {
        &self.inner().children
    }

    pub fn structural_hash(&self) -> u64 {
        match self {
            Node::Repeat => REPEAT_HASH,
            Node::Inner(inner) => inner.hash,
        }
    }
}

impl PartialEq for Node {
    /// Structural equality with `Repeat` treated as an opaque leaf, driven
    /// by an explicit worklist: a deep unshared chain must not recurse
    /// once per node. Terminates because inner nodes form a finite DAG.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Repeat, Node::Repeat) => true,
            (Node::Inner(a), Node::Inner(b)) => {
                let mut stack = vec![(a, b)];
                while let Some((a, b)) = stack.pop() {
                    if a.hash != b.hash
                        || a.accepting != b.accepting
                        || a.children.len() != b.children.len()
                    {
                        return false;
                    }
                    for ((ca, na), (cb, nb)) in a.children.iter().zip(b.children.iter()) {
                        if ca != cb {
                            return false;
                        }
                        if Rc::ptr_eq(na, nb) {
                            continue;
                        }
                        match (na.as_ref(), nb.as_ref()) {
                            (Node::Repeat, Node::Repeat) => {}
                            (Node::Inner(ia), Node::Inner(ib)) => stack.push((ia, ib)),
                            _ => return false,
                        }
                    }
                }
                true
            }
            _ => false,
        }
    }
}

impl Eq for Node {}

impl Drop for Node {
    /// Children are detached and released through an explicit stack; the
    /// default drop glue would recurse once per node of a deep chain.
    fn drop(&mut self) {
        if let Node::Inner(inner) = self {
            let mut stack: Vec<NodeRef> =
                std::mem::take(&mut inner.children).into_values().collect();
            while let Some(child) = stack.pop() {
                if let Ok(mut node) = Rc::try_unwrap(child) {
                    if let Node::Inner(i) = &mut node {
                        stack.extend(std::mem::take(&mut i.children).into_values());
                    }
                }
            }
        }
    }
}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

/// Stable identity of a node allocation, used as a cache key.
pub fn addr(node: &NodeRef) -> usize {
    Rc::as_ptr(node) as usize
}

/// All inner nodes reachable from `root` through inner edges, preorder.
/// `Repeat` edges are not followed (they lead back to `root` anyway).
pub fn reachable(root: &NodeRef) -> Vec<NodeRef> {
    assert!(!root.is_repeat(), "a rooted tree must start at an inner node");
    let mut seen: HashSet<usize> = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(n) = stack.pop() {
        if !seen.insert(addr(&n)) {
            continue;
        }
        for child in n.children().values().rev() {
            if !child.is_repeat() && !seen.contains(&addr(child)) {
                stack.push(child.clone());
            }
        }
        order.push(n);
    }
    order
}

/// Number of distinct inner nodes reachable from `root`.
pub fn node_count(root: &NodeRef) -> usize {
    reachable(root).len()
}

/// Does any reachable node carry a `Repeat` edge?
pub fn has_repeat_edge(root: &NodeRef) -> bool {
    reachable(root)
        .iter()
        .any(|n| n.children().values().any(|c| c.is_repeat()))
}

/// Is the language denoted from `start` (with `Repeat` resolving to `root`)
/// non-empty, i.e. is some accepting node reachable?
pub fn language_nonempty(start: &NodeRef, root: &NodeRef) -> bool {
    let mut seen: HashSet<usize> = HashSet::new();
    let mut stack = Vec::new();
    let start = if start.is_repeat() { root } else { start };
    stack.push(start.clone());
    while let Some(n) = stack.pop() {
        if !seen.insert(addr(&n)) {
            continue;
        }
        if n.accepting() {
            return true;
        }
        for child in n.children().values() {
            let next = if child.is_repeat() { root } else { child };
            if !seen.contains(&addr(next)) {
                stack.push(next.clone());
            }
        }
    }
    false
}

/// If the tree denotes exactly one string, return it.
pub fn as_constant(root: &NodeRef) -> Option<String> {
    let mut out = String::new();
    let mut cur = root.clone();
    loop {
        if cur.is_repeat() {
            return None;
        }
        let inner = cur.inner();
        match (inner.accepting(), inner.children().len()) {
            (true, 0) => return Some(out),
            (false, 1) => {
                let (c, child) = inner.children().iter().next().unwrap();
                out.push(*c);
                let child = child.clone();
                cur = child;
            }
            _ => return None,
        }
    }
}
