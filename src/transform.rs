//! Tree transducers: structure-preserving rewrites of a rooted trie.
//!
//! A [`Transformer`] rewrites a tree bottom-up with a memo cache keyed by
//! node identity, so shared subtrees are rewritten once, and reuses the
//! original node by reference when nothing changed underneath (pointer
//! equality is meaningful after sharing). `Repeat` nodes pass through
//! untouched. After the walk, the result is cut off into the transducer's
//! [`Merger`] and [`Merger::build`] folds any deferred subtrees back into
//! one finite root — that is what keeps operations like concatenation onto
//! a looping tree from growing without bound.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use log::debug;

use crate::interval::{Bound, CharInterval, Interval};
use crate::merger::Merger;
use crate::node::{addr, has_repeat_edge, reachable, Inner, Node, NodeRef};

/// Per-node rewrite hook. `children` are already rewritten; `changed`
/// tells whether any of them differs from the original by identity.
pub trait Rewrite {
    fn rewrite(
        &mut self,
        merger: &mut Merger,
        original: &NodeRef,
        accepting: bool,
        children: BTreeMap<char, NodeRef>,
        changed: bool,
    ) -> NodeRef;
}

/// Default rebuild: keep the original node when nothing changed, otherwise
/// intern a fresh inner node.
pub fn rebuild(
    merger: &mut Merger,
    original: &NodeRef,
    accepting: bool,
    children: BTreeMap<char, NodeRef>,
    changed: bool,
) -> NodeRef {
    if !changed && accepting == original.accepting() {
        original.clone()
    } else {
        merger.share(Inner::new(accepting, children))
    }
}

pub struct Transformer<R: Rewrite> {
    pub rule: R,
    pub merger: Merger,
    cache: HashMap<usize, NodeRef>,
}

enum Frame {
    Enter(NodeRef),
    Exit(NodeRef),
}

impl<R: Rewrite> Transformer<R> {
    pub fn new(rule: R) -> Self {
        Self {
            rule,
            merger: Merger::new(),
            cache: HashMap::new(),
        }
    }

    /// Rewrite the tree under `root` and fold all cut-off subtrees back
    /// into one root.
    pub fn transform(&mut self, root: &NodeRef) -> NodeRef {
        assert!(!root.is_repeat(), "transform requires a rooted tree");
        let result = self.apply(root);
        self.merger.cutoff(&result);
        self.merger.build()
    }

    fn apply(&mut self, root: &NodeRef) -> NodeRef {
        let mut open: HashSet<usize> = HashSet::new();
        let mut stack = vec![Frame::Enter(root.clone())];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(n) => {
                    let key = addr(&n);
                    if self.cache.contains_key(&key) || !open.insert(key) {
                        continue;
                    }
                    stack.push(Frame::Exit(n.clone()));
                    for child in n.children().values() {
                        if !child.is_repeat() && !self.cache.contains_key(&addr(child)) {
                            stack.push(Frame::Enter(child.clone()));
                        }
                    }
                }
                Frame::Exit(n) => {
                    let inner = n.inner();
                    let mut children = BTreeMap::new();
                    let mut changed = false;
                    for (c, child) in inner.children() {
                        let rewritten = if child.is_repeat() {
                            Node::repeat()
                        } else {
                            self.cache[&addr(child)].clone()
                        };
                        changed |= !Rc::ptr_eq(child, &rewritten);
                        children.insert(*c, rewritten);
                    }
                    debug!("transform: rewriting node {:#x}", n.structural_hash());
                    let result = self.rule.rewrite(
                        &mut self.merger,
                        &n,
                        inner.accepting(),
                        children,
                        changed,
                    );
                    self.cache.insert(addr(&n), result);
                }
            }
        }
        self.cache[&addr(root)].clone()
    }
}

/// Appends a second tree at every accepting node of the first.
pub struct Concat {
    second: NodeRef,
    fold_second: bool,
}

impl Concat {
    /// A looping second tree must also be folded into the final root:
    /// merging copies its `Repeat` edges verbatim, and after the fold they
    /// resolve to a root that covers the loop's own content. Without the
    /// fold the result would lose strings.
    pub fn new(second: NodeRef) -> Self {
        let fold_second = has_repeat_edge(&second);
        Self {
            second,
            fold_second,
        }
    }
}

impl Rewrite for Concat {
    fn rewrite(
        &mut self,
        merger: &mut Merger,
        original: &NodeRef,
        accepting: bool,
        children: BTreeMap<char, NodeRef>,
        changed: bool,
    ) -> NodeRef {
        if accepting {
            if self.fold_second {
                merger.cutoff(&self.second);
                self.fold_second = false;
            }
            let stripped = merger.share(Inner::new(false, children));
            let second = self.second.clone();
            merger.merge(&stripped, &second)
        } else {
            rebuild(merger, original, accepting, children, changed)
        }
    }
}

/// Replaces edge characters inside `from` by every character of `to`.
/// When `from` is not a single character, the replacement is uncertain and
/// the original edges are kept alongside their images.
pub struct ReplaceChars {
    pub from: CharInterval,
    pub to: CharInterval,
}

impl Rewrite for ReplaceChars {
    fn rewrite(
        &mut self,
        merger: &mut Merger,
        original: &NodeRef,
        accepting: bool,
        children: BTreeMap<char, NodeRef>,
        changed: bool,
    ) -> NodeRef {
        if !children.keys().any(|c| self.from.contains(*c)) {
            return rebuild(merger, original, accepting, children, changed);
        }
        let mut out: BTreeMap<char, NodeRef> = BTreeMap::new();
        let add = |merger: &mut Merger, out: &mut BTreeMap<char, NodeRef>, c: char, n: NodeRef| {
            match out.get(&c) {
                Some(existing) => {
                    let merged = merger.merge(existing, &n);
                    out.insert(c, merged);
                }
                None => {
                    out.insert(c, n);
                }
            }
        };
        for (c, child) in children {
            let replaced = self.from.contains(c);
            if !replaced || !self.from.is_singleton() {
                add(merger, &mut out, c, child.clone());
            }
            if replaced {
                for image in self.to.iter() {
                    add(merger, &mut out, image, child.clone());
                }
            }
        }
        merger.share(Inner::new(accepting, out))
    }
}

/// Truncation at lengths within `cut`: a node whose depth may fall in the
/// cut interval becomes accepting; a node certainly at or past its upper
/// end loses its children.
pub struct Truncate {
    pub depths: HashMap<usize, Interval>,
    pub cut: Interval,
}

impl Rewrite for Truncate {
    fn rewrite(
        &mut self,
        merger: &mut Merger,
        original: &NodeRef,
        accepting: bool,
        children: BTreeMap<char, NodeRef>,
        changed: bool,
    ) -> NodeRef {
        let depth = self
            .depths
            .get(&addr(original))
            .copied()
            .unwrap_or_else(Interval::bottom);
        if let Bound::Finite(_) = self.cut.high {
            if !depth.is_empty() && depth.low >= self.cut.high {
                return merger.sharing().leaf(true);
            }
        }
        let may_end = depth.intersects(&self.cut);
        rebuild(merger, original, accepting || may_end, children, changed)
    }
}

/// Drops edges leading to nodes from which no accepting node is reachable.
pub struct Prune {
    live: HashSet<usize>,
    root_live: bool,
}

impl Rewrite for Prune {
    fn rewrite(
        &mut self,
        merger: &mut Merger,
        original: &NodeRef,
        accepting: bool,
        children: BTreeMap<char, NodeRef>,
        changed: bool,
    ) -> NodeRef {
        let originals = original.children();
        let mut kept = BTreeMap::new();
        let mut dropped = false;
        for (c, child) in children {
            let keep = match originals.get(&c) {
                Some(o) if o.is_repeat() => self.root_live,
                Some(o) => self.live.contains(&addr(o)),
                None => unreachable!("prune: rewritten edge missing in original"),
            };
            if keep {
                kept.insert(c, child);
            } else {
                dropped = true;
            }
        }
        rebuild(merger, original, accepting, kept, changed || dropped)
    }
}

/// Nodes from which some accepting node is reachable, `Repeat` resolving
/// to `root`. Computed as a fixpoint because liveness flows backwards
/// through back-edges.
fn live_set(root: &NodeRef) -> (HashSet<usize>, bool) {
    let nodes = reachable(root);
    let root_key = addr(root);
    let mut live: HashSet<usize> = HashSet::new();
    loop {
        let mut grown = false;
        for n in &nodes {
            let key = addr(n);
            if live.contains(&key) {
                continue;
            }
            let alive = n.accepting()
                || n.children().values().any(|c| {
                    if c.is_repeat() {
                        live.contains(&root_key)
                    } else {
                        live.contains(&addr(c))
                    }
                });
            if alive {
                live.insert(key);
                grown = true;
            }
        }
        if !grown {
            break;
        }
    }
    let root_live = live.contains(&root_key);
    (live, root_live)
}

/// Remove dead branches; an entirely dead tree collapses to the bottom
/// leaf.
pub fn prune(merger: &mut Merger, root: &NodeRef) -> NodeRef {
    let (live, root_live) = live_set(root);
    if !root_live {
        return merger.sharing().leaf(false);
    }
    let mut tx = Transformer::new(Prune { live, root_live });
    tx.transform(root)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::forward;
    use crate::share::Sharing;
    use crate::text::{parse, to_text};

    fn t(sharing: &mut Sharing, s: &str) -> NodeRef {
        parse(s, sharing).unwrap()
    }

    #[test]
    fn test_concat_constants() {
        let mut sh = Sharing::new();
        let a = sh.constant("con");
        let b = sh.constant("st");
        let mut tx = Transformer::new(Concat::new(b));
        let out = tx.transform(&a);
        assert_eq!(to_text(&out), "{c{o{n{s{t{}!}.}.}.}.}.");
    }

    #[test]
    fn test_concat_onto_loop_stays_finite() {
        let mut sh = Sharing::new();
        let a = t(&mut sh, "{a*}!");
        let b = sh.constant("b");
        let mut tx = Transformer::new(Concat::new(b));
        let out = tx.transform(&a);
        // Every accepting point of the loop gains a "b" continuation; the
        // growth is folded back into one root.
        assert!(crate::node::node_count(&out) <= 3);
        assert!(crate::node::language_nonempty(&out, &out));
    }

    #[test]
    fn test_concat_second_loops() {
        let mut sh = Sharing::new();
        let x = sh.constant("x");
        let loopy = t(&mut sh, "{a*}!");
        let mut tx = Transformer::new(Concat::new(loopy));
        let out = tx.transform(&x);
        // The loop's content joins the final root, so its re-targeted
        // back-edges still produce every run of "a"s after the "x".
        let mut sh2 = Sharing::new();
        for s in ["x", "xa", "xaa"] {
            let c = sh2.constant(s);
            assert!(crate::relation::includes(&c, &out), "missing {:?}", s);
        }
    }

    #[test]
    fn test_identity_reuses_nodes() {
        struct Identity;
        impl Rewrite for Identity {
            fn rewrite(
                &mut self,
                merger: &mut Merger,
                original: &NodeRef,
                accepting: bool,
                children: BTreeMap<char, NodeRef>,
                changed: bool,
            ) -> NodeRef {
                rebuild(merger, original, accepting, children, changed)
            }
        }
        let mut sh = Sharing::new();
        let a = t(&mut sh, "{a{b{}!}.b{}!}!");
        let mut tx = Transformer::new(Identity);
        let out = tx.transform(&a);
        assert!(Rc::ptr_eq(&a, &out));
    }

    #[test]
    fn test_replace_chars_definite() {
        let mut sh = Sharing::new();
        let a = sh.constant("aba");
        let mut tx = Transformer::new(ReplaceChars {
            from: CharInterval::singleton('a'),
            to: CharInterval::singleton('x'),
        });
        let out = tx.transform(&a);
        assert_eq!(crate::node::as_constant(&out).as_deref(), Some("xbx"));
    }

    #[test]
    fn test_replace_chars_uncertain_keeps_original() {
        let mut sh = Sharing::new();
        let a = sh.constant("a");
        let mut tx = Transformer::new(ReplaceChars {
            from: CharInterval::new('a', 'b'),
            to: CharInterval::singleton('x'),
        });
        let out = tx.transform(&a);
        assert_eq!(to_text(&out), "{a{}!x{}!}.");
    }

    #[test]
    fn test_truncate() {
        let mut sh = Sharing::new();
        let a = sh.constant("abcd");
        let (depths, _) = forward::depth_map(&a);
        let mut tx = Transformer::new(Truncate {
            depths,
            cut: Interval::constant(2),
        });
        let out = tx.transform(&a);
        // Everything at depth >= 2 is certainly cut.
        assert_eq!(crate::node::as_constant(&out).as_deref(), Some("ab"));
    }

    #[test]
    fn test_prune() {
        let mut sh = Sharing::new();
        let a = t(&mut sh, "{a{b{}!}.c{}.}.");
        let mut merger = Merger::new();
        let out = prune(&mut merger, &a);
        assert_eq!(to_text(&out), "{a{b{}!}.}.");

        let dead = t(&mut sh, "{a{}.}.");
        let out = prune(&mut merger, &dead);
        assert_eq!(to_text(&out), "{}.");
    }
}
