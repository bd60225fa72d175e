//! The string abstract domain built on the trie engine.
//!
//! A [`Tokens`] value denotes a set of strings: either `Top` (all strings —
//! not representable as a finite tree over an unbounded alphabet) or a
//! rooted trie. Every operation builds its own sharing table and merger,
//! uses them for the duration of the call, and drops them with the result;
//! the returned nodes are immutable and safe to keep across operations.
//!
//! Comparisons return a [`Proof`]: definitely holds, definitely fails, or
//! unknown — the only honest answers an over-approximating domain can give.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::debug;

use crate::forward;
use crate::interval::{Bound, CharInterval, Congruence, Interval};
use crate::merger::Merger;
use crate::node::{addr, as_constant, has_repeat_edge, language_nonempty, reachable, Inner, NodeRef};
use crate::relation;
use crate::share::Sharing;
use crate::text::{parse, to_text, ParseError};
use crate::transform::{prune, Concat, ReplaceChars, Transformer, Truncate};

/// Outcome of a query against an abstract value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proof {
    /// Holds for every concrete string.
    Proven,
    /// Fails for every concrete string.
    Refuted,
    Unknown,
}

/// Which end of the string an operation works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// An abstract set of strings.
#[derive(Debug, Clone)]
pub enum Tokens {
    /// All strings.
    Top,
    Tree(NodeRef),
}

impl Tokens {
    pub fn top() -> Self {
        Tokens::Top
    }

    /// The empty set of strings.
    pub fn bottom() -> Self {
        Tokens::Tree(Sharing::new().leaf(false))
    }

    /// Exactly the string `s`.
    pub fn constant(s: &str) -> Self {
        Tokens::Tree(Sharing::new().constant(s))
    }

    /// All one-character strings over `range`.
    pub fn chars(range: CharInterval) -> Self {
        Tokens::Tree(Sharing::new().chars(range))
    }

    /// Parse the brace grammar; the single letter `T` denotes `Top`.
    pub fn from_text(input: &str) -> Result<Self, ParseError> {
        if input == "T" {
            return Ok(Tokens::Top);
        }
        let mut sharing = Sharing::new();
        Ok(Tokens::Tree(parse(input, &mut sharing)?))
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Tokens::Top)
    }

    pub fn is_bottom(&self) -> bool {
        match self {
            Tokens::Top => false,
            Tokens::Tree(t) => !language_nonempty(t, t),
        }
    }

    /// The single string denoted, if there is exactly one.
    pub fn as_constant(&self) -> Option<String> {
        match self {
            Tokens::Top => None,
            Tokens::Tree(t) => as_constant(t),
        }
    }

    // ------------------------------------------------------------------
    // Lattice
    // ------------------------------------------------------------------

    /// Least upper bound.
    pub fn join(&self, other: &Tokens) -> Tokens {
        match (self, other) {
            (Tokens::Top, _) | (_, Tokens::Top) => Tokens::Top,
            (Tokens::Tree(a), Tokens::Tree(b)) => {
                let mut merger = Merger::new();
                merger.cutoff(a);
                merger.cutoff(b);
                Tokens::Tree(merger.build())
            }
        }
    }

    /// Greatest lower bound.
    pub fn meet(&self, other: &Tokens) -> Tokens {
        match (self, other) {
            (Tokens::Top, t) | (t, Tokens::Top) => t.clone(),
            (Tokens::Tree(a), Tokens::Tree(b)) => Tokens::Tree(relation::meet(a, b)),
        }
    }

    /// Widening of `self` (the previous iterate) by `other`: guarantees a
    /// fixpoint across repeated calls.
    pub fn widen(&self, other: &Tokens) -> Tokens {
        match (self, other) {
            (Tokens::Top, _) | (_, Tokens::Top) => Tokens::Top,
            (Tokens::Tree(old), Tokens::Tree(new)) => {
                let mut merger = Merger::new();
                let w = merger.widening_merge(old, new);
                merger.cutoff(&w);
                Tokens::Tree(merger.build())
            }
        }
    }

    /// The lattice order: does `self` denote a subset of `other`?
    pub fn le(&self, other: &Tokens) -> bool {
        match (self, other) {
            (_, Tokens::Top) => true,
            (Tokens::Top, Tokens::Tree(_)) => false,
            (Tokens::Tree(a), Tokens::Tree(b)) => relation::includes(a, b),
        }
    }

    // ------------------------------------------------------------------
    // String operations
    // ------------------------------------------------------------------

    /// Concatenation of every left string with every right string.
    pub fn concat(&self, other: &Tokens) -> Tokens {
        if self.is_bottom() || other.is_bottom() {
            return Tokens::bottom();
        }
        match (self, other) {
            (Tokens::Top, _) | (_, Tokens::Top) => Tokens::Top,
            (Tokens::Tree(a), Tokens::Tree(b)) => {
                let mut tx = Transformer::new(Concat::new(b.clone()));
                Tokens::Tree(tx.transform(a))
            }
        }
    }

    /// `[min, max]` over the lengths of the denoted strings.
    pub fn length(&self) -> Interval {
        match self {
            Tokens::Top => Interval::at_least(0),
            Tokens::Tree(t) => forward::length_interval(t),
        }
    }

    /// Congruence class of the denoted lengths; `None` for the empty set.
    pub fn length_congruence(&self) -> Option<Congruence> {
        match self {
            Tokens::Top => Some(Congruence::new(1, 0)),
            Tokens::Tree(t) => forward::length_congruence(t),
        }
    }

    /// Substrings `s[i..i+l]` for `i` in `start` and `l` in `length`
    /// (clipped at the end of the string). A length of `[+inf, +inf]`
    /// means "to the end".
    pub fn substring(&self, start: &Interval, length: &Interval) -> Tokens {
        if start.is_empty() || length.is_empty() {
            return Tokens::bottom();
        }
        match self {
            Tokens::Top => Tokens::Top,
            Tokens::Tree(t) => match suffixes(t, start) {
                None => Tokens::bottom(),
                Some(suffix) => Tokens::Tree(truncate(&suffix, length)),
            },
        }
    }

    /// Strings with the slice `s[i..i+l]` removed, `i` in `start` and `l`
    /// in `length`. Removal past the end of the string keeps the string.
    pub fn remove(&self, start: &Interval, length: &Interval) -> Tokens {
        if start.is_empty() || length.is_empty() {
            return Tokens::bottom();
        }
        match self {
            Tokens::Top => Tokens::Top,
            Tokens::Tree(t) => {
                let head = truncate(t, start);
                let tail = match suffixes(t, &start.add(length)) {
                    Some(s) => s,
                    // Removal may reach past every string: nothing is left
                    // behind the cut.
                    None => Sharing::new().leaf(true),
                };
                Tokens::Tree(head).concat(&Tokens::Tree(tail))
            }
        }
    }

    /// Replace every character of `from` by the characters of `to`. When
    /// `from` is not a single character, the replacement is uncertain and
    /// originals are kept as alternatives.
    pub fn replace_char(&self, from: CharInterval, to: CharInterval) -> Tokens {
        match self {
            Tokens::Top => Tokens::Top,
            Tokens::Tree(t) => {
                let mut tx = Transformer::new(ReplaceChars { from, to });
                Tokens::Tree(tx.transform(t))
            }
        }
    }

    /// Replace occurrences of the literal `from` by `to`. Precise when the
    /// receiver is a single constant or certainly misses `from`.
    pub fn replace_string(&self, from: &str, to: &str) -> Tokens {
        if from.is_empty() {
            return self.clone();
        }
        if self.contains(from) == Proof::Refuted {
            return self.clone();
        }
        match self.as_constant() {
            Some(s) => Tokens::constant(&s.replace(from, to)),
            None => Tokens::Top,
        }
    }

    /// Pad with `c` on the given side until the length reaches `target`.
    /// Strings already long enough stay unchanged.
    pub fn pad(&self, target: &Interval, c: char, side: Direction) -> Tokens {
        if target.is_empty() || self.is_bottom() {
            return Tokens::bottom();
        }
        let tree = match self {
            Tokens::Top => return Tokens::Top,
            Tokens::Tree(t) => t,
        };
        let len = forward::length_interval(tree);
        let most = target.high.add(&match len.low {
            Bound::Finite(n) => Bound::Finite(-n),
            b => b,
        });
        if most < Bound::Finite(1) {
            // Every string already reaches the target length.
            return self.clone();
        }
        // The pad count is certain only when every string falls short.
        let fewest = match (target.low, len.high) {
            (Bound::Finite(lo), Bound::Finite(hi)) if hi < lo => (lo - hi) as u64,
            _ => 0,
        };
        debug!("pad: between {} and {} characters {:?}", fewest, most, c);
        let pads = Tokens::Tree(Sharing::new().pad_chain(c, fewest, most));
        match side {
            Direction::Forward => pads.concat(self),
            Direction::Backward => self.concat(&pads),
        }
    }

    /// Do all / none of the strings contain `needle`?
    pub fn contains(&self, needle: &str) -> Proof {
        if needle.is_empty() {
            return Proof::Proven;
        }
        match self {
            Tokens::Top => Proof::Unknown,
            Tokens::Tree(t) => {
                let chars: Vec<char> = needle.chars().collect();
                let accepted = forward::kmp_accepting_states(t, &chars, true);
                final_state_proof(&accepted, chars.len())
            }
        }
    }

    /// Do all / none of the strings end with `suffix`?
    pub fn ends_with(&self, suffix: &str) -> Proof {
        if suffix.is_empty() {
            return Proof::Proven;
        }
        match self {
            Tokens::Top => Proof::Unknown,
            Tokens::Tree(t) => {
                let chars: Vec<char> = suffix.chars().collect();
                let accepted = forward::kmp_accepting_states(t, &chars, false);
                final_state_proof(&accepted, chars.len())
            }
        }
    }

    /// Do all / none of the strings start with `prefix`?
    pub fn starts_with(&self, prefix: &str) -> Proof {
        if prefix.is_empty() {
            return Proof::Proven;
        }
        let root = match self {
            Tokens::Top => return Proof::Unknown,
            Tokens::Tree(t) => t,
        };
        let mut cur = root.clone();
        let mut all_follow = true;
        for c in prefix.chars() {
            if cur.accepting() {
                // Some string ends before the prefix is consumed.
                all_follow = false;
            }
            for (edge, child) in cur.children() {
                if *edge != c && language_nonempty(child, root) {
                    all_follow = false;
                }
            }
            let next = match cur.children().get(&c) {
                None => {
                    // No string carries the full prefix.
                    return if language_nonempty(root, root) {
                        Proof::Refuted
                    } else {
                        Proof::Proven
                    }
                }
                Some(child) if child.is_repeat() => root.clone(),
                Some(child) => child.clone(),
            };
            cur = next;
        }
        if !language_nonempty(&cur, root) {
            return if language_nonempty(root, root) {
                Proof::Refuted
            } else {
                Proof::Proven
            };
        }
        if all_follow {
            Proof::Proven
        } else {
            Proof::Unknown
        }
    }

    /// Interval of offsets `index_of(needle)` may return, `-1` included
    /// whenever some string may miss the needle. The hull of occurrence
    /// offsets does not depend on the search direction.
    pub fn index_of(&self, needle: &str, _direction: Direction) -> Interval {
        if needle.is_empty() {
            return Interval::constant(0);
        }
        let tree = match self {
            Tokens::Top => return Interval::at_least(-1),
            Tokens::Tree(t) => t,
        };
        let chars: Vec<char> = needle.chars().collect();
        let positions = forward::match_positions(tree, &chars);
        if positions.is_empty() {
            return Interval::constant(-1);
        }
        match self.contains(needle) {
            Proof::Proven => positions,
            _ => positions.join(&Interval::constant(-1)),
        }
    }

    /// All characters that may occur at an offset within `index`.
    pub fn char_at(&self, index: &Interval) -> Tokens {
        if index.is_empty() {
            return Tokens::bottom();
        }
        match self {
            Tokens::Top => Tokens::Top,
            Tokens::Tree(t) => {
                let (depths, _) = forward::depth_map(t);
                let mut found: BTreeSet<char> = BTreeSet::new();
                for n in reachable(t) {
                    if depths[&addr(&n)].intersects(index) {
                        found.extend(n.children().keys().copied());
                    }
                }
                let mut sharing = Sharing::new();
                let end = sharing.leaf(true);
                let children: BTreeMap<char, NodeRef> =
                    found.into_iter().map(|c| (c, end.clone())).collect();
                Tokens::Tree(sharing.share(Inner::new(false, children)))
            }
        }
    }

    /// Is every left string lexicographically at most every right string?
    pub fn compare_le(&self, other: &Tokens) -> Proof {
        match (self, other) {
            (Tokens::Tree(a), Tokens::Tree(b)) => {
                if !relation::can_be_less(b, a) {
                    Proof::Proven
                } else if !relation::can_be_less_equal(a, b) {
                    Proof::Refuted
                } else {
                    Proof::Unknown
                }
            }
            _ => Proof::Unknown,
        }
    }

    /// Is every left string lexicographically below every right string?
    pub fn compare_lt(&self, other: &Tokens) -> Proof {
        match (self, other) {
            (Tokens::Tree(a), Tokens::Tree(b)) => {
                if !relation::can_be_less_equal(b, a) {
                    Proof::Proven
                } else if !relation::can_be_less(a, b) {
                    Proof::Refuted
                } else {
                    Proof::Unknown
                }
            }
            _ => Proof::Unknown,
        }
    }

    /// Trimming under a character-range predicate has no agreed semantics
    /// for unknown positions yet.
    pub fn trim(&self, _range: CharInterval) -> Tokens {
        unimplemented!("trim is not supported")
    }
}

impl PartialEq for Tokens {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Tokens::Top, Tokens::Top) => true,
            (Tokens::Tree(a), Tokens::Tree(b)) => relation::equal(a, b),
            _ => false,
        }
    }
}

impl Eq for Tokens {}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tokens::Top => write!(f, "T"),
            Tokens::Tree(t) => write!(f, "{}", to_text(t)),
        }
    }
}

/// Accepted-state set against the needle automaton turned into a proof:
/// every string ends in the match state, none does, or mixed.
fn final_state_proof(accepted: &BTreeSet<usize>, full: usize) -> Proof {
    if accepted.is_empty() {
        // Empty language: vacuously true.
        return Proof::Proven;
    }
    let hit = accepted.contains(&full);
    if hit && accepted.len() == 1 {
        Proof::Proven
    } else if !hit {
        Proof::Refuted
    } else {
        Proof::Unknown
    }
}

/// Union of the sub-languages rooted at nodes whose depth may fall in
/// `start`; `None` when no node qualifies. When the tree loops, the root
/// itself joins the fold so re-targeted `Repeat` edges stay sound.
fn suffixes(tree: &NodeRef, start: &Interval) -> Option<NodeRef> {
    let (depths, _) = forward::depth_map(tree);
    let mut merger = Merger::new();
    let mut looping = false;
    let mut any = false;
    for n in reachable(tree) {
        if !depths[&addr(&n)].intersects(start) {
            continue;
        }
        any = true;
        looping |= has_repeat_edge(&n);
        merger.cutoff(&n);
    }
    if !any {
        return None;
    }
    if looping {
        merger.cutoff(tree);
    }
    Some(merger.build())
}

/// Cap the strings of `tree` at lengths within `cut`, keeping naturally
/// shorter strings. Dead branches left by the cut are pruned.
fn truncate(tree: &NodeRef, cut: &Interval) -> NodeRef {
    let (depths, _) = forward::depth_map(tree);
    let mut tx = Transformer::new(Truncate {
        depths,
        cut: *cut,
    });
    let out = tx.transform(tree);
    let mut merger = Merger::new();
    prune(&mut merger, &out)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn t(s: &str) -> Tokens {
        Tokens::from_text(s).unwrap()
    }

    #[test]
    fn test_constant_display() {
        let c = Tokens::constant("const");
        assert_eq!(c.to_string(), "{c{o{n{s{t{}!}.}.}.}.}.");
        assert_eq!(c.as_constant().as_deref(), Some("const"));
    }

    #[test]
    fn test_lattice_laws() {
        let a = t("{a*}!");
        let b = t("{b*}!");
        let j = a.join(&b);
        assert_eq!(j.to_string(), "{a*b*}!");
        assert_eq!(j, b.join(&a));
        assert_eq!(a.join(&a), a);
        assert!(a.le(&j));
        assert!(b.le(&j));

        assert_eq!(a.meet(&a), a);
        assert!(Tokens::bottom().le(&a));
        assert!(a.le(&Tokens::top()));
        assert!(!Tokens::top().le(&a));
        assert!(a.le(&a));
    }

    #[test]
    fn test_join_meet_duality() {
        let a = t("{a*b*}!");
        let b = t("{b*c*}!");
        let m = a.meet(&b);
        assert_eq!(m.to_string(), "{b*}!");
        assert!(m.le(&a));
        assert!(m.le(&b));
        assert!(a.le(&a.join(&b)));
    }

    #[test]
    fn test_le_examples() {
        assert!(t("{a*}!").le(&t("{a*b*}!")));
        assert!(!t("{a*b*}!").le(&t("{a*}!")));
    }

    #[test]
    fn test_concat() {
        let a = Tokens::constant("con");
        let b = Tokens::constant("st");
        assert_eq!(a.concat(&b), Tokens::constant("const"));
        assert!(a.concat(&Tokens::bottom()).is_bottom());
        assert!(a.concat(&Tokens::top()).is_top());
    }

    #[test]
    fn test_concat_second_loops() {
        let r = Tokens::constant("x").concat(&t("{a*}!"));
        assert!(Tokens::constant("x").le(&r));
        assert!(Tokens::constant("xa").le(&r));
        assert!(Tokens::constant("xaa").le(&r));
    }

    #[test]
    fn test_length() {
        assert_eq!(Tokens::constant("const").length(), Interval::constant(5));
        assert_eq!(t("{a*}!").length(), Interval::at_least(0));
        assert!(Tokens::bottom().length().is_empty());
        assert_eq!(Tokens::top().length(), Interval::at_least(0));
    }

    #[test]
    fn test_substring() {
        let c = Tokens::constant("constant");
        let to_end = Interval::new(Bound::PosInf, Bound::PosInf);
        assert_eq!(
            c.substring(&Interval::constant(3), &to_end),
            Tokens::constant("stant")
        );
        assert_eq!(
            c.substring(&Interval::constant(0), &Interval::constant(3)),
            Tokens::constant("con")
        );
        assert!(c
            .substring(&Interval::constant(100), &to_end)
            .is_bottom());
    }

    #[test]
    fn test_substring_uncertain_start() {
        let c = Tokens::constant("ab");
        let s = c.substring(&Interval::finite(0, 1), &Interval::new(Bound::PosInf, Bound::PosInf));
        // Either the whole string or the final "b".
        assert!(Tokens::constant("ab").le(&s));
        assert!(Tokens::constant("b").le(&s));
    }

    #[test]
    fn test_remove() {
        let c = Tokens::constant("abcd");
        let r = c.remove(&Interval::constant(1), &Interval::constant(2));
        assert!(Tokens::constant("ad").le(&r));
        // Removing past the end keeps the head.
        let tail = c.remove(&Interval::constant(2), &Interval::constant(100));
        assert!(Tokens::constant("ab").le(&tail));
    }

    #[test]
    fn test_remove_loopy_tail() {
        // Strings x a^n; dropping the first character leaves a^n, which
        // loops and must survive the concatenation fold.
        let r = t("{x{a*}!}.").remove(&Interval::constant(0), &Interval::constant(1));
        assert!(Tokens::constant("a").le(&r));
        assert!(Tokens::constant("aa").le(&r));
    }

    #[test]
    fn test_replace_char() {
        let c = Tokens::constant("aba");
        let r = c.replace_char(CharInterval::singleton('a'), CharInterval::singleton('x'));
        assert_eq!(r, Tokens::constant("xbx"));
    }

    #[test]
    fn test_replace_string() {
        let c = Tokens::constant("banana");
        assert_eq!(
            c.replace_string("ana", "x"),
            Tokens::constant("bxna")
        );
        // A certainly-absent needle leaves the value untouched.
        assert_eq!(c.replace_string("zz", "x"), c);
        assert!(t("{a*b*}!").replace_string("ab", "c").is_top());
    }

    #[test]
    fn test_pad() {
        let c = Tokens::constant("ab");
        let padded = c.pad(&Interval::constant(4), '0', Direction::Forward);
        assert!(Tokens::constant("00ab").le(&padded));
        assert_eq!(padded.length().low, Bound::Finite(4));

        let right = c.pad(&Interval::constant(4), '0', Direction::Backward);
        assert!(Tokens::constant("ab00").le(&right));

        // Already long enough: unchanged.
        assert_eq!(c.pad(&Interval::constant(1), '0', Direction::Forward), c);
    }

    #[test]
    fn test_pad_unbounded_target() {
        // No finite pad count: the chain degrades to a loop, whose content
        // must survive the concatenation fold.
        let padded = Tokens::constant("x").pad(&Interval::at_least(3), 'p', Direction::Backward);
        assert!(Tokens::constant("xpp").le(&padded));
        assert!(Tokens::constant("xppp").le(&padded));
    }

    #[test]
    fn test_contains() {
        let c = Tokens::constant("banana");
        assert_eq!(c.contains("ana"), Proof::Proven);
        assert_eq!(c.contains("x"), Proof::Refuted);
        assert_eq!(c.contains(""), Proof::Proven);
        assert_eq!(t("{a*b*}!").contains("b"), Proof::Unknown);
        assert_eq!(t("{a*}!").contains("b"), Proof::Refuted);
        assert_eq!(Tokens::top().contains("x"), Proof::Unknown);
    }

    #[test]
    fn test_starts_with() {
        let c = Tokens::constant("constant");
        assert_eq!(c.starts_with("con"), Proof::Proven);
        assert_eq!(c.starts_with("x"), Proof::Refuted);
        assert_eq!(c.starts_with("constantly"), Proof::Refuted);
        // {ab, ac} starts with "a" certainly, with "ab" maybe.
        let two = t("{a{b{}!c{}!}.}.");
        assert_eq!(two.starts_with("a"), Proof::Proven);
        assert_eq!(two.starts_with("ab"), Proof::Unknown);
    }

    #[test]
    fn test_ends_with() {
        let c = Tokens::constant("constant");
        assert_eq!(c.ends_with("ant"), Proof::Proven);
        assert_eq!(c.ends_with("con"), Proof::Refuted);
        assert_eq!(t("{a*b*}!").ends_with("b"), Proof::Unknown);
    }

    #[test]
    fn test_index_of() {
        let c = Tokens::constant("abcab");
        assert_eq!(
            c.index_of("ab", Direction::Forward),
            Interval::finite(0, 3)
        );
        assert_eq!(
            c.index_of("zz", Direction::Forward),
            Interval::constant(-1)
        );
        // May or may not contain the needle: -1 joins the hull.
        let maybe = t("{a*b*}!");
        let idx = maybe.index_of("b", Direction::Forward);
        assert!(idx.contains(-1));
        assert!(idx.contains(0));
    }

    #[test]
    fn test_char_at() {
        let c = Tokens::constant("abc");
        assert_eq!(c.char_at(&Interval::constant(1)), Tokens::constant("b"));
        let any = c.char_at(&Interval::finite(0, 2));
        assert_eq!(any.to_string(), "{a{}!b{}!c{}!}.");
        assert!(c.char_at(&Interval::constant(9)).is_bottom());
    }

    #[test]
    fn test_compare() {
        let ab = Tokens::constant("ab");
        let cd = Tokens::constant("cd");
        assert_eq!(ab.compare_le(&cd), Proof::Proven);
        assert_eq!(ab.compare_lt(&cd), Proof::Proven);
        assert_eq!(cd.compare_le(&ab), Proof::Refuted);
        assert_eq!(ab.compare_le(&ab), Proof::Proven);
        assert_eq!(ab.compare_lt(&ab), Proof::Refuted);

        // {a, c} vs "b": order depends on the string.
        let mixed = t("{a{}!c{}!}.");
        let b = Tokens::constant("b");
        assert_eq!(mixed.compare_le(&b), Proof::Unknown);
    }

    #[test]
    fn test_length_congruence() {
        let even = t("{a{b*}.}!");
        let c = even.length_congruence().unwrap();
        assert_eq!(c.divisor, 2);
        assert_eq!(c.remainder, 0);
        assert!(Tokens::bottom().length_congruence().is_none());
    }

    #[test]
    fn test_widen_terminates() {
        let mut current = Tokens::constant("a");
        let mut steps = 0;
        loop {
            let grown = current.concat(&Tokens::constant("a")).join(&current);
            let next = current.widen(&grown);
            steps += 1;
            if next == current {
                break;
            }
            current = next;
            assert!(steps < 10, "widening failed to stabilize");
        }
    }

    #[test]
    #[should_panic(expected = "not supported")]
    fn test_trim_unsupported() {
        Tokens::constant("a").trim(CharInterval::singleton(' '));
    }
}
