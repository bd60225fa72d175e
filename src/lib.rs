//! # tokens-tree: compressed cyclic tries for abstract string reasoning
//!
//! **`tokens-tree`** is a library for representing and manipulating sets of
//! strings as **compressed cyclic tries**: finite trees of branching nodes
//! where a single `Repeat` sentinel encodes "loop back to the root", giving
//! a finite handle on infinite regular-but-unbounded languages.
//!
//! ## Representation
//!
//! A tree is a DAG of [`node::Inner`] nodes, each carrying an accepting
//! flag and per-character children. Structurally equal subtrees are
//! canonicalized through a per-operation [`share::Sharing`] table (hash
//! consing), so pointer identity doubles as a cheap equality check.
//!
//! ## Algorithms
//!
//! - [`merger`] — exact, underapproximating, and widening merges of trees,
//!   with controlled re-introduction of cycles ("cutoff").
//! - [`relation`] — a generic worklist fixpoint over node pairs, deciding
//!   inclusion, equality, lexicographic order, and intersection.
//! - [`forward`] — topological dataflow passes computing per-node
//!   summaries: length intervals, length congruences, substring-automaton
//!   states.
//! - [`transform`] — bottom-up tree transducers with memoization and
//!   sharing, the engine behind every string operation.
//!
//! ## The domain
//!
//! [`tokens::Tokens`] wraps a rooted tree (or `Top`, all strings) into an
//! abstract string domain: lattice operations with a terminating widening,
//! and the string operations a static analysis needs — concatenation,
//! substring, replace, padding, containment, lexicographic comparison,
//! lengths, and character lookup. Queries answer with a three-valued
//! [`tokens::Proof`].
//!
//! ## Basic usage
//!
//! ```rust
//! use tokens_tree::tokens::{Proof, Tokens};
//!
//! let c = Tokens::constant("const");
//! assert_eq!(c.to_string(), "{c{o{n{s{t{}!}.}.}.}.}.");
//!
//! let any_a = Tokens::from_text("{a*}!").unwrap();
//! let any_ab = Tokens::from_text("{a*b*}!").unwrap();
//! assert!(any_a.le(&any_ab));
//! assert_eq!(any_a.join(&any_ab), any_ab);
//! assert_eq!(Tokens::constant("banana").contains("ana"), Proof::Proven);
//! ```

pub mod count;
pub mod dot;
pub mod forward;
pub mod interval;
pub mod merger;
pub mod node;
pub mod relation;
pub mod share;
pub mod text;
pub mod tokens;
pub mod transform;
pub mod utils;
