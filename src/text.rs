//! Text form of a trie, used for fixtures, tests, and debugging.
//!
//! Grammar:
//!
//! ```text
//! tree := '{' (char tree)* '}' ('!' | '.')
//!       | '*'
//! ```
//!
//! `!` marks an accepting node, `.` a non-accepting one, `*` a `Repeat`
//! back-edge. `"{c{o{n{s{t{}!}.}.}.}.}."` denotes the single string
//! `"const"`; `"{a*}!"` denotes any number of `a`s.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::node::{Inner, Node, NodeRef};
use crate::share::Sharing;

/// Malformed serialized input. Parsing is the only recoverable error
/// boundary of the crate; nothing here ever leaks into the core algorithms.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected character {found:?} at offset {at}, expected {expected}")]
    Unexpected {
        at: usize,
        found: char,
        expected: &'static str,
    },
    #[error("input ended inside a tree")]
    UnexpectedEnd,
    #[error("trailing input at offset {at}")]
    TrailingInput { at: usize },
    #[error("duplicate edge {edge:?} at offset {at}")]
    DuplicateEdge { at: usize, edge: char },
    #[error("a serialized tree must be rooted at an inner node, not '*'")]
    RepeatRoot,
}

/// Serialize `root` in the brace grammar. Children appear in character
/// order, so the output is canonical for canonical trees.
pub fn to_text(root: &NodeRef) -> String {
    enum Item {
        Node(NodeRef),
        Edge(char, NodeRef),
        Close(bool),
    }

    let mut out = String::new();
    let mut stack = vec![Item::Node(root.clone())];
    while let Some(item) = stack.pop() {
        match item {
            Item::Node(n) => match &*n {
                Node::Repeat => out.push('*'),
                Node::Inner(inner) => {
                    out.push('{');
                    stack.push(Item::Close(inner.accepting()));
                    for (c, child) in inner.children().iter().rev() {
                        stack.push(Item::Edge(*c, child.clone()));
                    }
                }
            },
            Item::Edge(c, child) => {
                out.push(c);
                stack.push(Item::Node(child));
            }
            Item::Close(accepting) => {
                out.push('}');
                out.push(if accepting { '!' } else { '.' });
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting the start of a tree: `{` or `*`.
    Outside,
    /// Inside a node: an edge character or `}`.
    Inside,
    /// After `}`: the accepting marker.
    End,
    /// Root complete; nothing else may follow.
    Done,
}

struct OpenNode {
    children: BTreeMap<char, NodeRef>,
    pending_edge: Option<char>,
}

/// Parse the brace grammar, interning nodes through `sharing` bottom-up.
pub fn parse(input: &str, sharing: &mut Sharing) -> Result<NodeRef, ParseError> {
    let mut state = State::Outside;
    let mut open: Vec<OpenNode> = Vec::new();
    let mut root: Option<NodeRef> = None;

    // Attach a completed subtree to its parent, or finish the root.
    fn complete(
        node: NodeRef,
        open: &mut Vec<OpenNode>,
        root: &mut Option<NodeRef>,
        at: usize,
    ) -> Result<State, ParseError> {
        match open.last_mut() {
            Some(parent) => {
                let edge = parent
                    .pending_edge
                    .take()
                    .expect("parser: completed subtree without a pending edge");
                if parent.children.insert(edge, node).is_some() {
                    return Err(ParseError::DuplicateEdge { at, edge });
                }
                Ok(State::Inside)
            }
            None => {
                if node.is_repeat() {
                    return Err(ParseError::RepeatRoot);
                }
                *root = Some(node);
                Ok(State::Done)
            }
        }
    }

    for (at, c) in input.char_indices() {
        state = match state {
            State::Outside => match c {
                '{' => {
                    open.push(OpenNode {
                        children: BTreeMap::new(),
                        pending_edge: None,
                    });
                    State::Inside
                }
                '*' => complete(Node::repeat(), &mut open, &mut root, at)?,
                _ => {
                    return Err(ParseError::Unexpected {
                        at,
                        found: c,
                        expected: "'{' or '*'",
                    })
                }
            },
            State::Inside => match c {
                '}' => State::End,
                _ => {
                    let frame = open.last_mut().expect("parser: no open node inside a tree");
                    frame.pending_edge = Some(c);
                    State::Outside
                }
            },
            State::End => match c {
                '!' | '.' => {
                    let frame = open.pop().expect("parser: no open node at terminator");
                    let node = sharing.share(Inner::new(c == '!', frame.children));
                    complete(node, &mut open, &mut root, at)?
                }
                _ => {
                    return Err(ParseError::Unexpected {
                        at,
                        found: c,
                        expected: "'!' or '.'",
                    })
                }
            },
            State::Done => return Err(ParseError::TrailingInput { at }),
        };
    }

    root.ok_or(ParseError::UnexpectedEnd)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(s: &str) {
        let mut sharing = Sharing::new();
        let t = parse(s, &mut sharing).unwrap();
        assert_eq!(to_text(&t), s);
    }

    #[test]
    fn test_roundtrip() {
        roundtrip("{}.");
        roundtrip("{}!");
        roundtrip("{c{o{n{s{t{}!}.}.}.}.}.");
        roundtrip("{a*}!");
        roundtrip("{a*b*}!");
        roundtrip("{a{b{}!}.b{}.}!");
    }

    #[test]
    fn test_parse_shares_subtrees() {
        let mut sharing = Sharing::new();
        let t = parse("{a{x{}!}.b{x{}!}.}.", &mut sharing).unwrap();
        let ax = t.children()[&'a'].clone();
        let bx = t.children()[&'b'].clone();
        assert!(std::rc::Rc::ptr_eq(&ax, &bx));
    }

    #[test]
    fn test_parse_errors() {
        let mut sharing = Sharing::new();
        assert_eq!(
            parse("", &mut sharing).unwrap_err(),
            ParseError::UnexpectedEnd
        );
        assert_eq!(
            parse("{a{}!", &mut sharing).unwrap_err(),
            ParseError::UnexpectedEnd
        );
        assert!(matches!(
            parse("{}x", &mut sharing).unwrap_err(),
            ParseError::Unexpected { found: 'x', .. }
        ));
        assert!(matches!(
            parse("x", &mut sharing).unwrap_err(),
            ParseError::Unexpected { found: 'x', .. }
        ));
        assert!(matches!(
            parse("{}!{}.", &mut sharing).unwrap_err(),
            ParseError::TrailingInput { .. }
        ));
        assert!(matches!(
            parse("{a{}!a{}.}.", &mut sharing).unwrap_err(),
            ParseError::DuplicateEdge { edge: 'a', .. }
        ));
        assert_eq!(parse("*", &mut sharing).unwrap_err(), ParseError::RepeatRoot);
    }
}
