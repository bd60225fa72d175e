//! Counting the strings denoted by a tree.

use std::collections::HashMap;

use num_bigint::BigUint;

use crate::node::{addr, has_repeat_edge, NodeRef};

/// Number of strings in the language, `None` when a `Repeat` edge makes it
/// infinite. Shared subtrees are counted once through the memo.
pub fn count_strings(root: &NodeRef) -> Option<BigUint> {
    if root.is_repeat() || has_repeat_edge(root) {
        return None;
    }

    enum Frame {
        Enter(NodeRef),
        Exit(NodeRef),
    }

    let mut memo: HashMap<usize, BigUint> = HashMap::new();
    let mut stack = vec![Frame::Enter(root.clone())];
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(n) => {
                if memo.contains_key(&addr(&n)) {
                    continue;
                }
                stack.push(Frame::Exit(n.clone()));
                for child in n.children().values() {
                    if !memo.contains_key(&addr(child)) {
                        stack.push(Frame::Enter(child.clone()));
                    }
                }
            }
            Frame::Exit(n) => {
                let mut count = BigUint::from(n.accepting() as u8);
                for child in n.children().values() {
                    count += &memo[&addr(child)];
                }
                memo.insert(addr(&n), count);
            }
        }
    }
    Some(memo[&addr(root)].clone())
}
