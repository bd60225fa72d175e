//! Trie to DOT (Graphviz) conversion, for debugging and documentation.
//!
//! Conventions:
//! - Accepting nodes are drawn as double circles, others as circles.
//! - The root is marked with a bold outline.
//! - Child edges are solid and labelled with their character; `Repeat`
//!   back-edges are drawn dashed, pointing at the root.

use std::fmt::Write;

use crate::node::{addr, reachable, NodeRef};

/// Render the tree under `root` as a DOT digraph.
pub fn to_dot(root: &NodeRef) -> Result<String, std::fmt::Error> {
    let nodes = reachable(root);
    let mut ids = std::collections::HashMap::new();
    for (i, n) in nodes.iter().enumerate() {
        ids.insert(addr(n), i);
    }

    let mut dot = String::new();
    writeln!(dot, "digraph tokens {{")?;
    writeln!(dot, "rankdir=TB;")?;
    writeln!(dot, "node [shape=circle, fixedsize=true];")?;
    for (i, n) in nodes.iter().enumerate() {
        let shape = if n.accepting() { "doublecircle" } else { "circle" };
        let style = if i == 0 { ", style=bold" } else { "" };
        writeln!(dot, "n{} [shape={}{}, label=\"{}\"];", i, shape, style, i)?;
    }
    for (i, n) in nodes.iter().enumerate() {
        for (c, child) in n.children() {
            if child.is_repeat() {
                writeln!(dot, "n{} -> n0 [label=\"{}\", style=dashed];", i, c)?;
            } else {
                writeln!(dot, "n{} -> n{} [label=\"{}\"];", i, ids[&addr(child)], c)?;
            }
        }
    }
    writeln!(dot, "}}")?;
    Ok(dot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::Sharing;
    use crate::text::parse;

    #[test]
    fn test_to_dot() {
        let mut sh = Sharing::new();
        let t = parse("{a*b{}!}!", &mut sh).unwrap();
        let dot = to_dot(&t).unwrap();
        assert!(dot.starts_with("digraph tokens {"));
        assert!(dot.contains("doublecircle"));
        assert!(dot.contains("style=dashed"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
