//! Structural debug printing, used by tests to explain tree mismatches.

use crate::NodeId;
use crate::Tree;
use std::fmt::Write;

/// Renders a subtree as an indented s-expression of kinds and string
/// payloads. Spans and annotations are omitted; two trees that compare equal
/// under [`Tree::structurally_equal`] dump identically.
pub fn dump(tree: &Tree, n: NodeId) -> String {
  let mut out = String::new();
  dump_into(tree, n, 0, &mut out);
  out
}

fn dump_into(tree: &Tree, n: NodeId, depth: usize, out: &mut String) {
  for _ in 0..depth {
    out.push_str("  ");
  }
  let kind = tree.kind(n);
  write!(out, "{:?}", kind).unwrap();
  if kind.has_string() || !tree.string(n).is_empty() {
    write!(out, " {:?}", tree.string(n)).unwrap();
  }
  out.push('\n');
  for &child in tree.children(n) {
    dump_into(tree, child, depth + 1, out);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::build;

  #[test]
  fn nested_dump_indents() {
    let mut tree = Tree::new();
    let inner = build::name(&mut tree, "x");
    let stmt = build::expr_result(&mut tree, inner);
    let script = build::script(&mut tree, vec![stmt]);
    let rendered = dump(&tree, script);
    assert_eq!(rendered, "Script\n  ExprResult\n    Name \"x\"\n");
  }
}
