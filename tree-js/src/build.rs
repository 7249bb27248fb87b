//! Node factory for freshly synthesized subtrees.
//!
//! Every builder returns a detached node with [`crate::SYNTHETIC_SPAN`];
//! callers position the result with [`Tree::copy_span_tree`] or
//! [`Tree::set_span_tree`] once they know where it lands.

use crate::Kind;
use crate::NodeId;
use crate::Tree;
use crate::SYNTHETIC_SPAN;

pub fn name(tree: &mut Tree, text: impl Into<String>) -> NodeId {
  let n = tree.alloc(Kind::Name, SYNTHETIC_SPAN);
  tree.init_string(n, text);
  n
}

pub fn string(tree: &mut Tree, text: impl Into<String>) -> NodeId {
  let n = tree.alloc(Kind::Str, SYNTHETIC_SPAN);
  tree.init_string(n, text);
  n
}

pub fn number(tree: &mut Tree, literal: impl Into<String>) -> NodeId {
  let n = tree.alloc(Kind::Number, SYNTHETIC_SPAN);
  tree.init_string(n, literal);
  n
}

pub fn string_key(tree: &mut Tree, key: impl Into<String>) -> NodeId {
  let n = tree.alloc(Kind::StringKey, SYNTHETIC_SPAN);
  tree.init_string(n, key);
  n
}

pub fn empty(tree: &mut Tree) -> NodeId {
  tree.alloc(Kind::Empty, SYNTHETIC_SPAN)
}

pub fn getprop(tree: &mut Tree, object: NodeId, prop: impl Into<String>) -> NodeId {
  let n = tree.alloc(Kind::GetProp, SYNTHETIC_SPAN);
  let prop_node = string(tree, prop);
  tree.add_child_to_back(n, object);
  tree.add_child_to_back(n, prop_node);
  n
}

/// Builds a qualified-name subtree from a dotted string: `"a.b.c"` becomes
/// `GetProp(GetProp(Name a, b), c)`.
pub fn qname(tree: &mut Tree, dotted: &str) -> NodeId {
  let mut segments = dotted.split('.');
  let first = segments.next().expect("qualified name must be non-empty");
  let mut node = name(tree, first);
  for segment in segments {
    node = getprop(tree, node, segment);
  }
  node
}

pub fn call(tree: &mut Tree, callee: NodeId, args: Vec<NodeId>) -> NodeId {
  let n = tree.alloc(Kind::Call, SYNTHETIC_SPAN);
  tree.add_child_to_back(n, callee);
  for arg in args {
    tree.add_child_to_back(n, arg);
  }
  n
}

pub fn new_expr(tree: &mut Tree, callee: NodeId, args: Vec<NodeId>) -> NodeId {
  let n = tree.alloc(Kind::New, SYNTHETIC_SPAN);
  tree.add_child_to_back(n, callee);
  for arg in args {
    tree.add_child_to_back(n, arg);
  }
  n
}

pub fn expr_result(tree: &mut Tree, expr: NodeId) -> NodeId {
  let n = tree.alloc(Kind::ExprResult, SYNTHETIC_SPAN);
  tree.add_child_to_back(n, expr);
  n
}

pub fn assign(tree: &mut Tree, target: NodeId, value: NodeId) -> NodeId {
  let n = tree.alloc(Kind::Assign, SYNTHETIC_SPAN);
  tree.add_child_to_back(n, target);
  tree.add_child_to_back(n, value);
  n
}

pub fn object_lit(tree: &mut Tree, props: Vec<NodeId>) -> NodeId {
  let n = tree.alloc(Kind::ObjectLit, SYNTHETIC_SPAN);
  for prop in props {
    tree.add_child_to_back(n, prop);
  }
  n
}

pub fn object_pattern(tree: &mut Tree, props: Vec<NodeId>) -> NodeId {
  let n = tree.alloc(Kind::ObjectPattern, SYNTHETIC_SPAN);
  for prop in props {
    tree.add_child_to_back(n, prop);
  }
  n
}

pub fn destructuring_lhs(tree: &mut Tree, pattern: NodeId, value: NodeId) -> NodeId {
  let n = tree.alloc(Kind::DestructuringLhs, SYNTHETIC_SPAN);
  tree.add_child_to_back(n, pattern);
  tree.add_child_to_back(n, value);
  n
}

/// `var <binding>;` or `var <binding> = <value>;`. The value attaches under
/// the binding name, mirroring the name-declaration child shape.
pub fn var_decl(tree: &mut Tree, binding: NodeId, value: Option<NodeId>) -> NodeId {
  decl(tree, Kind::Var, binding, value)
}

pub fn decl(tree: &mut Tree, kind: Kind, binding: NodeId, value: Option<NodeId>) -> NodeId {
  debug_assert!(kind.is_name_declaration());
  if let Some(value) = value {
    tree.add_child_to_back(binding, value);
  }
  let n = tree.alloc(kind, SYNTHETIC_SPAN);
  tree.add_child_to_back(n, binding);
  n
}

pub fn block(tree: &mut Tree, stmts: Vec<NodeId>) -> NodeId {
  let n = tree.alloc(Kind::Block, SYNTHETIC_SPAN);
  for stmt in stmts {
    tree.add_child_to_back(n, stmt);
  }
  n
}

pub fn param_list(tree: &mut Tree, params: Vec<NodeId>) -> NodeId {
  let n = tree.alloc(Kind::ParamList, SYNTHETIC_SPAN);
  for param in params {
    tree.add_child_to_back(n, param);
  }
  n
}

/// `function <name>(<params>) { <body> }`. Anonymous functions get an empty
/// name payload.
pub fn function(tree: &mut Tree, fn_name: &str, params: NodeId, body: NodeId) -> NodeId {
  let n = tree.alloc(Kind::Function, SYNTHETIC_SPAN);
  let name_node = name(tree, fn_name);
  tree.add_child_to_back(n, name_node);
  tree.add_child_to_back(n, params);
  tree.add_child_to_back(n, body);
  n
}

/// `class <name> { }` with an empty heritage slot.
pub fn class(tree: &mut Tree, class_name: &str, body: NodeId) -> NodeId {
  let n = tree.alloc(Kind::Class, SYNTHETIC_SPAN);
  let name_node = name(tree, class_name);
  let heritage = empty(tree);
  tree.add_child_to_back(n, name_node);
  tree.add_child_to_back(n, heritage);
  tree.add_child_to_back(n, body);
  n
}

pub fn return_stmt(tree: &mut Tree, value: Option<NodeId>) -> NodeId {
  let n = tree.alloc(Kind::Return, SYNTHETIC_SPAN);
  if let Some(value) = value {
    tree.add_child_to_back(n, value);
  }
  n
}

pub fn script(tree: &mut Tree, stmts: Vec<NodeId>) -> NodeId {
  let n = tree.alloc(Kind::Script, SYNTHETIC_SPAN);
  for stmt in stmts {
    tree.add_child_to_back(n, stmt);
  }
  n
}

pub fn module_body(tree: &mut Tree, stmts: Vec<NodeId>) -> NodeId {
  let n = tree.alloc(Kind::ModuleBody, SYNTHETIC_SPAN);
  for stmt in stmts {
    tree.add_child_to_back(n, stmt);
  }
  n
}

pub fn root(tree: &mut Tree, scripts: Vec<NodeId>) -> NodeId {
  let n = tree.alloc(Kind::Root, SYNTHETIC_SPAN);
  for s in scripts {
    tree.add_child_to_back(n, s);
  }
  n
}

/// Builds the statement declaring a (possibly dotted) name: a plain name
/// produces `var name = rhs;`, a dotted name produces
/// `name.path = rhs;` (or a bare qualified-name statement without a rhs).
pub fn qname_declaration(
  tree: &mut Tree,
  dotted: &str,
  rhs: Option<NodeId>,
  jsdoc: Option<crate::JsDoc>,
) -> NodeId {
  let stmt = if dotted.contains('.') {
    let target = qname(tree, dotted);
    let expr = match rhs {
      Some(rhs) => assign(tree, target, rhs),
      None => target,
    };
    expr_result(tree, expr)
  } else {
    let binding = name(tree, dotted);
    var_decl(tree, binding, rhs)
  };
  if let Some(jsdoc) = jsdoc {
    tree.set_jsdoc(stmt, jsdoc);
  }
  stmt
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dump::dump;
  use proptest::prelude::*;

  #[test]
  fn qname_declaration_shapes() {
    let mut tree = Tree::new();
    let rhs = number(&mut tree, "1");
    let plain = qname_declaration(&mut tree, "x", Some(rhs), None);
    assert_eq!(tree.kind(plain), Kind::Var);

    let rhs = number(&mut tree, "1");
    let dotted = qname_declaration(&mut tree, "a.b", Some(rhs), None);
    assert_eq!(tree.kind(dotted), Kind::ExprResult);
    let assign = tree.first_child(dotted).unwrap();
    assert_eq!(tree.kind(assign), Kind::Assign);
    let target = tree.first_child(assign).unwrap();
    assert_eq!(tree.qualified_name(target).as_deref(), Some("a.b"));

    let bare = qname_declaration(&mut tree, "a.b.c", None, None);
    assert_eq!(tree.kind(bare), Kind::ExprResult);
    let target = tree.first_child(bare).unwrap();
    assert_eq!(tree.qualified_name(target).as_deref(), Some("a.b.c"));
  }

  #[test]
  fn dump_is_readable() {
    let mut tree = Tree::new();
    let callee = qname(&mut tree, "goog.provide");
    let arg = string(&mut tree, "a.b");
    let call_node = call(&mut tree, callee, vec![arg]);
    let stmt = expr_result(&mut tree, call_node);
    let script_node = script(&mut tree, vec![stmt]);
    let rendered = dump(&tree, script_node);
    assert!(rendered.contains("Script"));
    assert!(rendered.contains("Str \"a.b\""));
  }

  proptest! {
    #[test]
    fn qname_round_trips(segments in proptest::collection::vec("[a-z$][a-z0-9$]{0,6}", 1..6)) {
      let dotted = segments.join(".");
      let mut tree = Tree::new();
      let node = qname(&mut tree, &dotted);
      prop_assert!(tree.is_qualified_name(node));
      prop_assert_eq!(tree.qualified_name(node), Some(dotted));
    }
  }
}
