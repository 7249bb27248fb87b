//! Shared builders for the rewrite integration tests. Input trees are built
//! through `tree_js::build` in the shapes the parser (out of scope here)
//! would produce: module files are scripts with a module-body child and the
//! `GoogModule` marker.

use diagnostics::Diagnostics;
use rewrite_modules_js::rewrite_modules;
use rewrite_modules_js::ChangeLog;
use rewrite_modules_js::GlobalRewriteState;
use tree_js::build;
use tree_js::dump::dump;
use tree_js::BoolProp;
use tree_js::Kind;
use tree_js::NodeId;
use tree_js::Tree;

pub fn goog_call(tree: &mut Tree, callee: &str, namespace: &str) -> NodeId {
  let callee = build::qname(tree, callee);
  let argument = build::string(tree, namespace);
  build::call(tree, callee, vec![argument])
}

/// `goog.<method>('<namespace>');`
pub fn goog_stmt(tree: &mut Tree, callee: &str, namespace: &str) -> NodeId {
  let call = goog_call(tree, callee, namespace);
  build::expr_result(tree, call)
}

/// `var <name> = goog.require('<namespace>');`
pub fn require_var(tree: &mut Tree, name: &str, namespace: &str) -> NodeId {
  let call = goog_call(tree, "goog.require", namespace);
  let binding = build::name(tree, name);
  build::var_decl(tree, binding, Some(call))
}

/// `const {a, b: local} = goog.require('<namespace>');`
pub fn require_destructuring(
  tree: &mut Tree,
  fields: &[(&str, Option<&str>)],
  namespace: &str,
) -> NodeId {
  let mut keys = Vec::new();
  for &(field, local) in fields {
    let key = build::string_key(tree, field);
    let binding = build::name(tree, local.unwrap_or(field));
    tree.add_child_to_back(key, binding);
    keys.push(key);
  }
  let pattern = build::object_pattern(tree, keys);
  let call = goog_call(tree, "goog.require", namespace);
  let lhs = build::destructuring_lhs(tree, pattern, call);
  let declaration = tree.alloc(Kind::Const, tree_js::SYNTHETIC_SPAN);
  tree.add_child_to_back(declaration, lhs);
  declaration
}

/// `exports = <rhs>;`
pub fn exports_assign(tree: &mut Tree, rhs: NodeId) -> NodeId {
  let exports = build::name(tree, "exports");
  let assign = build::assign(tree, exports, rhs);
  build::expr_result(tree, assign)
}

/// `exports.<name> = <rhs>;`
pub fn exports_prop_assign(tree: &mut Tree, name: &str, rhs: NodeId) -> NodeId {
  let exports = build::name(tree, "exports");
  let target = build::getprop(tree, exports, name);
  let assign = build::assign(tree, target, rhs);
  build::expr_result(tree, assign)
}

/// A goog.module file: a script holding one module body, marked the way the
/// parser marks module files.
pub fn module_script(tree: &mut Tree, statements: Vec<NodeId>) -> NodeId {
  let body = build::module_body(tree, statements);
  let script = build::script(tree, vec![body]);
  tree.put_bool_prop(script, BoolProp::GoogModule, true);
  script
}

pub fn process(tree: &mut Tree, root: NodeId) -> (GlobalRewriteState, Diagnostics, ChangeLog) {
  let mut state = GlobalRewriteState::new();
  let mut diagnostics = Diagnostics::new();
  let changes = rewrite_modules(tree, root, &mut state, &mut diagnostics);
  (state, diagnostics, changes)
}

pub fn assert_no_errors(diagnostics: &Diagnostics) {
  assert!(
    !diagnostics.has_halting_errors(),
    "unexpected errors: {:?}",
    diagnostics.codes()
  );
}

pub fn assert_tree(tree: &Tree, actual: NodeId, expected: NodeId) {
  assert!(
    tree.structurally_equal(actual, expected),
    "tree mismatch\n--- actual ---\n{}--- expected ---\n{}",
    dump(tree, actual),
    dump(tree, expected)
  );
}
