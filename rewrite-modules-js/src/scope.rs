//! Syntactic scope tracking for the rewriting traversals.
//!
//! The recorder and updater need lexical answers at arbitrary tree positions:
//! which binding a name resolves to, whether a statement sits at the top of
//! the current hoist scope, and whether the traversal is currently in global
//! or module position. Scopes are created on entry to a scope root and
//! populated up front: `var` declarations hoist through blocks to the
//! nearest script, module body or function, while `let`/`const`/`class`/
//! `function` bind at their own block level, so later statements are visible
//! from earlier positions the way hoisting makes them in the language.
//!
//! This is a deliberately syntactic model (no TDZ, no `with`/`eval`
//! dynamics); every question the rewriter asks is positional.

use ahash::HashMap;
use ahash::HashMapExt;
use tree_js::Kind;
use tree_js::NodeId;
use tree_js::Tree;

/// Identity of a scope within one [`ScopeTracker`] traversal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeId(u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeKind {
  Global,
  Module,
  Function,
  Block,
}

impl ScopeKind {
  pub fn is_hoist(self) -> bool {
    !matches!(self, ScopeKind::Block)
  }
}

/// A name binding: where it was declared and in which scope.
#[derive(Clone, Debug)]
pub struct Binding {
  pub name: String,
  /// The `Name` node that introduces the binding.
  pub name_node: NodeId,
  /// The declaring statement-level node (`Var`/`Let`/`Const`/`Function`/
  /// `Class`) or the `ParamList` for parameters.
  pub decl_node: NodeId,
  pub scope: ScopeId,
}

struct ScopeData {
  root: NodeId,
  kind: ScopeKind,
  depth: u32,
  vars: HashMap<String, Binding>,
}

#[derive(Default)]
pub struct ScopeTracker {
  scopes: Vec<ScopeData>,
  stack: Vec<ScopeId>,
}

/// Whether traversal entering this node opens a new scope.
pub fn creates_scope(tree: &Tree, n: NodeId) -> bool {
  match tree.kind(n) {
    Kind::Script | Kind::ModuleBody | Kind::Function => true,
    // A function's body block is merged into the function scope.
    Kind::Block => tree.parent(n).map(|p| tree.kind(p)) != Some(Kind::Function),
    _ => false,
  }
}

impl ScopeTracker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reset(&mut self) {
    self.scopes.clear();
    self.stack.clear();
  }

  pub fn enter(&mut self, tree: &Tree, n: NodeId) {
    let kind = match tree.kind(n) {
      Kind::Script => ScopeKind::Global,
      Kind::ModuleBody => ScopeKind::Module,
      Kind::Function => ScopeKind::Function,
      Kind::Block => ScopeKind::Block,
      other => unreachable!("{:?} does not open a scope", other),
    };
    let id = ScopeId(self.scopes.len() as u32);
    self.scopes.push(ScopeData {
      root: n,
      kind,
      depth: self.stack.len() as u32,
      vars: HashMap::new(),
    });
    self.stack.push(id);
    match kind {
      ScopeKind::Global | ScopeKind::Module => {
        self.collect_hoisted(tree, n, id);
        self.collect_lexical(tree, n, id);
      }
      ScopeKind::Function => {
        if let Some(params) = tree.second_child(n) {
          if tree.kind(params) == Kind::ParamList {
            let mut names = Vec::new();
            for &param in tree.children(params) {
              collect_pattern_names(tree, param, &mut names);
            }
            for name_node in names {
              self.declare(tree, id, name_node, params);
            }
          }
        }
        if let Some(body) = tree.last_child(n) {
          if tree.kind(body) == Kind::Block {
            self.collect_hoisted(tree, body, id);
            self.collect_lexical(tree, body, id);
          }
        }
      }
      ScopeKind::Block => {
        self.collect_lexical(tree, n, id);
      }
    }
  }

  pub fn exit(&mut self, _tree: &Tree, _n: NodeId) {
    self.stack.pop().expect("scope stack underflow");
  }

  fn declare(&mut self, tree: &Tree, scope: ScopeId, name_node: NodeId, decl_node: NodeId) {
    let name = tree.string(name_node).to_string();
    if name.is_empty() {
      return;
    }
    let data = &mut self.scopes[scope.0 as usize];
    data.vars.entry(name.clone()).or_insert(Binding {
      name,
      name_node,
      decl_node,
      scope,
    });
  }

  fn collect_hoisted(&mut self, tree: &Tree, container: NodeId, scope: ScopeId) {
    let children: Vec<NodeId> = tree.children(container).to_vec();
    for child in children {
      self.collect_hoisted_in(tree, child, scope);
    }
  }

  fn collect_hoisted_in(&mut self, tree: &Tree, n: NodeId, scope: ScopeId) {
    match tree.kind(n) {
      Kind::Var => {
        for name_node in tree.decl_lhs_names(n) {
          self.declare(tree, scope, name_node, n);
        }
      }
      // Nested closures and module bodies own their `var`s.
      Kind::Function | Kind::Class | Kind::ModuleBody => {}
      _ => {
        let children: Vec<NodeId> = tree.children(n).to_vec();
        for child in children {
          self.collect_hoisted_in(tree, child, scope);
        }
      }
    }
  }

  fn collect_lexical(&mut self, tree: &Tree, container: NodeId, scope: ScopeId) {
    let children: Vec<NodeId> = tree.children(container).to_vec();
    for stmt in children {
      match tree.kind(stmt) {
        Kind::Let | Kind::Const => {
          for name_node in tree.decl_lhs_names(stmt) {
            self.declare(tree, scope, name_node, stmt);
          }
        }
        Kind::Function | Kind::Class => {
          if let Some(name_node) = tree.first_child(stmt) {
            if tree.kind(name_node) == Kind::Name {
              self.declare(tree, scope, name_node, stmt);
            }
          }
        }
        _ => {}
      }
    }
  }

  pub fn get_var(&self, name: &str) -> Option<&Binding> {
    self
      .stack
      .iter()
      .rev()
      .find_map(|id| self.scopes[id.0 as usize].vars.get(name))
  }

  pub fn scope_kind(&self, scope: ScopeId) -> ScopeKind {
    self.scopes[scope.0 as usize].kind
  }

  pub fn scope_root(&self, scope: ScopeId) -> NodeId {
    self.scopes[scope.0 as usize].root
  }

  pub fn scope_depth(&self, scope: ScopeId) -> u32 {
    self.scopes[scope.0 as usize].depth
  }

  pub fn current_depth(&self) -> u32 {
    self.stack.len().saturating_sub(1) as u32
  }

  /// Root node of the nearest enclosing hoist scope (script, module body or
  /// function).
  pub fn closest_hoist_scope_root(&self) -> Option<NodeId> {
    self
      .stack
      .iter()
      .rev()
      .map(|id| &self.scopes[id.0 as usize])
      .find(|s| s.kind.is_hoist())
      .map(|s| s.root)
  }

  /// Whether the innermost scope is the global (plain script) scope.
  pub fn in_global_scope(&self) -> bool {
    self
      .stack
      .last()
      .is_some_and(|id| self.scopes[id.0 as usize].kind == ScopeKind::Global)
  }

  /// Whether the innermost scope is a module body scope.
  pub fn in_module_scope(&self) -> bool {
    self
      .stack
      .last()
      .is_some_and(|id| self.scopes[id.0 as usize].kind == ScopeKind::Module)
  }
}

fn collect_pattern_names(tree: &Tree, n: NodeId, out: &mut Vec<NodeId>) {
  match tree.kind(n) {
    Kind::Name => out.push(n),
    Kind::ObjectPattern | Kind::ArrayPattern | Kind::StringKey | Kind::ComputedProp => {
      for &child in tree.children(n) {
        collect_pattern_names(tree, child, out);
      }
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tree_js::build;

  fn walk_to<'t>(
    tracker: &mut ScopeTracker,
    tree: &'t Tree,
    from: NodeId,
    target: NodeId,
  ) -> bool {
    if creates_scope(tree, from) {
      tracker.enter(tree, from);
    }
    if from == target {
      return true;
    }
    for &child in tree.children(from) {
      if walk_to(tracker, tree, child, target) {
        return true;
      }
    }
    if creates_scope(tree, from) {
      tracker.exit(tree, from);
    }
    false
  }

  #[test]
  fn hoisted_vars_are_visible_before_their_statement() {
    let mut tree = Tree::new();
    let first = build::empty(&mut tree);
    let binding = build::name(&mut tree, "later");
    let one = build::number(&mut tree, "1");
    let decl = build::var_decl(&mut tree, binding, Some(one));
    let body = build::module_body(&mut tree, vec![first, decl]);
    let script = build::script(&mut tree, vec![body]);
    tree.put_bool_prop(script, tree_js::BoolProp::GoogModule, true);

    let mut tracker = ScopeTracker::new();
    assert!(walk_to(&mut tracker, &tree, script, first));
    let var = tracker.get_var("later").expect("hoisted var visible");
    assert_eq!(var.name_node, binding);
    assert_eq!(tracker.scope_kind(var.scope), ScopeKind::Module);
    assert!(tracker.in_module_scope());
    assert_eq!(tracker.closest_hoist_scope_root(), Some(body));
  }

  #[test]
  fn function_scope_shadows_module_scope() {
    let mut tree = Tree::new();
    let outer_binding = build::name(&mut tree, "x");
    let outer = build::var_decl(&mut tree, outer_binding, None);
    let inner_binding = build::name(&mut tree, "x");
    let inner = build::var_decl(&mut tree, inner_binding, None);
    let probe = build::empty(&mut tree);
    let fn_body = build::block(&mut tree, vec![inner, probe]);
    let params = build::param_list(&mut tree, vec![]);
    let f = build::function(&mut tree, "f", params, fn_body);
    let body = build::module_body(&mut tree, vec![outer, f]);
    let script = build::script(&mut tree, vec![body]);

    let mut tracker = ScopeTracker::new();
    assert!(walk_to(&mut tracker, &tree, script, probe));
    let var = tracker.get_var("x").expect("x resolves");
    assert_eq!(var.name_node, inner_binding);
    assert_eq!(tracker.scope_kind(var.scope), ScopeKind::Function);
    assert!(!tracker.in_module_scope());
    assert_eq!(tracker.closest_hoist_scope_root(), Some(f));
    let f_binding = tracker.get_var("f").expect("function name visible");
    assert_eq!(tracker.scope_kind(f_binding.scope), ScopeKind::Module);
  }

  #[test]
  fn params_and_block_lexicals() {
    let mut tree = Tree::new();
    let probe = build::empty(&mut tree);
    let c_binding = build::name(&mut tree, "c");
    let c_decl = build::decl(&mut tree, Kind::Const, c_binding, None);
    let block = build::block(&mut tree, vec![c_decl, probe]);
    let param = build::name(&mut tree, "p");
    let params = build::param_list(&mut tree, vec![param]);
    let fn_body = build::block(&mut tree, vec![block]);
    let f = build::function(&mut tree, "f", params, fn_body);
    let script = build::script(&mut tree, vec![f]);

    let mut tracker = ScopeTracker::new();
    assert!(walk_to(&mut tracker, &tree, script, probe));
    assert!(tracker.get_var("p").is_some());
    let c = tracker.get_var("c").expect("block const visible");
    assert_eq!(tracker.scope_kind(c.scope), ScopeKind::Block);
    assert!(tracker.scope_depth(c.scope) > tracker.scope_depth(tracker.get_var("p").unwrap().scope));
    assert_eq!(tracker.closest_hoist_scope_root(), Some(f));
    assert!(!tracker.in_global_scope());
  }

  #[test]
  fn global_scope_detection() {
    let mut tree = Tree::new();
    let probe = build::empty(&mut tree);
    let script = build::script(&mut tree, vec![probe]);
    let mut tracker = ScopeTracker::new();
    assert!(walk_to(&mut tracker, &tree, script, probe));
    assert!(tracker.in_global_scope());
    assert_eq!(tracker.closest_hoist_scope_root(), Some(script));
  }
}
