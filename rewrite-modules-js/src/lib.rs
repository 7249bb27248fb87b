//! Rewrites `goog.module` files into flat, fully-qualified names.
//!
//! ```text
//! goog.module('foo.Bar');
//! var Baz = goog.require('foo.Baz');
//! var local = 1;
//! exports.Bar = class { };
//! ```
//!
//! becomes
//!
//! ```text
//! var module$exports$foo$Bar = {};
//! var module$contents$foo$Bar_local = 1;
//! module$exports$foo$Bar.Bar = class { };
//! ```
//!
//! with every use of the `Baz` alias replaced by `module$exports$foo$Baz`.
//! Modules that call `goog.module.declareLegacyNamespace()` keep their dotted
//! namespace and are lowered to the `goog.provide` form the downstream
//! closure-primitive pass consumes.
//!
//! The pass runs in two phases over every script of a compilation: the
//! recorder builds per-script descriptions and the cross-script
//! [`GlobalRewriteState`]; the updater then rewrites each script against the
//! complete state. Recording must finish for *all* scripts before any
//! updating, because alias and qualified-name decisions depend on the full
//! set of declared namespaces. [`ModuleRewriter::hot_swap_script`] replays
//! both phases for a single edited script after withdrawing its previous
//! registrations.

pub mod diag;
mod jsdoc_rewrite;
mod record;
pub mod scope;
pub mod state;
mod unwrap;
mod update;

pub use state::is_module_content;
pub use state::is_module_export;
pub use state::GlobalRewriteState;
pub use state::ScriptDescription;
pub use state::ScriptId;
pub use state::MODULE_CONTENTS_PREFIX;
pub use state::MODULE_EXPORTS_PREFIX;

use ahash::HashSet;
use diagnostics::Diagnostic;
use diagnostics::Diagnostics;
use scope::ScopeTracker;
use state::ScriptDescription as Description;
use std::collections::VecDeque;
use tree_js::Kind;
use tree_js::NodeId;
use tree_js::Tree;

/// Records the structural consequences of a run so downstream passes can
/// invalidate per-scope caches: every change scope root (function or script)
/// that was touched, and every function wrapper that was deleted outright.
#[derive(Default, Debug)]
pub struct ChangeLog {
  changed_scope_roots: Vec<NodeId>,
  seen: HashSet<NodeId>,
  deleted_functions: Vec<NodeId>,
}

impl ChangeLog {
  pub fn record_scope_change(&mut self, scope_root: NodeId) {
    if self.seen.insert(scope_root) {
      self.changed_scope_roots.push(scope_root);
    }
  }

  pub fn record_function_deleted(&mut self, function: NodeId) {
    self.deleted_functions.push(function);
  }

  pub fn changed_scope_roots(&self) -> &[NodeId] {
    &self.changed_scope_roots
  }

  pub fn deleted_functions(&self) -> &[NodeId] {
    &self.deleted_functions
  }

  pub fn is_empty(&self) -> bool {
    self.changed_scope_roots.is_empty() && self.deleted_functions.is_empty()
  }
}

/// Optional consumer of `goog.module`/`goog.require` reference nodes removed
/// by the pass, so preprocessor-level symbol tables can still index them.
pub trait SymbolTableSink {
  fn add_reference(&mut self, tree: &Tree, node: NodeId);
}

/// A `goog.require`-like call whose target namespace was unknown at record
/// time; categorized after recording as late or missing.
pub(crate) struct UnrecognizedRequire {
  pub node: NodeId,
  pub namespace: String,
  pub must_be_ordered: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Phase {
  Record,
  Update,
}

/// The pass. Owns the per-run traversal state; global registries and the
/// diagnostics sink are borrowed from the host so they outlive single runs
/// (hot-swap reuses both).
pub struct ModuleRewriter<'a> {
  pub(crate) tree: &'a mut Tree,
  pub(crate) state: &'a mut GlobalRewriteState,
  pub(crate) diagnostics: &'a mut Diagnostics,
  pub(crate) changes: ChangeLog,
  pub(crate) symbols: Option<&'a mut dyn SymbolTableSink>,
  pub(crate) script_stack: Vec<ScriptId>,
  pub(crate) scopes: ScopeTracker,
  pub(crate) unrecognized_requires: Vec<UnrecognizedRequire>,
}

impl<'a> ModuleRewriter<'a> {
  pub fn new(
    tree: &'a mut Tree,
    state: &'a mut GlobalRewriteState,
    diagnostics: &'a mut Diagnostics,
  ) -> Self {
    Self {
      tree,
      state,
      diagnostics,
      changes: ChangeLog::default(),
      symbols: None,
      script_stack: Vec::new(),
      scopes: ScopeTracker::new(),
      unrecognized_requires: Vec::new(),
    }
  }

  pub fn with_symbol_sink(mut self, sink: &'a mut dyn SymbolTableSink) -> Self {
    self.symbols = Some(sink);
    self
  }

  pub fn change_log(&self) -> &ChangeLog {
    &self.changes
  }

  pub fn into_change_log(self) -> ChangeLog {
    self.changes
  }

  /// Processes a batch of scripts under one `Root` node: unwraps inline
  /// `goog.loadModule` forms, records every script, reports unresolved
  /// requires, and (absent halting errors) updates every script.
  pub fn process(&mut self, root: NodeId) {
    assert_eq!(self.tree.kind(root), Kind::Root, "expected a Root node");
    let scripts: Vec<NodeId> = self.tree.children(root).to_vec();
    for &script in &scripts {
      self.unwrap_goog_load_module(script);
    }

    let mut queue: VecDeque<ScriptId> = VecDeque::new();
    for &script in &scripts {
      assert_eq!(self.tree.kind(script), Kind::Script, "expected a Script");
      let id = self.state.alloc_script(Description::new_script(script));
      self.push_script(id);
      queue.push_back(id);
      self.scopes.reset();
      self.traverse(script, Phase::Record);
      self.pop_script();
    }

    self.report_unrecognized_requires();
    if self.diagnostics.has_halting_errors() {
      return;
    }

    for &script in &scripts {
      let id = queue.pop_front().expect("one description per script");
      self.push_script(id);
      self.scopes.reset();
      self.traverse(script, Phase::Update);
      self.pop_script();
    }
  }

  /// Re-runs the pass for a single replaced script: withdraws the previous
  /// registrations keyed by `original_root`, then records and updates the
  /// replacement.
  pub fn hot_swap_script(&mut self, script_root: NodeId, original_root: NodeId) {
    assert_eq!(self.tree.kind(script_root), Kind::Script, "expected a Script");
    self.unwrap_goog_load_module(script_root);
    self.state.remove_root(original_root);

    let id = self
      .state
      .alloc_script(Description::new_script(script_root));
    self.push_script(id);
    self.scopes.reset();
    self.traverse(script_root, Phase::Record);

    if self.diagnostics.has_halting_errors() {
      self.pop_script();
      return;
    }

    self.scopes.reset();
    self.traverse(script_root, Phase::Update);
    self.pop_script();

    self.report_unrecognized_requires();
  }

  pub(crate) fn current_id(&self) -> ScriptId {
    *self.script_stack.last().expect("a script is being processed")
  }

  pub(crate) fn current(&self) -> &ScriptDescription {
    self.state.script(self.current_id())
  }

  pub(crate) fn current_mut(&mut self) -> &mut ScriptDescription {
    let id = self.current_id();
    self.state.script_mut(id)
  }

  /// Pushes a description as the current script, queueing it as a child of
  /// the previous current script (nested `goog.loadModule` modules flow from
  /// recording into updating through this queue).
  pub(crate) fn push_script(&mut self, id: ScriptId) {
    if let Some(&parent) = self.script_stack.last() {
      self.state.script_mut(parent).child_scripts.push_back(id);
    }
    self.script_stack.push(id);
  }

  pub(crate) fn pop_script(&mut self) {
    self.script_stack.pop().expect("script stack underflow");
  }

  pub(crate) fn traverse(&mut self, n: NodeId, phase: Phase) {
    let was_attached = self.tree.parent(n).is_some();
    let descend = match phase {
      Phase::Record => self.record_enter(n),
      Phase::Update => self.update_enter(n),
    };
    if !descend {
      return;
    }
    if was_attached && self.tree.parent(n).is_none() {
      // The enter handler removed this node; nothing below it needs work.
      return;
    }

    let scoped = scope::creates_scope(self.tree, n);
    if scoped {
      self.scopes.enter(self.tree, n);
    }

    // Capture the next sibling before visiting each child: handlers may
    // detach the child's statement or replace the child in place, and
    // freshly inserted statements must not be re-traversed.
    let mut child = self.tree.first_child(n);
    while let Some(c) = child {
      let next = self.tree.next_sibling(c);
      self.traverse(c, phase);
      child = next.filter(|&sibling| self.tree.parent(sibling).is_some());
    }

    match phase {
      Phase::Record => self.record_exit(n),
      Phase::Update => self.update_exit(n),
    }
    if scoped {
      self.scopes.exit(self.tree, n);
    }
  }

  pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
    self.diagnostics.report(diagnostic);
  }

  pub(crate) fn report_change_to_enclosing_scope(&mut self, n: NodeId) {
    if let Some(root) = self.tree.enclosing_change_scope_root(n) {
      self.changes.record_scope_change(root);
    }
  }

  /// Whether the statement sits at the top of the current script or module
  /// body, as seen from the nearest hoist scope.
  pub(crate) fn is_top_level_exec(&self) -> bool {
    self.scopes.closest_hoist_scope_root() == Some(self.current().root())
  }

  /// Whether the node is a direct child of the current script or module
  /// body.
  pub(crate) fn is_top_level_block(&self, n: NodeId) -> bool {
    self.tree.parent(n) == Some(self.current().root())
  }

  pub(crate) fn maybe_add_to_symbol_table(&mut self, n: NodeId) {
    if let Some(sink) = self.symbols.as_deref_mut() {
      sink.add_reference(self.tree, n);
    }
  }

  /// A fresh module-name string node mirroring the `goog.module` /
  /// `goog.require` argument, fed to the symbol sink before the call is
  /// removed.
  pub(crate) fn create_namespace_node(&mut self, arg: NodeId) -> NodeId {
    let text = self.tree.string(arg).to_string();
    let span = self.tree.span(arg);
    let node = tree_js::build::string(self.tree, text);
    self.tree.set_span(node, span);
    self
      .tree
      .put_bool_prop(node, tree_js::BoolProp::IsModuleName, true);
    node
  }

  /// Categorizes and reports the requires whose namespace was unknown during
  /// recording: never-defined targets are `MISSING_MODULE_OR_PROVIDE` (and
  /// the statement is removed so downstream passes do not re-report);
  /// targets that exist but were recorded later are `LATE_PROVIDE_ERROR`
  /// when ordering matters. The queue is cleared so hot-swap recompiles
  /// report only new problems.
  pub(crate) fn report_unrecognized_requires(&mut self) {
    let pending = std::mem::take(&mut self.unrecognized_requires);
    for unrecognized in pending {
      let module_exists = self.state.contains_module(&unrecognized.namespace);
      let legacy_exists = self
        .state
        .is_legacy_script_namespace(&unrecognized.namespace);

      if !module_exists && !legacy_exists {
        let span = self.tree.span(unrecognized.node);
        self.report(diag::missing_module_or_provide(
          &unrecognized.namespace,
          span,
        ));
        if let Some(statement) = try_enclosing_statement(self.tree, unrecognized.node) {
          self.tree.detach(statement);
        }
        continue;
      }

      if unrecognized.must_be_ordered {
        let span = self.tree.span(unrecognized.node);
        self.report(diag::late_provide_error(&unrecognized.namespace, span));
      }
    }
  }
}

/// Convenience entry point: rewrite every script under `root` with a fresh
/// global state, returning the change log.
pub fn rewrite_modules(
  tree: &mut Tree,
  root: NodeId,
  state: &mut GlobalRewriteState,
  diagnostics: &mut Diagnostics,
) -> ChangeLog {
  let mut rewriter = ModuleRewriter::new(tree, state, diagnostics);
  rewriter.process(root);
  rewriter.into_change_log()
}

/// Like [`Tree::enclosing_statement`], but tolerates nodes already detached
/// from any statement container.
pub(crate) fn try_enclosing_statement(tree: &Tree, n: NodeId) -> Option<NodeId> {
  let mut cur = n;
  loop {
    if tree.is_statement(cur) {
      return Some(cur);
    }
    cur = tree.parent(cur)?;
  }
}

/// Whether `n` is a call whose callee matches the given dotted name.
pub(crate) fn is_call_to(tree: &Tree, n: NodeId, dotted: &str) -> bool {
  if tree.kind(n) != Kind::Call {
    return false;
  }
  let Some(callee) = tree.first_child(n) else {
    return false;
  };
  tree.kind(callee) == Kind::GetProp && tree.matches_qualified_name(callee, dotted)
}

/// Whether `n` is the target of an assignment (`n = ...`).
pub(crate) fn is_assign_target(tree: &Tree, n: NodeId) -> bool {
  tree
    .parent(n)
    .is_some_and(|p| tree.kind(p) == Kind::Assign && tree.first_child(p) == Some(n))
}

/// Whether `n` is a bare expression statement (`n;`), the shape of a
/// `@typedef` export.
pub(crate) fn is_typedef_target(tree: &Tree, n: NodeId) -> bool {
  tree
    .parent(n)
    .is_some_and(|p| tree.kind(p) == Kind::ExprResult && tree.first_child(p) == Some(n))
}

/// Whether the getprop is `exports.<name>` in assignment or typedef target
/// position. `exports.name.foo = value` is an assignment to a property of an
/// exported value, not an export.
pub(crate) fn is_export_property_assignment(tree: &Tree, n: NodeId) -> bool {
  if !is_assign_target(tree, n) && !is_typedef_target(tree, n) {
    return false;
  }
  let Some(target) = tree.first_child(n) else {
    return false;
  };
  tree.kind(target) == Kind::Name && tree.string(target) == "exports"
}

/// Whether the script holds (or held) a `goog.module` file: its first child
/// is a module body.
pub(crate) fn is_goog_module_file(tree: &Tree, n: NodeId) -> bool {
  tree.kind(n) == Kind::Script
    && tree
      .first_child(n)
      .is_some_and(|c| tree.kind(c) == Kind::ModuleBody)
}
