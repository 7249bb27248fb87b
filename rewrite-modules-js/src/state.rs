//! Cross-script rewrite state: the namespace registries shared by every
//! script in a compilation, the per-script descriptions the recorder builds
//! and the updater consumes, and the name mangling scheme.

use crate::scope::Binding;
use crate::scope::ScopeTracker;
use ahash::HashMap;
use ahash::HashSet;
use std::collections::VecDeque;
use tree_js::Kind;
use tree_js::NodeId;
use tree_js::Tree;

pub const MODULE_EXPORTS_PREFIX: &str = "module$exports$";
pub const MODULE_CONTENTS_PREFIX: &str = "module$contents$";

/// `"a.b.c"` → `"module$exports$a$b$c"`.
pub fn to_binary_namespace(legacy_namespace: &str) -> String {
  format!(
    "{}{}",
    MODULE_EXPORTS_PREFIX,
    legacy_namespace.replace('.', "$")
  )
}

/// `"a.b.c"` → `"module$contents$a$b$c_"`.
pub fn to_module_contents_prefix(legacy_namespace: &str) -> String {
  format!(
    "{}{}_",
    MODULE_CONTENTS_PREFIX,
    legacy_namespace.replace('.', "$")
  )
}

/// Whether a flat name is a mangled module exports object.
pub fn is_module_export(name: &str) -> bool {
  name.starts_with(MODULE_EXPORTS_PREFIX)
}

/// Whether a flat name is a content-prefixed module-private name.
pub fn is_module_content(name: &str) -> bool {
  name.starts_with(MODULE_CONTENTS_PREFIX)
}

/// Identity of a [`ScriptDescription`] within one [`GlobalRewriteState`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScriptId(u32);

/// One export of a module: `exports = rhs`, `exports.name = rhs`, or a key of
/// a named-exports object literal.
#[derive(Clone, Debug)]
pub struct ExportDefinition {
  /// `None` for the default export.
  pub export_name: Option<String>,
  /// `None` for `@typedef` exports (`exports.Foo;`).
  pub rhs: Option<NodeId>,
  /// The binding of the exported local, when the rhs is a single name.
  pub name_decl: Option<Binding>,
}

impl ExportDefinition {
  pub fn default_export(tree: &Tree, scopes: &ScopeTracker, rhs: NodeId) -> Self {
    Self::named_export(tree, scopes, None, Some(rhs))
  }

  pub fn named_export(
    tree: &Tree,
    scopes: &ScopeTracker,
    export_name: Option<String>,
    rhs: Option<NodeId>,
  ) -> Self {
    let name_decl = rhs
      .filter(|&r| matches!(tree.kind(r), Kind::Name | Kind::StringKey))
      .and_then(|r| scopes.get_var(tree.string(r)))
      .cloned();
    Self {
      export_name,
      rhs,
      name_decl,
    }
  }

  /// `""` for the default export, `".name"` otherwise.
  pub fn export_postfix(&self) -> String {
    match &self.export_name {
      None => String::new(),
      Some(name) => format!(".{}", name),
    }
  }

  pub fn local_name(&self) -> &str {
    &self.name_decl.as_ref().expect("inlinable export").name
  }

  /// Whether the exported local can be renamed in place instead of emitting
  /// an `exports.x = x` statement: it must be bound by a plain declaration,
  /// not already marked for inlining, and not initialized from a
  /// `goog.require`/`goog.forwardDeclare`/`goog.getMsg` call.
  pub fn has_inlinable_name(
    &self,
    tree: &Tree,
    already_inlined: &HashMap<NodeId, ExportDefinition>,
  ) -> bool {
    let Some(decl) = &self.name_decl else {
      return false;
    };
    if already_inlined.contains_key(&decl.name_node) {
      return false;
    }
    let Some(parent) = tree.parent(decl.name_node) else {
      return false;
    };
    if !matches!(
      tree.kind(parent),
      Kind::Var | Kind::Let | Kind::Const | Kind::Function | Kind::Class
    ) {
      return false;
    }
    let initial_value = match tree.kind(parent) {
      Kind::Function | Kind::Class => Some(parent),
      _ => tree.first_child(decl.name_node),
    };
    let Some(value) = initial_value else {
      return true;
    };
    if tree.kind(value) != Kind::Call {
      return true;
    }
    let Some(callee) = tree.first_child(value) else {
      return true;
    };
    if tree.kind(callee) != Kind::GetProp {
      return true;
    }
    let Some(object) = tree.first_child(callee) else {
      return true;
    };
    if tree.kind(object) != Kind::Name || tree.string(object) != "goog" {
      return true;
    }
    let method = tree
      .second_child(callee)
      .map(|p| tree.string(p))
      .unwrap_or("");
    !matches!(method, "require" | "forwardDeclare" | "getMsg")
  }
}

/// Per-script mutable record built by the recorder and consumed by the
/// updater.
#[derive(Debug, Default)]
pub struct ScriptDescription {
  pub is_module: bool,
  pub declare_legacy_namespace: bool,
  /// `"a.b.c"`, set by `goog.module` or `goog.provide`.
  pub legacy_namespace: Option<String>,
  /// `"module$contents$a$b$c_"`.
  pub contents_prefix: Option<String>,
  /// Identifiers declared at the module's top scope, for content-prefix
  /// renaming.
  pub top_level_names: HashSet<String>,
  /// Sub-scripts (module bodies) in traversal order, carried from recording
  /// into updating.
  pub child_scripts: VecDeque<ScriptId>,
  /// alias identifier → the (possibly dotted) name it inlines to.
  pub names_to_inline_by_alias: HashMap<String, String>,

  // Transient state.
  pub will_create_exports_object: bool,
  pub has_created_export_object: bool,
  pub default_export_rhs: Option<NodeId>,
  pub default_export_local_name: Option<String>,
  pub named_exports: HashSet<String>,
  /// Keyed by the binding name node of the exported local.
  pub exports_to_inline: HashMap<NodeId, ExportDefinition>,

  /// The script node, or the module-body node for modules.
  pub root_node: Option<NodeId>,
}

impl ScriptDescription {
  pub fn new_script(root: NodeId) -> Self {
    Self {
      root_node: Some(root),
      ..Self::default()
    }
  }

  pub fn new_module(root: NodeId) -> Self {
    Self {
      is_module: true,
      root_node: Some(root),
      ..Self::default()
    }
  }

  pub fn root(&self) -> NodeId {
    self.root_node.expect("script description has a root")
  }

  pub fn legacy_namespace(&self) -> &str {
    self
      .legacy_namespace
      .as_deref()
      .expect("namespace was declared")
  }

  pub fn contents_prefix(&self) -> &str {
    self
      .contents_prefix
      .as_deref()
      .expect("contents prefix was derived")
  }

  /// `"module$exports$a$b$c"` for non-legacy modules, `None` otherwise.
  pub fn binary_namespace(&self) -> Option<String> {
    if !self.is_module || self.declare_legacy_namespace {
      return None;
    }
    Some(to_binary_namespace(self.legacy_namespace()))
  }

  /// The name the module's exports are visible under: the dotted legacy
  /// namespace for legacy modules, the binary namespace otherwise.
  pub fn exported_namespace(&self) -> Option<String> {
    if self.declare_legacy_namespace {
      return Some(self.legacy_namespace().to_string());
    }
    self.binary_namespace()
  }
}

/// Process-lifetime registry shared by all scripts of a compilation; survives
/// hot-swap edits.
#[derive(Default, Debug)]
pub struct GlobalRewriteState {
  scripts: Vec<ScriptDescription>,
  scripts_by_namespace: HashMap<String, ScriptId>,
  legacy_script_namespaces: HashSet<String>,
  /// Namespaces registered per enclosing script node, to reverse module
  /// registrations on hot-swap.
  namespaces_by_script_root: HashMap<NodeId, Vec<String>>,
  /// Every `goog.provide`d namespace plus all of its dotted prefixes; a
  /// JSDoc-rewriting hint only, never withdrawn.
  legacy_namespaces_and_prefixes: HashSet<String>,
}

impl GlobalRewriteState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn alloc_script(&mut self, description: ScriptDescription) -> ScriptId {
    let id = ScriptId(self.scripts.len() as u32);
    self.scripts.push(description);
    id
  }

  pub fn script(&self, id: ScriptId) -> &ScriptDescription {
    &self.scripts[id.0 as usize]
  }

  pub fn script_mut(&mut self, id: ScriptId) -> &mut ScriptDescription {
    &mut self.scripts[id.0 as usize]
  }

  pub fn contains_module(&self, legacy_namespace: &str) -> bool {
    self.scripts_by_namespace.contains_key(legacy_namespace)
  }

  pub fn script_id_for_namespace(&self, legacy_namespace: &str) -> Option<ScriptId> {
    self.scripts_by_namespace.get(legacy_namespace).copied()
  }

  pub fn is_legacy_module(&self, legacy_namespace: &str) -> bool {
    let id = self.scripts_by_namespace[legacy_namespace];
    self.script(id).declare_legacy_namespace
  }

  pub fn is_legacy_script_namespace(&self, legacy_namespace: &str) -> bool {
    self.legacy_script_namespaces.contains(legacy_namespace)
  }

  pub fn binary_namespace(&self, legacy_namespace: &str) -> Option<String> {
    let id = self.scripts_by_namespace.get(legacy_namespace)?;
    self.script(*id).binary_namespace()
  }

  /// The flat or dotted name a `goog.require`/`goog.module.get` of this
  /// namespace resolves to: the namespace itself for legacy scripts, the
  /// target module's exported namespace otherwise.
  pub fn exported_namespace_or_script(&self, legacy_namespace: &str) -> Option<String> {
    if self.legacy_script_namespaces.contains(legacy_namespace) {
      return Some(legacy_namespace.to_string());
    }
    let id = self.scripts_by_namespace.get(legacy_namespace)?;
    self.script(*id).exported_namespace()
  }

  pub fn register_module(&mut self, legacy_namespace: &str, id: ScriptId, script_root: NodeId) {
    self
      .scripts_by_namespace
      .insert(legacy_namespace.to_string(), id);
    self
      .namespaces_by_script_root
      .entry(script_root)
      .or_default()
      .push(legacy_namespace.to_string());
  }

  pub fn register_legacy_script(&mut self, legacy_namespace: &str, script_root: NodeId) {
    self
      .legacy_script_namespaces
      .insert(legacy_namespace.to_string());
    self
      .namespaces_by_script_root
      .entry(script_root)
      .or_default()
      .push(legacy_namespace.to_string());
  }

  pub fn add_legacy_prefix(&mut self, prefix: String) {
    self.legacy_namespaces_and_prefixes.insert(prefix);
  }

  pub fn is_legacy_namespace_or_prefix(&self, name: &str) -> bool {
    self.legacy_namespaces_and_prefixes.contains(name)
  }

  /// Withdraws the module registrations contributed by one script root, so a
  /// hot-swapped replacement can re-register without tripping duplicate
  /// detection.
  pub fn remove_root(&mut self, script_root: NodeId) {
    if let Some(namespaces) = self.namespaces_by_script_root.remove(&script_root) {
      for namespace in namespaces {
        self.scripts_by_namespace.remove(&namespace);
      }
    }
  }
}
