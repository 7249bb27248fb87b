//! Updating phase: rewrites each script against the completed global state.
//! Emits binary-namespace declarations, inlines aliases, rewrites `exports`,
//! lowers legacy modules to the `goog.provide` form, and removes the module
//! marker calls.

use crate::diag;
use crate::is_export_property_assignment;
use crate::scope::ScopeKind;
use crate::ModuleRewriter;
use diagnostics::Span;
use diagnostics::TextRange;
use tree_js::build;
use tree_js::BoolProp;
use tree_js::Kind;
use tree_js::NodeId;

/// Where a synthesized statement lands relative to an existing one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum AddAt {
  Before,
  After,
}

impl ModuleRewriter<'_> {
  pub(crate) fn update_enter(&mut self, n: NodeId) -> bool {
    match self.tree.kind(n) {
      Kind::ModuleBody => {
        let parent = self.tree.parent(n).expect("module body under a script");
        if self.tree.get_bool_prop(parent, BoolProp::GoogModule) {
          self.update_module_body_early(n);
        } else {
          return false;
        }
      }

      Kind::Call => {
        if let Some(callee) = self.tree.first_child(n) {
          if self.tree.kind(callee) == Kind::GetProp {
            let parent_is_bare_statement = self
              .tree
              .parent(n)
              .is_some_and(|p| self.tree.kind(p) == Kind::ExprResult);
            match self.tree.qualified_name(callee).as_deref() {
              Some("goog.module") => self.update_goog_module(n),
              Some("goog.module.declareLegacyNamespace") => {
                let statement = self.tree.enclosing_statement(n);
                self.report_change_to_enclosing_scope(statement);
                self.tree.detach(statement);
              }
              Some("goog.require") => self.update_goog_require(n),
              Some("goog.forwardDeclare") if !parent_is_bare_statement => {
                self.update_goog_require(n);
              }
              Some("goog.module.get") => self.update_goog_module_get_call(n),
              _ => {}
            }
          }
        }
      }

      Kind::GetProp => {
        if is_export_property_assignment(self.tree, n) {
          self.update_exports_property_assignment(n);
        } else if self.tree.is_qualified_name(n) {
          self.check_qualified_name(n);
        }
      }

      _ => {}
    }

    if self.tree.jsdoc(n).is_some() {
      self.rewrite_jsdoc(n);
    }

    true
  }

  pub(crate) fn update_exit(&mut self, n: NodeId) {
    match self.tree.kind(n) {
      Kind::ModuleBody => self.update_module_body(n),
      Kind::Name => {
        self.maybe_update_top_level_name(n);
        self.maybe_update_export_declaration(n);
        self.maybe_update_export_name_ref(n);
      }
      _ => {}
    }
  }

  fn update_module_body_early(&mut self, module_body: NodeId) {
    let id = self
      .current_mut()
      .child_scripts
      .pop_front()
      .expect("recording queued this module body");
    self.push_script(id);
    self.current_mut().root_node = Some(module_body);
  }

  fn update_module_body(&mut self, module_body: NodeId) {
    let parent = self.tree.parent(module_body).expect("module body attached");
    assert!(
      self.tree.get_bool_prop(parent, BoolProp::GoogModule),
      "module body outside a goog.module script"
    );
    self.tree.set_kind(module_body, Kind::Block);
    self.tree.merge_block_into_parent(module_body);

    self.update_end_module();
    self.pop_script();
  }

  fn update_end_module(&mut self) {
    if !self.current().exports_to_inline.is_empty() {
      let binary = self
        .current()
        .binary_namespace()
        .expect("only non-legacy modules inline exports");
      let renames: Vec<(NodeId, String)> = self
        .current()
        .exports_to_inline
        .values()
        .map(|export| {
          let name_node = export.name_decl.as_ref().expect("inlinable export").name_node;
          (name_node, format!("{}{}", binary, export.export_postfix()))
        })
        .collect();
      for (name_node, target) in renames {
        self.safe_set_maybe_qualified_string(name_node, &target);
      }
    }
    assert!(self.current().is_module, "module body implies a module");
    assert!(
      self.current().declare_legacy_namespace || self.current().has_created_export_object,
      "module must have produced its exports object"
    );
  }

  fn update_goog_module(&mut self, call: NodeId) {
    assert!(self.current().is_module, "goog.module outside a module");

    if self.current().declare_legacy_namespace {
      // Lower to "goog.provide('...')" for the downstream primitives pass.
      let callee = self.tree.first_child(call).expect("call has a callee");
      let method = self.tree.second_child(callee).expect("getprop has a prop");
      self.tree.set_string(method, "provide");
      self.report_change_to_enclosing_scope(call);
    }

    // If this module never assigns exports, create the exports object as
    // early as possible to avoid ordering issues with goog.define().
    if !self.current().will_create_exports_object {
      assert!(
        !self.current().has_created_export_object,
        "exports object created twice"
      );
      let at = self.tree.enclosing_statement(call);
      self.export_the_empty_binary_namespace_at(at, AddAt::After);
    }

    if !self.current().declare_legacy_namespace {
      self.report_change_to_enclosing_scope(call);
      let statement = self.tree.enclosing_statement(call);
      self.tree.detach(statement);
    }

    let callee = self.tree.first_child(call).expect("call has a callee");
    self.maybe_add_to_symbol_table(callee);
    if let Some(arg) = self.tree.next_sibling(callee) {
      let namespace_node = self.create_namespace_node(arg);
      self.maybe_add_to_symbol_table(namespace_node);
    }
  }

  fn update_goog_require(&mut self, call: NodeId) {
    let namespace_node = self.tree.last_child(call).expect("call has children");
    let namespace = self.tree.string(namespace_node).to_string();
    let statement = self.tree.enclosing_statement(call);

    let target_is_non_legacy_module =
      self.state.contains_module(&namespace) && !self.state.is_legacy_module(&namespace);
    let import_has_alias = self.tree.kind(statement).is_name_declaration();
    let is_destructuring = self
      .tree
      .first_child(statement)
      .is_some_and(|c| self.tree.kind(c) == Kind::DestructuringLhs);
    let current_is_module = self.current().is_module;
    let require_stored_in_alias = self
      .tree
      .grandparent(call)
      .is_some_and(|g| self.tree.kind(g).is_name_declaration());

    if current_is_module && require_stored_in_alias && self.is_top_level_exec() {
      // Record alias -> exported-namespace associations for later inlining.
      let lhs = self.tree.parent(call).expect("call is bound");
      if let Some(exported_namespace) = self.state.exported_namespace_or_script(&namespace) {
        match self.tree.kind(lhs) {
          // `var Foo = goog.require(...)`
          Kind::Name => {
            let alias = self.tree.string(lhs).to_string();
            self.record_name_to_inline(alias, exported_namespace);
          }
          // `const {Foo, Bar: Local} = goog.require(...)`
          Kind::DestructuringLhs
            if self
              .tree
              .first_child(lhs)
              .is_some_and(|p| self.tree.kind(p) == Kind::ObjectPattern) =>
          {
            self.maybe_warn_for_invalid_destructuring(statement, &namespace);
            let pattern = self.tree.first_child(lhs).unwrap();
            let import_specs: Vec<NodeId> = self.tree.children(pattern).to_vec();
            for import_spec in import_specs {
              let imported_property = self.tree.string(import_spec).to_string();
              let alias = match self.tree.first_child(import_spec) {
                Some(binding) => self.tree.string(binding).to_string(),
                None => imported_property.clone(),
              };
              let full_name = format!("{}.{}", exported_namespace, imported_property);
              self.record_name_to_inline(alias, full_name);
            }
          }
          _ => unreachable!("illegal goog.module import shape"),
        }
      }
      // A missing provide/module is reported elsewhere.
    }

    if !current_is_module && !target_is_non_legacy_module {
      return;
    }

    if is_destructuring {
      // The aliases carry the bindings from here on.
      self.report_change_to_enclosing_scope(statement);
      self.tree.detach(statement);
    } else if target_is_non_legacy_module {
      if current_is_module {
        if !self.is_top_level_exec() {
          // "function() { var Foo = goog.require('bar.Foo'); }" becomes
          // "function() { var Foo = module$exports$bar$Foo; }"
          let binary = self
            .state
            .binary_namespace(&namespace)
            .expect("non-legacy module has a binary namespace");
          let name_node = build::name(self.tree, binary);
          self.tree.set_original_name(name_node, namespace.clone());
          self.tree.copy_span_tree(name_node, call);
          self.tree.replace_with(call, name_node);
          self.report_change_to_enclosing_scope(name_node);
        } else {
          // Top-level import of a module: the alias (if any) is inlined at
          // every use, so the declaration goes away entirely.
          self.report_change_to_enclosing_scope(statement);
          self.tree.detach(statement);
        }
      } else if import_has_alias {
        // A plain script importing a module keeps the load-order side
        // effect but loses the alias binding:
        // "var B = goog.require('b.B');" becomes "goog.require('b.B');"
        self.replace_statement_with_bare_require(statement, call);
      } else {
        // A bare require of a module in a plain script has no provide for
        // downstream passes to match; it goes away entirely.
        self.report_change_to_enclosing_scope(statement);
        self.tree.detach(statement);
      }
    } else if import_has_alias {
      // The target is a legacy namespace; the downstream primitives pass
      // wants to see the bare require.
      self.replace_statement_with_bare_require(statement, call);
    }

    if target_is_non_legacy_module {
      // The call is gone after this pass, so index it here rather than in
      // the downstream pass.
      let callee = self.tree.first_child(call).expect("call has a callee");
      self.maybe_add_to_symbol_table(callee);
      if let Some(arg) = self.tree.next_sibling(callee) {
        let namespace_ref = self.create_namespace_node(arg);
        self.maybe_add_to_symbol_table(namespace_ref);
      }
    }
  }

  fn replace_statement_with_bare_require(&mut self, statement: NodeId, call: NodeId) {
    self.tree.detach(call);
    let bare = build::expr_result(self.tree, call);
    self.tree.copy_span_tree_if_missing(bare, statement);
    self.tree.replace_with(statement, bare);
    self.report_change_to_enclosing_scope(call);
  }

  /// Destructuring imports exist to ease migration to ES modules, so their
  /// shape is restricted: the imported module must use named exports, and
  /// every destructured field must be one of them.
  fn maybe_warn_for_invalid_destructuring(&mut self, import_statement: NodeId, namespace: &str) {
    let Some(imported) = self.state.script_id_for_namespace(namespace) else {
      // Not enough is known to check anything.
      return;
    };
    let span = self.tree.span(import_statement);
    if self.state.script(imported).default_export_rhs.is_some() {
      self.report(diag::illegal_destructuring_default_export(span));
      return;
    }
    let pattern = self
      .tree
      .first_child(import_statement)
      .and_then(|lhs| self.tree.first_child(lhs))
      .expect("destructuring import has a pattern");
    let keys: Vec<String> = self
      .tree
      .children(pattern)
      .iter()
      .map(|&key| self.tree.string(key).to_string())
      .collect();
    for key in keys {
      if !self.state.script(imported).named_exports.contains(&key) {
        self.report(diag::illegal_destructuring_not_exported(&key, namespace, span));
      }
    }
  }

  fn update_goog_module_get_call(&mut self, call: NodeId) {
    let namespace_node = self.tree.second_child(call).expect("get call has an argument");
    let namespace = self.tree.string(namespace_node).to_string();

    // Remaining goog.module.get() calls are not alias updates and are
    // replaced by a reference to the proper name: "goog.module.get('p.F')"
    // becomes either "p.F" or "module$exports$p$F".
    let Some(exported_namespace) = self.state.exported_namespace_or_script(&namespace) else {
      return;
    };
    self.report_change_to_enclosing_scope(call);
    let exported_name = build::qname(self.tree, &exported_namespace);
    self.tree.copy_span_tree(exported_name, call);
    self.tree.set_original_name(exported_name, namespace);
    self.tree.replace_with(call, exported_name);
  }

  fn update_exports_property_assignment(&mut self, getprop: NodeId) {
    if !self.current().is_module {
      return;
    }

    let parent = self.tree.parent(getprop).expect("export target is attached");
    assert!(
      matches!(self.tree.kind(parent), Kind::Assign | Kind::ExprResult),
      "export property assignment shape"
    );

    // "exports.foo = Foo" becomes "module$exports$pkg$Foo.foo = Foo".
    let exports_name = self.tree.first_child(getprop).expect("getprop has an object");
    assert_eq!(self.tree.string(exports_name), "exports");
    let exported_namespace = self
      .current()
      .exported_namespace()
      .expect("module namespace was declared");
    self.safe_set_maybe_qualified_string(exports_name, &exported_namespace);

    let jsdoc_node = if self.tree.kind(parent) == Kind::Assign {
      parent
    } else {
      getprop
    };
    self.mark_const_and_copy_jsdoc(jsdoc_node, jsdoc_node);

    // The first "exports.foo = ..." line is preceded by the exports object
    // creation.
    if !self.current().has_created_export_object {
      let at = self.tree.enclosing_statement(parent);
      self.export_the_empty_binary_namespace_at(at, AddAt::Before);
    }
  }

  /// Rewrites top-level module names: imported aliases are replaced by the
  /// namespace they alias, everything else gets the contents prefix.
  fn maybe_update_top_level_name(&mut self, name_node: NodeId) {
    let name = self.tree.string(name_node).to_string();
    if !self.current().is_module || !self.current().top_level_names.contains(&name) {
      return;
    }
    let Some(var) = self.scopes.get_var(&name) else {
      return;
    };
    let var_name_node = var.name_node;
    let var_scope = var.scope;
    // A shadowing local of the same name is not the top-level binding.
    if self.scopes.scope_root(var_scope) != self.current().root() {
      return;
    }

    // A binding inside a destructuring import is handled by import
    // rewriting.
    if var_name_node == name_node
      && self
        .tree
        .parent(name_node)
        .is_some_and(|p| self.tree.kind(p) == Kind::StringKey)
      && self
        .tree
        .grandparent(name_node)
        .is_some_and(|g| self.tree.kind(g) == Kind::ObjectPattern)
    {
      let destructuring_lhs = self.tree.grandparent(name_node).and_then(|g| self.tree.parent(g));
      if let Some(lhs) = destructuring_lhs {
        let is_require = self
          .tree
          .last_child(lhs)
          .is_some_and(|value| crate::is_call_to(self.tree, value, "goog.require"));
        if is_require {
          return;
        }
      }
    }

    // "new Foo;" becomes "new module$exports$Foo;" when Foo aliases an
    // import. The binding site of the (removed) alias declaration is not a
    // reference and falls through to content prefixing.
    let alias_target = self.current().names_to_inline_by_alias.get(&name).cloned();
    if let Some(namespace_to_inline) = alias_target {
      if var_name_node != name_node {
        if Some(&namespace_to_inline) == self.current().binary_namespace().as_ref() {
          self.current_mut().has_created_export_object = true;
        }
        self.safe_set_maybe_qualified_string(name_node, &namespace_to_inline);

        // Inlining a dotted name whose first segment is shadowed locally
        // would silently rebind it.
        if let Some(dot) = namespace_to_inline.find('.') {
          let first_segment = &namespace_to_inline[..dot];
          let shadowed = self
            .scopes
            .get_var(first_segment)
            .map(|v| (v.name_node, v.name.clone(), v.scope));
          if let Some((shadow_node, shadow_name, shadow_scope)) = shadowed {
            let shadow_kind = self.scopes.scope_kind(shadow_scope);
            if !matches!(shadow_kind, ScopeKind::Global | ScopeKind::Module) {
              let span = self.tree.span(shadow_node);
              self.report(diag::import_inlining_shadows_var(
                &shadow_name,
                &namespace_to_inline,
                span,
              ));
            }
          }
        }
        return;
      }
    }

    // "var foo; log(foo);" becomes
    // "var module$contents$Foo_foo; log(module$contents$Foo_foo);"
    let prefixed = format!("{}{}", self.current().contents_prefix(), name);
    self.safe_set_string(name_node, &prefixed);
  }

  /// In module "foo.Bar", rewrites "exports = Bar" to
  /// "var module$exports$foo$Bar = Bar" (or erases it when the default
  /// export was inlined, or assigns the dotted namespace for legacy
  /// modules).
  fn maybe_update_export_declaration(&mut self, n: NodeId) {
    if !self.current().is_module
      || self.tree.string(n) != "exports"
      || !crate::is_assign_target(self.tree, n)
    {
      return;
    }

    let assign_node = self.tree.parent(n).expect("assign target has a parent");
    if !self.current().declare_legacy_namespace && self.current().default_export_local_name.is_some()
    {
      // The local declaration is renamed in place at module end; the
      // assignment is redundant.
      let statement = self.tree.parent(assign_node).expect("assignment statement");
      self.report_change_to_enclosing_scope(statement);
      self.tree.detach(statement);
      return;
    }

    let rhs = self.tree.last_child(assign_node).expect("assignment has a rhs");
    let jsdoc_node;
    if self.current().declare_legacy_namespace {
      let legacy = self.current().legacy_namespace().to_string();
      let legacy_qname = build::qname(self.tree, &legacy);
      self.tree.copy_span_tree(legacy_qname, n);
      self.tree.replace_with(n, legacy_qname);
      jsdoc_node = assign_node;
    } else {
      let binary = self
        .current()
        .binary_namespace()
        .expect("non-legacy module has a binary namespace");
      let legacy = self.current().legacy_namespace().to_string();
      self.tree.detach(rhs);
      let expr_result_node = self.tree.parent(assign_node).expect("assignment statement");
      let binary_name = build::name(self.tree, binary);
      self.tree.set_original_name(binary_name, legacy);
      let exports_object_creation = build::var_decl(self.tree, binary_name, Some(rhs));
      self
        .tree
        .copy_span_tree_if_missing(exports_object_creation, expr_result_node);
      self
        .tree
        .put_bool_prop(exports_object_creation, BoolProp::IsNamespace, true);
      self.tree.replace_with(expr_result_node, exports_object_creation);
      jsdoc_node = exports_object_creation;
      self.current_mut().has_created_export_object = true;
    }
    self.mark_const_and_copy_jsdoc(assign_node, jsdoc_node);
    self.report_change_to_enclosing_scope(jsdoc_node);

    self.maybe_update_export_object_literal(rhs);
  }

  /// For "exports = {prop: value}" object literals that survive to updating,
  /// enforce constness (and typedef cloning) per property.
  fn maybe_update_export_object_literal(&mut self, rhs: NodeId) {
    if !self.current().is_module || self.tree.kind(rhs) != Kind::ObjectLit {
      return;
    }

    let properties: Vec<NodeId> = self.tree.children(rhs).to_vec();
    for property in properties {
      match self.tree.kind(property) {
        Kind::ComputedProp => {
          let span = self.tree.span(property);
          self.report(diag::invalid_export_computed_property(span));
        }
        Kind::StringKey => {
          if !self.tree.has_children(property) {
            let text = self.tree.string(property).to_string();
            let span = self.tree.span(property);
            let value = build::name(self.tree, text);
            self.tree.set_span(value, span);
            self.tree.add_child_to_back(property, value);
          }
          let value = self.tree.first_child(property).unwrap();
          self.maybe_update_export_decl_to_node(property, value);
        }
        _ => {}
      }
    }
  }

  fn maybe_update_export_decl_to_node(&mut self, target: NodeId, value: NodeId) {
    if !self.current().is_module {
      return;
    }

    // When the value is a local name declared at this scope depth whose
    // declaration is a typedef, clone that declaration's JSDoc; otherwise
    // the type name would dangle after renaming.
    if self.tree.kind(value) == Kind::Name {
      let value_name = self.tree.string(value).to_string();
      if let Some(var) = self.scopes.get_var(&value_name) {
        let var_scope = var.scope;
        let var_name_node = var.name_node;
        let var_decl_node = var.decl_node;
        if self.scopes.scope_depth(var_scope) == self.scopes.current_depth() {
          let info = self
            .tree
            .jsdoc(var_name_node)
            .or_else(|| self.tree.jsdoc(var_decl_node))
            .cloned();
          if let Some(info) = info {
            if info.has_typedef {
              self.tree.set_jsdoc(target, info);
              return;
            }
          }
        }
      }
    }

    self.mark_const_and_copy_jsdoc(target, target);
  }

  /// Rewrites plain reads of `exports` to the exported namespace. Parameter
  /// lists keep their `exports` bindings (inner functions may legitimately
  /// shadow it).
  fn maybe_update_export_name_ref(&mut self, n: NodeId) {
    if !self.current().is_module || self.tree.string(n) != "exports" {
      return;
    }
    let Some(parent) = self.tree.parent(n) else {
      return;
    };
    if self.tree.kind(parent) == Kind::ParamList {
      return;
    }

    if self.current().declare_legacy_namespace {
      let legacy = self.current().legacy_namespace().to_string();
      let legacy_qname = build::qname(self.tree, &legacy);
      self.tree.copy_span_tree(legacy_qname, n);
      self.tree.replace_with(n, legacy_qname);
      self.report_change_to_enclosing_scope(legacy_qname);
      return;
    }

    let binary = self
      .current()
      .binary_namespace()
      .expect("non-legacy module has a binary namespace");
    self.safe_set_string(n, &binary);

    // Either this module creates its own exports object at some point, or
    // the empty object was already emitted right after the goog.module call.
    assert!(
      self.current().will_create_exports_object || self.current().has_created_export_object,
      "exports object is unaccounted for"
    );
  }

  /// Imports of goog.module files must use the short import syntax, not the
  /// dotted namespace.
  fn check_qualified_name(&mut self, qname_node: NodeId) {
    let Some(qualified_name) = self.tree.qualified_name(qname_node) else {
      return;
    };
    if self.state.contains_module(&qualified_name) && !self.state.is_legacy_module(&qualified_name)
    {
      let span = self.tree.span(qname_node);
      self.report(diag::qualified_reference_to_goog_module(&qualified_name, span));
    }
  }

  /// Adds the missing "var module$exports$pkg$Foo = {};" line.
  fn export_the_empty_binary_namespace_at(&mut self, at: NodeId, add_at: AddAt) {
    if self.current().declare_legacy_namespace {
      return;
    }

    let binary = self
      .current()
      .binary_namespace()
      .expect("non-legacy module has a binary namespace");
    let legacy = self.current().legacy_namespace().to_string();
    let binary_name = build::name(self.tree, binary);
    self.tree.set_original_name(binary_name, legacy);
    let empty_object = build::object_lit(self.tree, vec![]);
    let declaration = build::var_decl(self.tree, binary_name, Some(empty_object));
    match add_at {
      AddAt::Before => self.tree.insert_before(at, declaration),
      AddAt::After => self.tree.insert_after(at, declaration),
    }
    self.tree.put_bool_prop(declaration, BoolProp::IsNamespace, true);
    self.tree.copy_span_tree(declaration, at);
    self.mark_const(declaration);
    self.report_change_to_enclosing_scope(declaration);
    self.current_mut().has_created_export_object = true;
  }

  pub(crate) fn mark_const(&mut self, n: NodeId) {
    let mut doc = self.tree.jsdoc(n).cloned().unwrap_or_default();
    doc.is_const = true;
    self.tree.set_jsdoc(n, doc);
  }

  pub(crate) fn mark_const_and_copy_jsdoc(&mut self, from: NodeId, target: NodeId) {
    let mut doc = self.tree.jsdoc(from).cloned().unwrap_or_default();
    doc.is_const = true;
    self.tree.set_jsdoc(target, doc);
  }

  pub(crate) fn safe_set_string(&mut self, n: NodeId, new_string: &str) {
    if self.tree.string(n) == new_string {
      return;
    }
    self.tree.set_string(n, new_string);
    self.report_change_to_enclosing_scope(n);
  }

  /// Renames a name node to a possibly-dotted replacement. Dotted
  /// replacements cannot stay a single name node: declarations are rebuilt
  /// as qualified-name assignments and expression positions get a fresh
  /// qualified-name subtree.
  pub(crate) fn safe_set_maybe_qualified_string(&mut self, name_node: NodeId, new_string: &str) {
    if !new_string.contains('.') {
      self.safe_set_string(name_node, new_string);
      return;
    }

    let name_parent = self.tree.parent(name_node).expect("renamed name is attached");
    let jsdoc = self.tree.jsdoc(name_parent).cloned();
    match self.tree.kind(name_parent) {
      Kind::Function | Kind::Class
        if self.tree.is_statement(name_parent)
          && self.tree.first_child(name_parent) == Some(name_node) =>
      {
        // "function f() {}" becomes "mod.f = function() {};"
        let placeholder = build::empty(self.tree);
        self.tree.replace_with(name_parent, placeholder);
        self.tree.clear_jsdoc(name_parent);
        self.tree.set_string(name_node, "");
        let new_statement =
          build::qname_declaration(self.tree, new_string, Some(name_parent), jsdoc);
        self.tree.copy_span_tree_if_missing(new_statement, name_parent);
        self.tree.replace_with(placeholder, new_statement);
        self.report_change_to_enclosing_scope(new_statement);
      }

      Kind::Var | Kind::Let | Kind::Const => {
        // "const FOO = 1;" becomes "mod.FOO = 1;"
        let rhs = self.tree.last_child(name_node).map(|value| {
          self.tree.detach(value);
          value
        });
        let name_span = self.tree.span(name_node);
        let name_length = self
          .tree
          .original_name(name_node)
          .map(|original| original.len())
          .unwrap_or_else(|| self.tree.string(name_node).len());
        let new_statement = build::qname_declaration(self.tree, new_string, rhs, jsdoc);
        self
          .tree
          .copy_span_tree_if_missing(new_statement, name_node);
        self.replace_exported_name_location(new_statement, name_span, name_length as u32);
        self.replace_declaration_child(name_node, new_statement);
        self.report_change_to_enclosing_scope(new_statement);
      }

      Kind::ObjectPattern | Kind::ArrayPattern | Kind::ParamList => {
        unreachable!("cannot rename a binding to a qualified name here")
      }

      _ => {
        let qname_node = build::qname(self.tree, new_string);
        self.tree.copy_span_tree(qname_node, name_node);
        self.tree.replace_with(name_node, qname_node);
        self.report_change_to_enclosing_scope(qname_node);
      }
    }
  }

  /// The rewritten "MOD.FOO = ..." keeps FOO's source position and original
  /// length on the property components, so source maps point at FOO.
  fn replace_exported_name_location(&mut self, statement: NodeId, name_span: Span, length: u32) {
    if self.tree.child_count(statement) != 1 {
      return;
    }
    let assign = self.tree.first_child(statement).unwrap();
    if self.tree.kind(assign) != Kind::Assign {
      return;
    }
    let Some(getprop) = self.tree.first_child(assign) else {
      return;
    };
    if self.tree.kind(getprop) != Kind::GetProp {
      return;
    }
    let fixed = Span::new(
      name_span.file,
      TextRange::new(name_span.range.start, name_span.range.start + length),
    );
    let components: Vec<NodeId> = self.tree.children(getprop).to_vec();
    for component in components {
      self.tree.set_span(component, fixed);
    }
  }

  /// Replaces one binding of a declaration with a standalone statement,
  /// splitting multi-binding declarations as needed.
  fn replace_declaration_child(&mut self, name_node: NodeId, new_statement: NodeId) {
    let declaration = self.tree.parent(name_node).expect("binding is declared");
    if self.tree.child_count(declaration) == 1 {
      self.tree.replace_with(declaration, new_statement);
      return;
    }

    let idx = self.tree.index_in_parent(name_node).unwrap();
    let kind = self.tree.kind(declaration);
    let span = self.tree.span(declaration);
    let following: Vec<NodeId> = self.tree.children(declaration)[idx + 1..].to_vec();
    self.tree.detach(name_node);
    self.tree.insert_after(declaration, new_statement);
    if !following.is_empty() {
      let trailing = self.tree.alloc(kind, span);
      for binding in following {
        self.tree.detach(binding);
        self.tree.add_child_to_back(trailing, binding);
      }
      self.tree.insert_after(new_statement, trailing);
    }
    if !self.tree.has_children(declaration) {
      self.tree.detach(declaration);
    }
  }
}
