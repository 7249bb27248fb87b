//! Recording phase: walks every script, classifies it, and fills the
//! per-script description and the global namespace registries. No rewriting
//! happens here beyond the shape normalizations later phases rely on
//! (multi-`var` require splitting, shorthand object keys, removal of
//! `goog.module.get` alias assignments).

use crate::diag;
use crate::is_assign_target;
use crate::is_call_to;
use crate::is_export_property_assignment;
use crate::is_goog_module_file;
use crate::state::ExportDefinition;
use crate::state::ScriptDescription;
use crate::state::to_module_contents_prefix;
use crate::ModuleRewriter;
use crate::UnrecognizedRequire;
use itertools::Itertools;
use tree_js::build;
use tree_js::Kind;
use tree_js::NodeId;

impl ModuleRewriter<'_> {
  pub(crate) fn record_enter(&mut self, n: NodeId) -> bool {
    if is_goog_module_file(self.tree, n) {
      self.check_and_set_strict_mode_directive(n);
    }

    match self.tree.kind(n) {
      Kind::ModuleBody => self.record_module_body(n),

      Kind::Call => {
        if let Some(callee) = self.tree.first_child(n) {
          if self.tree.kind(callee) == Kind::GetProp {
            let parent_is_bare_statement = self
              .tree
              .parent(n)
              .is_some_and(|p| self.tree.kind(p) == Kind::ExprResult);
            match self.tree.qualified_name(callee).as_deref() {
              Some("goog.module") => self.record_goog_module(n),
              Some("goog.module.declareLegacyNamespace") => {
                self.current_mut().declare_legacy_namespace = true;
              }
              Some("goog.provide") => self.record_goog_provide(n),
              Some("goog.require") => self.record_goog_require(n, true),
              Some("goog.forwardDeclare") if !parent_is_bare_statement => {
                self.record_goog_forward_declare(n);
              }
              Some("goog.module.get") => self.record_goog_module_get(n),
              _ => {}
            }
          }
        }
      }

      Kind::Class | Kind::Function => {
        if self.is_top_level_block(n) {
          self.record_top_level_class_or_function_name(n);
        }
      }

      Kind::Const | Kind::Let => {
        if self.is_top_level_block(n) {
          self.record_top_level_var_names(n);
        }
      }

      Kind::Var => {
        if self.is_top_level_exec() {
          self.record_top_level_var_names(n);
        }
      }

      Kind::GetProp => {
        if is_export_property_assignment(self.tree, n) {
          self.record_exports_property_assignment(n);
        }
      }

      // Short object keys are expanded first, so that later rewrites can
      // substitute the renamed binding under an unchanged key.
      Kind::StringKey => {
        if self.current().is_module {
          self.rewrite_short_object_key(n);
        }
      }

      Kind::Name => self.maybe_record_export_declaration(n),

      _ => {}
    }

    true
  }

  pub(crate) fn record_exit(&mut self, n: NodeId) {
    if self.tree.kind(n) == Kind::ModuleBody {
      self.pop_script();
    }
  }

  fn record_module_body(&mut self, module_root: NodeId) {
    let id = self
      .state
      .alloc_script(ScriptDescription::new_module(module_root));
    self.push_script(id);
  }

  fn record_goog_module(&mut self, call: NodeId) {
    let namespace_node = self.tree.last_child(call).expect("call has children");
    if self.tree.kind(namespace_node) != Kind::Str {
      let span = self.tree.span(namespace_node);
      self.report(diag::invalid_module_namespace(span));
      return;
    }
    let namespace = self.tree.string(namespace_node).to_string();

    {
      let current = self.current_mut();
      current.legacy_namespace = Some(namespace.clone());
      current.contents_prefix = Some(to_module_contents_prefix(&namespace));
    }

    let call_span = self.tree.span(call);
    if self.state.contains_module(&namespace) {
      self.report(diag::duplicate_module(&namespace, call_span));
    }
    if self.state.is_legacy_script_namespace(&namespace) {
      self.report(diag::duplicate_namespace(&namespace, call_span));
    }

    let root = self.current().root();
    let script_root = self.tree.enclosing_script(root).unwrap_or(root);
    let id = self.current_id();
    self.state.register_module(&namespace, id, script_root);
  }

  fn record_goog_provide(&mut self, call: NodeId) {
    let namespace_node = self.tree.last_child(call).expect("call has children");
    if self.tree.kind(namespace_node) != Kind::Str {
      let span = self.tree.span(namespace_node);
      self.report(diag::invalid_provide_namespace(span));
      return;
    }
    let namespace = self.tree.string(namespace_node).to_string();

    if self.current().is_module {
      let span = self.tree.span(namespace_node);
      self.report(diag::invalid_provide_call(span));
    }
    if self.state.contains_module(&namespace) {
      let span = self.tree.span(call);
      self.report(diag::duplicate_namespace(&namespace, span));
    }

    let script_root = self
      .tree
      .enclosing_script(call)
      .expect("provide call is inside a script");
    self.state.register_legacy_script(&namespace, script_root);

    // Prefixes feed the JSDoc rewriter: a dotted type reference that resolves
    // under a provided namespace must be left alone.
    let parts: Vec<&str> = namespace.split('.').collect();
    for end in 1..=parts.len() {
      let prefix = parts[..end].iter().join(".");
      self.state.add_legacy_prefix(prefix);
    }
  }

  fn record_goog_require(&mut self, call: NodeId, must_be_ordered: bool) {
    self.maybe_split_multi_var(call);

    let namespace_node = self.tree.last_child(call).expect("call has children");
    if self.tree.kind(namespace_node) != Kind::Str {
      let span = self.tree.span(namespace_node);
      self.report(diag::invalid_require_namespace(span));
      return;
    }
    let namespace = self.tree.string(namespace_node).to_string();

    let target_is_a_module = self.state.contains_module(&namespace);
    let target_is_a_legacy_script = self.state.is_legacy_script_namespace(&namespace);
    if self.current().is_module && !target_is_a_module && !target_is_a_legacy_script {
      self.unrecognized_requires.push(UnrecognizedRequire {
        node: call,
        namespace,
        must_be_ordered,
      });
    }
  }

  fn record_goog_forward_declare(&mut self, call: NodeId) {
    let namespace_node = self.tree.last_child(call).expect("call has children");
    if self.tree.child_count(call) != 2 || self.tree.kind(namespace_node) != Kind::Str {
      let span = self.tree.span(namespace_node);
      self.report(diag::invalid_forward_declare_namespace(span));
      return;
    }

    // Modules require goog.forwardDeclare() and goog.module.get() to occur in
    // matched pairs; a missing module would be reported at the matching get,
    // so it is not ordering-sensitive here.
    self.record_goog_require(call, false);
  }

  fn record_goog_module_get(&mut self, call: NodeId) {
    let namespace_node = self.tree.last_child(call).expect("call has children");
    if self.tree.child_count(call) != 2 || self.tree.kind(namespace_node) != Kind::Str {
      let span = self.tree.span(namespace_node);
      self.report(diag::invalid_get_namespace(span));
      return;
    }
    if !self.current().is_module && self.scopes.in_global_scope() {
      let span = self.tree.span(namespace_node);
      self.report(diag::invalid_get_call_scope(span));
      return;
    }
    let namespace = self.tree.string(namespace_node).to_string();

    if !self.state.contains_module(&namespace) {
      self.unrecognized_requires.push(UnrecognizedRequire {
        node: call,
        namespace: namespace.clone(),
        must_be_ordered: false,
      });
    }

    let Some(maybe_assign) = self.tree.parent(call) else {
      return;
    };
    let is_filling_an_alias = self.tree.kind(maybe_assign) == Kind::Assign
      && self
        .tree
        .first_child(maybe_assign)
        .is_some_and(|t| self.tree.kind(t) == Kind::Name)
      && self
        .tree
        .parent(maybe_assign)
        .is_some_and(|p| self.tree.kind(p) == Kind::ExprResult);
    if !is_filling_an_alias || !self.current().is_module {
      return;
    }

    let alias_name = self
      .tree
      .string(self.tree.first_child(maybe_assign).unwrap())
      .to_string();

    // The assignment must fill a local that was initialized by
    // `goog.forwardDeclare('<same namespace>')`.
    let call_span = self.tree.span(call);
    let Some(alias_name_node) = self.scopes.get_var(&alias_name).map(|v| v.name_node) else {
      self.report(diag::invalid_get_alias(call_span));
      return;
    };
    let Some(alias_rhs) = self.tree.first_child(alias_name_node) else {
      self.report(diag::invalid_get_alias(call_span));
      return;
    };
    if !is_call_to(self.tree, alias_rhs, "goog.forwardDeclare") {
      self.report(diag::invalid_get_alias(call_span));
      return;
    }
    let declared_namespace = self
      .tree
      .last_child(alias_rhs)
      .map(|c| self.tree.string(c).to_string());
    if declared_namespace.as_deref() != Some(&namespace) {
      self.report(diag::invalid_get_alias(call_span));
      return;
    }

    // The forwardDeclare carries the aliasing; the filling assignment can go.
    self.report_change_to_enclosing_scope(maybe_assign);
    let statement = self.tree.parent(maybe_assign).unwrap();
    self.tree.detach(statement);
  }

  fn record_top_level_class_or_function_name(&mut self, n: NodeId) {
    let Some(name_node) = self.tree.first_child(n) else {
      return;
    };
    if self.tree.kind(name_node) == Kind::Name && !self.tree.string(name_node).is_empty() {
      let name = self.tree.string(name_node).to_string();
      self.current_mut().top_level_names.insert(name);
    }
  }

  fn record_top_level_var_names(&mut self, declaration: NodeId) {
    let names: Vec<String> = self
      .tree
      .decl_lhs_names(declaration)
      .into_iter()
      .map(|lhs| self.tree.string(lhs).to_string())
      .collect();
    self.current_mut().top_level_names.extend(names);
  }

  fn rewrite_short_object_key(&mut self, key: NodeId) {
    debug_assert_eq!(self.tree.kind(key), Kind::StringKey);
    if self.tree.has_children(key) {
      return;
    }
    let text = self.tree.string(key).to_string();
    let span = self.tree.span(key);
    let name_node = build::name(self.tree, text);
    self.tree.set_span(name_node, span);
    self.tree.add_child_to_back(key, name_node);
    self.report_change_to_enclosing_scope(key);
  }

  fn maybe_record_export_declaration(&mut self, n: NodeId) {
    if !self.current().is_module
      || self.tree.string(n) != "exports"
      || !is_assign_target(self.tree, n)
    {
      return;
    }

    assert!(
      self.current().default_export_rhs.is_none(),
      "multiple default exports in one module"
    );
    let export_rhs = self.tree.next_sibling(n).expect("assignment has a rhs");

    if self.is_named_exports_literal(export_rhs) {
      let mut all_exports_inlinable = true;
      let mut inlinable_exports = Vec::new();
      let keys: Vec<NodeId> = self.tree.children(export_rhs).to_vec();
      for key in keys {
        let export_name = self.tree.string(key).to_string();
        // Shorthand keys have not been expanded at this point; the key node
        // itself names the exported local.
        let rhs = self.tree.first_child(key).unwrap_or(key);
        let named_export = ExportDefinition::named_export(
          self.tree,
          &self.scopes,
          Some(export_name.clone()),
          Some(rhs),
        );
        self.current_mut().named_exports.insert(export_name);
        if self.current().declare_legacy_namespace
          || !named_export.has_inlinable_name(self.tree, &self.current().exports_to_inline)
        {
          all_exports_inlinable = false;
        } else {
          inlinable_exports.push(named_export);
        }
      }
      if all_exports_inlinable {
        for export in inlinable_exports {
          self.record_export_to_inline(export);
        }
        let statement = self.tree.enclosing_statement(n);
        self.tree.detach(statement);
      } else {
        self.current_mut().will_create_exports_object = true;
      }
      return;
    }

    self.current_mut().default_export_rhs = Some(export_rhs);
    self.current_mut().will_create_exports_object = true;
    let default_export = ExportDefinition::default_export(self.tree, &self.scopes, export_rhs);
    if !self.current().declare_legacy_namespace
      && default_export.has_inlinable_name(self.tree, &self.current().exports_to_inline)
    {
      let local_name = default_export.local_name().to_string();
      self.current_mut().default_export_local_name = Some(local_name);
      self.record_export_to_inline(default_export);
    }
  }

  /// An object literal all of whose keys are unquoted string keys whose
  /// values (if any) are plain names.
  fn is_named_exports_literal(&self, object: NodeId) -> bool {
    if self.tree.kind(object) != Kind::ObjectLit || !self.tree.has_children(object) {
      return false;
    }
    self.tree.children(object).iter().all(|&key| {
      if self.tree.kind(key) != Kind::StringKey
        || self.tree.get_bool_prop(key, tree_js::BoolProp::Quoted)
      {
        return false;
      }
      match self.tree.first_child(key) {
        None => true,
        Some(value) => self.tree.kind(value) == Kind::Name,
      }
    })
  }

  fn record_exports_property_assignment(&mut self, getprop: NodeId) {
    if !self.current().is_module {
      return;
    }

    let parent = self.tree.parent(getprop).expect("export target is attached");
    assert!(
      matches!(self.tree.kind(parent), Kind::Assign | Kind::ExprResult),
      "export property assignment shape"
    );

    if !self.scopes.in_module_scope() {
      return;
    }

    let prop = self.tree.second_child(getprop).expect("getprop has a prop");
    let export_name = self.tree.string(prop).to_string();
    self.current_mut().named_exports.insert(export_name.clone());

    let export_rhs = self.tree.next_sibling(getprop);
    let named_export =
      ExportDefinition::named_export(self.tree, &self.scopes, Some(export_name), export_rhs);
    if !self.current().declare_legacy_namespace
      && self.current().default_export_rhs.is_none()
      && named_export.has_inlinable_name(self.tree, &self.current().exports_to_inline)
    {
      self.record_export_to_inline(named_export);
      let statement = self.tree.parent(parent).expect("assignment is a statement");
      self.tree.detach(statement);
    }
  }

  fn record_export_to_inline(&mut self, export: ExportDefinition) {
    debug_assert!(export.has_inlinable_name(self.tree, &self.current().exports_to_inline));
    let key = export.name_decl.as_ref().expect("inlinable export").name_node;
    let local_name = export.local_name().to_string();
    let target = format!(
      "{}{}",
      self
        .current()
        .binary_namespace()
        .expect("inlining only happens in non-legacy modules"),
      export.export_postfix()
    );
    let previous = self.current_mut().exports_to_inline.insert(key, export);
    assert!(
      previous.is_none(),
      "already found a mapping for inlining export: {}",
      local_name
    );
    self.record_name_to_inline(local_name, target);
  }

  pub(crate) fn record_name_to_inline(&mut self, alias_name: String, target: String) {
    let previous = self
      .current_mut()
      .names_to_inline_by_alias
      .insert(alias_name.clone(), target);
    assert!(
      previous.is_none(),
      "already found a mapping for inlining short name: {}",
      alias_name
    );
  }

  /// `var a = goog.require('ns.a'), b = 3;` confuses later require rewriting;
  /// split the require binding into its own declaration first.
  fn maybe_split_multi_var(&mut self, call: NodeId) {
    let Some(binding) = self.tree.parent(call) else {
      return;
    };
    let Some(statement) = self.tree.parent(binding) else {
      return;
    };
    if self.tree.kind(statement) != Kind::Var || self.tree.child_count(statement) <= 1 {
      return;
    }

    self.tree.detach(binding);
    let span = self.tree.span(statement);
    let split = self.tree.alloc(Kind::Var, span);
    self.tree.add_child_to_back(split, binding);
    self.tree.insert_before(statement, split);
  }

  fn check_and_set_strict_mode_directive(&mut self, script: NodeId) {
    debug_assert_eq!(self.tree.kind(script), Kind::Script);
    if self.tree.has_directive(script, "use strict") {
      let span = self.tree.span(script);
      self.report(diag::useless_use_strict_directive(span));
    } else {
      let mut directives = vec!["use strict".to_string()];
      if let Some(existing) = self.tree.directives(script) {
        directives.extend(existing.iter().cloned());
      }
      self.tree.set_directives(script, directives);
    }
  }
}
