//! Rewrites dotted type references inside doc comments to match the tree
//! rewrites: alias inlining, content prefixing of module-local names, and
//! module namespaces collapsing to binary names.
//!
//! References are matched by their longest known prefix, so a longer
//! namespace match always beats a shorter alias: for `foo.Bar.Baz` the
//! rewriter tries `foo.Bar.Baz`, then `foo.Bar`, then `foo`.

use crate::state::GlobalRewriteState;
use crate::state::ScriptDescription;
use crate::ModuleRewriter;
use tree_js::NodeId;

impl ModuleRewriter<'_> {
  pub(crate) fn rewrite_jsdoc(&mut self, n: NodeId) {
    let Some(mut doc) = self.tree.jsdoc(n).cloned() else {
      return;
    };
    let current_id = self.current_id();
    let state = &*self.state;
    let current = state.script(current_id);
    for type_name in &mut doc.type_names {
      rewrite_type_reference(&mut type_name.text, current, state);
    }
    self.tree.set_jsdoc(n, doc);
  }
}

fn rewrite_type_reference(
  text: &mut String,
  current: &ScriptDescription,
  state: &GlobalRewriteState,
) {
  let full = text.clone();
  let mut prefix_len = full.len();
  loop {
    let prefix = &full[..prefix_len];
    let suffix = &full[prefix_len..];

    // An alias for an imported namespace: "{Foo}" becomes
    // "{module$exports$bar$Foo}" or "{bar.Foo}".
    if let Some(aliased_namespace) = current.names_to_inline_by_alias.get(prefix) {
      *text = format!("{}{}", aliased_namespace, suffix);
      return;
    }

    // A module-top-level var/function/class was renamed from Foo to
    // module$contents$...$Foo_Foo; the reference follows.
    if current.is_module && current.top_level_names.contains(prefix) {
      *text = format!("{}{}", current.contents_prefix(), full);
      return;
    }

    let binary_namespace_if_module = state.binary_namespace(prefix);

    // Resolves under a goog.provide'd namespace: the fully qualified name
    // stays valid as-is.
    if state.is_legacy_namespace_or_prefix(prefix) && binary_namespace_if_module.is_none() {
      return;
    }

    // A fully qualified legacy namespace of an actual module: "foo.bar.Baz"
    // becomes "module$exports$foo$bar$Baz".
    if let Some(binary_namespace) = binary_namespace_if_module {
      *text = format!("{}{}", binary_namespace, suffix);
      return;
    }

    match prefix.rfind('.') {
      Some(dot) => prefix_len = dot,
      None => return,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::state::to_module_contents_prefix;
  use tree_js::Kind;
  use tree_js::Tree;
  use tree_js::SYNTHETIC_SPAN;

  fn module_description(namespace: &str) -> (ScriptDescription, Tree) {
    let mut tree = Tree::new();
    let root = tree.alloc(Kind::ModuleBody, SYNTHETIC_SPAN);
    let mut description = ScriptDescription::new_module(root);
    description.legacy_namespace = Some(namespace.to_string());
    description.contents_prefix = Some(to_module_contents_prefix(namespace));
    (description, tree)
  }

  fn rewritten(text: &str, current: &ScriptDescription, state: &GlobalRewriteState) -> String {
    let mut text = text.to_string();
    rewrite_type_reference(&mut text, current, state);
    text
  }

  fn register_module(state: &mut GlobalRewriteState, tree: &mut Tree, namespace: &str) {
    let root = tree.alloc(Kind::Script, SYNTHETIC_SPAN);
    let body = tree.alloc(Kind::ModuleBody, SYNTHETIC_SPAN);
    tree.add_child_to_back(root, body);
    let mut description = ScriptDescription::new_module(body);
    description.legacy_namespace = Some(namespace.to_string());
    description.contents_prefix = Some(to_module_contents_prefix(namespace));
    let id = state.alloc_script(description);
    state.register_module(namespace, id, root);
  }

  #[test]
  fn alias_prefix_is_substituted_with_suffix_kept() {
    let (mut current, _tree) = module_description("m");
    current
      .names_to_inline_by_alias
      .insert("Foo".to_string(), "module$exports$bar$Foo".to_string());
    let state = GlobalRewriteState::new();
    assert_eq!(
      rewritten("Foo", &current, &state),
      "module$exports$bar$Foo"
    );
    assert_eq!(
      rewritten("Foo.Inner", &current, &state),
      "module$exports$bar$Foo.Inner"
    );
  }

  #[test]
  fn top_level_names_get_the_contents_prefix() {
    let (mut current, _tree) = module_description("a.b");
    current.top_level_names.insert("Local".to_string());
    let state = GlobalRewriteState::new();
    assert_eq!(
      rewritten("Local", &current, &state),
      "module$contents$a$b_Local"
    );
    assert_eq!(
      rewritten("Local.Inner", &current, &state),
      "module$contents$a$b_Local.Inner"
    );
  }

  #[test]
  fn longest_module_namespace_wins_over_shorter_prefixes() {
    let (current, mut tree) = module_description("m");
    let mut state = GlobalRewriteState::new();
    register_module(&mut state, &mut tree, "foo.Bar");
    assert_eq!(
      rewritten("foo.Bar.Baz", &current, &state),
      "module$exports$foo$Bar.Baz"
    );
  }

  #[test]
  fn legacy_prefixes_stay_untouched() {
    let (current, _tree) = module_description("m");
    let mut state = GlobalRewriteState::new();
    state.add_legacy_prefix("legacy".to_string());
    state.add_legacy_prefix("legacy.ns".to_string());
    assert_eq!(rewritten("legacy.ns.Type", &current, &state), "legacy.ns.Type");
  }

  #[test]
  fn unknown_references_are_left_alone() {
    let (current, _tree) = module_description("m");
    let state = GlobalRewriteState::new();
    assert_eq!(rewritten("unknown.Type", &current, &state), "unknown.Type");
    assert_eq!(rewritten("Simple", &current, &state), "Simple");
  }
}
