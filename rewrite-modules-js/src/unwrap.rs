//! Normalizes inline module literals before recording.
//!
//! `goog.loadModule(function(exports) { ...body...; return exports; })`
//! statements become a module-body node attached directly under the script,
//! so the recorder sees one uniform module shape. Only script-level
//! expression statements are inspected; malformed shapes are left untouched
//! for the recorder to reject.

use crate::is_call_to;
use crate::ModuleRewriter;
use tree_js::BoolProp;
use tree_js::Kind;
use tree_js::NodeId;

impl ModuleRewriter<'_> {
  pub(crate) fn unwrap_goog_load_module(&mut self, script: NodeId) {
    debug_assert_eq!(self.tree.kind(script), Kind::Script);
    let statements: Vec<NodeId> = self.tree.children(script).to_vec();
    for statement in statements {
      if self.tree.kind(statement) != Kind::ExprResult {
        continue;
      }
      let Some(call) = self.tree.first_child(statement) else {
        continue;
      };
      if !is_call_to(self.tree, call, "goog.loadModule") {
        continue;
      }
      let Some(function) = self.tree.last_child(call) else {
        continue;
      };
      if self.tree.kind(function) != Kind::Function {
        continue;
      }

      self.tree.put_bool_prop(script, BoolProp::GoogModule, true);
      self.changes.record_function_deleted(function);

      let module_body = self
        .tree
        .last_child(function)
        .expect("function has a body");
      self.tree.detach(module_body);
      self.tree.set_kind(module_body, Kind::ModuleBody);
      self.tree.replace_with(statement, module_body);

      let return_node = self
        .tree
        .last_child(module_body)
        .expect("module literal has a body");
      assert_eq!(
        self.tree.kind(return_node),
        Kind::Return,
        "goog.loadModule body must end in `return exports;`"
      );
      self.tree.detach(return_node);
    }
  }
}
