//! A mutable, kind-based syntax tree for whole-program rewriting passes.
//!
//! Nodes live in a [`Tree`] arena and are identified by [`NodeId`]; identity
//! is the id, so cross-compilation registries (e.g. hot-swap bookkeeping) can
//! key off nodes directly. Each node carries a token [`Kind`], a source
//! [`Span`], an optional string payload, an optional original name recorded on
//! the first rename, an optional [`JsDoc`] record, boolean properties, and
//! ordered children with parent links.
//!
//! Detached nodes simply lose their parent link; they are never deallocated
//! or reused within a compilation, which keeps ids stable for diagnostics and
//! change tracking.

pub mod build;
pub mod dump;
mod jsdoc;
mod kind;

pub use jsdoc::JsDoc;
pub use jsdoc::TypeName;
pub use kind::Kind;

use diagnostics::FileId;
use diagnostics::Span;
use diagnostics::TextRange;
use smallvec::SmallVec;

/// Identity of a node within one [`Tree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// Boolean node properties used by the module-rewriting passes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BoolProp {
  /// Set on a script whose body is (or was unwrapped into) a module body.
  GoogModule = 1,
  /// Set on synthesized namespace declarations.
  IsNamespace = 2,
  /// Set on synthesized module-name string nodes fed to symbol sinks.
  IsModuleName = 4,
  /// Set on string keys that were quoted in the source (`{'a': 1}`).
  Quoted = 8,
}

/// Span given to nodes that do not yet correspond to any source location.
pub const SYNTHETIC_SPAN: Span = Span::new(FileId(u32::MAX), TextRange::empty(0));

#[derive(Debug)]
struct NodeData {
  kind: Kind,
  span: Span,
  string: String,
  original_name: Option<String>,
  jsdoc: Option<JsDoc>,
  props: u8,
  directives: Option<Vec<String>>,
  parent: Option<NodeId>,
  children: SmallVec<[NodeId; 4]>,
}

/// Arena of nodes forming one or more scripts.
#[derive(Default, Debug)]
pub struct Tree {
  nodes: Vec<NodeData>,
}

impl Tree {
  pub fn new() -> Self {
    Self::default()
  }

  /// Allocates a fresh detached node.
  pub fn alloc(&mut self, kind: Kind, span: Span) -> NodeId {
    let id = NodeId(self.nodes.len() as u32);
    self.nodes.push(NodeData {
      kind,
      span,
      string: String::new(),
      original_name: None,
      jsdoc: None,
      props: 0,
      directives: None,
      parent: None,
      children: SmallVec::new(),
    });
    id
  }

  fn data(&self, n: NodeId) -> &NodeData {
    &self.nodes[n.index()]
  }

  fn data_mut(&mut self, n: NodeId) -> &mut NodeData {
    &mut self.nodes[n.index()]
  }

  pub fn kind(&self, n: NodeId) -> Kind {
    self.data(n).kind
  }

  /// Changes the token kind in place, keeping children and annotations. Used
  /// e.g. to turn an unwrapped function body into a module body and a
  /// finished module body into a plain block.
  pub fn set_kind(&mut self, n: NodeId, kind: Kind) {
    self.data_mut(n).kind = kind;
  }

  pub fn span(&self, n: NodeId) -> Span {
    self.data(n).span
  }

  pub fn set_span(&mut self, n: NodeId, span: Span) {
    self.data_mut(n).span = span;
  }

  /// Copies `from`'s span onto `n` and its whole subtree. The equivalent of
  /// srcref-ing a freshly built replacement at the position it replaces.
  pub fn copy_span_tree(&mut self, n: NodeId, from: NodeId) {
    let span = self.span(from);
    self.set_span_tree(n, span);
  }

  pub fn set_span_tree(&mut self, n: NodeId, span: Span) {
    self.data_mut(n).span = span;
    let children: SmallVec<[NodeId; 4]> = self.data(n).children.clone();
    for child in children {
      self.set_span_tree(child, span);
    }
  }

  /// Copies `from`'s span onto every node of `n`'s subtree that still has
  /// the synthetic placeholder span. Freshly built wrappers around original
  /// nodes get positioned without disturbing the originals.
  pub fn copy_span_tree_if_missing(&mut self, n: NodeId, from: NodeId) {
    let span = self.span(from);
    self.set_span_tree_if_missing(n, span);
  }

  pub fn set_span_tree_if_missing(&mut self, n: NodeId, span: Span) {
    if self.span(n) == SYNTHETIC_SPAN {
      self.data_mut(n).span = span;
    }
    let children: SmallVec<[NodeId; 4]> = self.data(n).children.clone();
    for child in children {
      self.set_span_tree_if_missing(child, span);
    }
  }

  pub fn string(&self, n: NodeId) -> &str {
    &self.data(n).string
  }

  /// Sets the string payload without touching the original-name annotation.
  /// Builders use this at node creation; renames go through [`Tree::set_string`].
  pub fn init_string(&mut self, n: NodeId, s: impl Into<String>) {
    self.data_mut(n).string = s.into();
  }

  /// Renames the node, remembering the pre-rename payload as the original
  /// name (first rename wins) so diagnostics can reference the user-visible
  /// name.
  pub fn set_string(&mut self, n: NodeId, s: impl Into<String>) {
    let s = s.into();
    let data = self.data_mut(n);
    if data.string == s {
      return;
    }
    if data.original_name.is_none() && !data.string.is_empty() {
      data.original_name = Some(std::mem::take(&mut data.string));
    }
    data.string = s;
  }

  pub fn original_name(&self, n: NodeId) -> Option<&str> {
    self.data(n).original_name.as_deref()
  }

  pub fn set_original_name(&mut self, n: NodeId, name: impl Into<String>) {
    self.data_mut(n).original_name = Some(name.into());
  }

  /// The user-visible name: the original name when the node was renamed,
  /// otherwise the current payload.
  pub fn source_name(&self, n: NodeId) -> &str {
    self
      .original_name(n)
      .unwrap_or_else(|| self.string(n))
  }

  pub fn jsdoc(&self, n: NodeId) -> Option<&JsDoc> {
    self.data(n).jsdoc.as_ref()
  }

  pub fn jsdoc_mut(&mut self, n: NodeId) -> Option<&mut JsDoc> {
    self.data_mut(n).jsdoc.as_mut()
  }

  pub fn set_jsdoc(&mut self, n: NodeId, jsdoc: JsDoc) {
    self.data_mut(n).jsdoc = Some(jsdoc);
  }

  pub fn clear_jsdoc(&mut self, n: NodeId) {
    self.data_mut(n).jsdoc = None;
  }

  pub fn get_bool_prop(&self, n: NodeId, prop: BoolProp) -> bool {
    self.data(n).props & (prop as u8) != 0
  }

  pub fn put_bool_prop(&mut self, n: NodeId, prop: BoolProp, value: bool) {
    let data = self.data_mut(n);
    if value {
      data.props |= prop as u8;
    } else {
      data.props &= !(prop as u8);
    }
  }

  pub fn directives(&self, n: NodeId) -> Option<&[String]> {
    self.data(n).directives.as_deref()
  }

  pub fn set_directives(&mut self, n: NodeId, directives: Vec<String>) {
    self.data_mut(n).directives = Some(directives);
  }

  pub fn has_directive(&self, n: NodeId, directive: &str) -> bool {
    self
      .directives(n)
      .is_some_and(|ds| ds.iter().any(|d| d == directive))
  }

  pub fn parent(&self, n: NodeId) -> Option<NodeId> {
    self.data(n).parent
  }

  pub fn grandparent(&self, n: NodeId) -> Option<NodeId> {
    self.parent(n).and_then(|p| self.parent(p))
  }

  pub fn children(&self, n: NodeId) -> &[NodeId] {
    &self.data(n).children
  }

  pub fn child_count(&self, n: NodeId) -> usize {
    self.data(n).children.len()
  }

  pub fn has_children(&self, n: NodeId) -> bool {
    !self.data(n).children.is_empty()
  }

  pub fn child(&self, n: NodeId, index: usize) -> NodeId {
    self.data(n).children[index]
  }

  pub fn first_child(&self, n: NodeId) -> Option<NodeId> {
    self.data(n).children.first().copied()
  }

  pub fn second_child(&self, n: NodeId) -> Option<NodeId> {
    self.data(n).children.get(1).copied()
  }

  pub fn last_child(&self, n: NodeId) -> Option<NodeId> {
    self.data(n).children.last().copied()
  }

  pub fn index_in_parent(&self, n: NodeId) -> Option<usize> {
    let parent = self.parent(n)?;
    self.children(parent).iter().position(|&c| c == n)
  }

  pub fn next_sibling(&self, n: NodeId) -> Option<NodeId> {
    let parent = self.parent(n)?;
    let idx = self.index_in_parent(n)?;
    self.children(parent).get(idx + 1).copied()
  }

  pub fn prev_sibling(&self, n: NodeId) -> Option<NodeId> {
    let parent = self.parent(n)?;
    let idx = self.index_in_parent(n)?;
    idx.checked_sub(1).map(|i| self.children(parent)[i])
  }

  pub fn add_child_to_back(&mut self, parent: NodeId, child: NodeId) {
    debug_assert!(self.parent(child).is_none(), "child must be detached");
    self.data_mut(child).parent = Some(parent);
    self.data_mut(parent).children.push(child);
  }

  pub fn add_child_to_front(&mut self, parent: NodeId, child: NodeId) {
    debug_assert!(self.parent(child).is_none(), "child must be detached");
    self.data_mut(child).parent = Some(parent);
    self.data_mut(parent).children.insert(0, child);
  }

  /// Inserts `new` directly before `anchor` under `anchor`'s parent.
  pub fn insert_before(&mut self, anchor: NodeId, new: NodeId) {
    debug_assert!(self.parent(new).is_none(), "new node must be detached");
    let parent = self.parent(anchor).expect("anchor must be attached");
    let idx = self.index_in_parent(anchor).unwrap();
    self.data_mut(new).parent = Some(parent);
    self.data_mut(parent).children.insert(idx, new);
  }

  /// Inserts `new` directly after `anchor` under `anchor`'s parent.
  pub fn insert_after(&mut self, anchor: NodeId, new: NodeId) {
    debug_assert!(self.parent(new).is_none(), "new node must be detached");
    let parent = self.parent(anchor).expect("anchor must be attached");
    let idx = self.index_in_parent(anchor).unwrap();
    self.data_mut(new).parent = Some(parent);
    self.data_mut(parent).children.insert(idx + 1, new);
  }

  /// Removes the node from its parent. A no-op on already-detached nodes.
  pub fn detach(&mut self, n: NodeId) {
    let Some(parent) = self.parent(n) else {
      return;
    };
    let idx = self.index_in_parent(n).unwrap();
    self.data_mut(parent).children.remove(idx);
    self.data_mut(n).parent = None;
  }

  /// Replaces `old` with the detached node `new`, keeping the position.
  pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
    debug_assert!(self.parent(new).is_none(), "new node must be detached");
    let parent = self.parent(old).expect("old node must be attached");
    let idx = self.index_in_parent(old).unwrap();
    self.data_mut(parent).children[idx] = new;
    self.data_mut(new).parent = Some(parent);
    self.data_mut(old).parent = None;
  }

  /// Deep-copies a subtree, including annotations. The copy is detached.
  pub fn clone_tree(&mut self, n: NodeId) -> NodeId {
    let data = self.data(n);
    let kind = data.kind;
    let span = data.span;
    let string = data.string.clone();
    let original_name = data.original_name.clone();
    let jsdoc = data.jsdoc.clone();
    let props = data.props;
    let directives = data.directives.clone();
    let children: SmallVec<[NodeId; 4]> = data.children.clone();

    let copy = self.alloc(kind, span);
    self.data_mut(copy).string = string;
    self.data_mut(copy).original_name = original_name;
    self.data_mut(copy).jsdoc = jsdoc;
    self.data_mut(copy).props = props;
    self.data_mut(copy).directives = directives;
    for child in children {
      let child_copy = self.clone_tree(child);
      self.add_child_to_back(copy, child_copy);
    }
    copy
  }

  /// Whether the node occupies a statement position.
  pub fn is_statement(&self, n: NodeId) -> bool {
    self
      .parent(n)
      .is_some_and(|p| self.kind(p).is_statement_container())
  }

  /// The closest enclosing node (including `n` itself) in statement position.
  pub fn enclosing_statement(&self, n: NodeId) -> NodeId {
    let mut cur = n;
    loop {
      if self.is_statement(cur) {
        return cur;
      }
      cur = self
        .parent(cur)
        .expect("node is not inside a statement container");
    }
  }

  /// The enclosing script, including `n` itself.
  pub fn enclosing_script(&self, n: NodeId) -> Option<NodeId> {
    let mut cur = Some(n);
    while let Some(node) = cur {
      if self.kind(node) == Kind::Script {
        return Some(node);
      }
      cur = self.parent(node);
    }
    None
  }

  /// The enclosing change scope root: the nearest function or script,
  /// including `n` itself. `None` when the node is detached from any script.
  pub fn enclosing_change_scope_root(&self, n: NodeId) -> Option<NodeId> {
    let mut cur = Some(n);
    while let Some(node) = cur {
      if matches!(self.kind(node), Kind::Function | Kind::Script) {
        return Some(node);
      }
      cur = self.parent(node);
    }
    None
  }

  /// Whether the node is a `Name` or a `GetProp` chain of names, e.g.
  /// `goog.module.declareLegacyNamespace`.
  pub fn is_qualified_name(&self, n: NodeId) -> bool {
    match self.kind(n) {
      Kind::Name => true,
      Kind::GetProp => self
        .first_child(n)
        .is_some_and(|obj| self.is_qualified_name(obj)),
      _ => false,
    }
  }

  /// The dotted form of a qualified name, or `None` for other expressions.
  pub fn qualified_name(&self, n: NodeId) -> Option<String> {
    match self.kind(n) {
      Kind::Name => Some(self.string(n).to_string()),
      Kind::GetProp => {
        let obj = self.qualified_name(self.first_child(n)?)?;
        let prop = self.second_child(n)?;
        if self.kind(prop) != Kind::Str {
          return None;
        }
        Some(format!("{}.{}", obj, self.string(prop)))
      }
      _ => None,
    }
  }

  pub fn matches_qualified_name(&self, n: NodeId, dotted: &str) -> bool {
    self.qualified_name(n).as_deref() == Some(dotted)
  }

  /// Name nodes bound by a `var`/`let`/`const` declaration, in source order,
  /// looking through destructuring patterns.
  pub fn decl_lhs_names(&self, decl: NodeId) -> Vec<NodeId> {
    debug_assert!(self.kind(decl).is_name_declaration());
    let mut out = Vec::new();
    for &child in self.children(decl) {
      match self.kind(child) {
        Kind::Name => out.push(child),
        Kind::DestructuringLhs => {
          if let Some(pattern) = self.first_child(child) {
            self.collect_pattern_names(pattern, &mut out);
          }
        }
        _ => {}
      }
    }
    out
  }

  fn collect_pattern_names(&self, pattern: NodeId, out: &mut Vec<NodeId>) {
    match self.kind(pattern) {
      Kind::Name => out.push(pattern),
      Kind::ObjectPattern => {
        for &prop in self.children(pattern) {
          match self.kind(prop) {
            Kind::StringKey => {
              if let Some(target) = self.first_child(prop) {
                self.collect_pattern_names(target, out);
              }
            }
            Kind::ComputedProp => {
              if let Some(target) = self.second_child(prop) {
                self.collect_pattern_names(target, out);
              }
            }
            _ => {}
          }
        }
      }
      Kind::ArrayPattern => {
        for &elem in self.children(pattern) {
          self.collect_pattern_names(elem, out);
        }
      }
      _ => {}
    }
  }

  /// Dissolves a block into its parent: the block's children take its place
  /// in order and the block node is detached.
  pub fn merge_block_into_parent(&mut self, block: NodeId) {
    debug_assert!(self.kind(self.parent(block).unwrap()).is_statement_container());
    let idx = self.index_in_parent(block).unwrap();
    let parent = self.parent(block).unwrap();
    let children: SmallVec<[NodeId; 4]> = std::mem::take(&mut self.data_mut(block).children);
    self.data_mut(parent).children.remove(idx);
    self.data_mut(block).parent = None;
    for (offset, child) in children.iter().enumerate() {
      self.data_mut(*child).parent = Some(parent);
      self.data_mut(parent).children.insert(idx + offset, *child);
    }
  }

  /// Structural equality: kind, string payload and children, ignoring spans
  /// and annotations. This is the whitespace-insensitive tree comparison the
  /// rewrite tests use.
  pub fn structurally_equal(&self, a: NodeId, b: NodeId) -> bool {
    if self.kind(a) != self.kind(b) || self.string(a) != self.string(b) {
      return false;
    }
    let ac = self.children(a);
    let bc = self.children(b);
    ac.len() == bc.len()
      && ac
        .iter()
        .zip(bc.iter())
        .all(|(&x, &y)| self.structurally_equal(x, y))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::build;

  #[test]
  fn attach_detach_and_siblings() {
    let mut tree = Tree::new();
    let script = tree.alloc(Kind::Script, SYNTHETIC_SPAN);
    let a = build::name(&mut tree, "a");
    let b = build::name(&mut tree, "b");
    let c = build::name(&mut tree, "c");
    tree.add_child_to_back(script, a);
    tree.add_child_to_back(script, c);
    tree.insert_before(c, b);

    assert_eq!(tree.children(script), &[a, b, c]);
    assert_eq!(tree.next_sibling(a), Some(b));
    assert_eq!(tree.prev_sibling(c), Some(b));
    assert_eq!(tree.index_in_parent(b), Some(1));

    tree.detach(b);
    assert_eq!(tree.children(script), &[a, c]);
    assert_eq!(tree.parent(b), None);
    tree.detach(b);
    assert_eq!(tree.parent(b), None);

    tree.insert_after(a, b);
    assert_eq!(tree.children(script), &[a, b, c]);
  }

  #[test]
  fn replace_keeps_position() {
    let mut tree = Tree::new();
    let script = tree.alloc(Kind::Script, SYNTHETIC_SPAN);
    let a = build::name(&mut tree, "a");
    let b = build::name(&mut tree, "b");
    let c = build::name(&mut tree, "c");
    for n in [a, b, c] {
      tree.add_child_to_back(script, n);
    }
    let x = build::name(&mut tree, "x");
    tree.replace_with(b, x);
    assert_eq!(tree.children(script), &[a, x, c]);
    assert_eq!(tree.parent(b), None);
  }

  #[test]
  fn rename_records_original_name_once() {
    let mut tree = Tree::new();
    let n = build::name(&mut tree, "Bar");
    tree.set_string(n, "module$contents$foo$Bar_Bar");
    tree.set_string(n, "module$exports$foo$Bar");
    assert_eq!(tree.string(n), "module$exports$foo$Bar");
    assert_eq!(tree.original_name(n), Some("Bar"));
    assert_eq!(tree.source_name(n), "Bar");
  }

  #[test]
  fn qualified_names() {
    let mut tree = Tree::new();
    let qname = build::qname(&mut tree, "goog.module.get");
    assert!(tree.is_qualified_name(qname));
    assert_eq!(tree.qualified_name(qname).as_deref(), Some("goog.module.get"));
    assert!(tree.matches_qualified_name(qname, "goog.module.get"));
    assert!(!tree.matches_qualified_name(qname, "goog.module"));

    let inner = tree.first_child(qname).unwrap();
    assert!(tree.matches_qualified_name(inner, "goog.module"));

    let call = build::call(&mut tree, qname, vec![]);
    assert!(!tree.is_qualified_name(call));
  }

  #[test]
  fn decl_lhs_names_sees_through_patterns() {
    let mut tree = Tree::new();
    // const {a, b: c} = rhs; plus const d = 1;
    let a_key = build::string_key(&mut tree, "a");
    let a_name = build::name(&mut tree, "a");
    tree.add_child_to_back(a_key, a_name);
    let b_key = build::string_key(&mut tree, "b");
    let c_name = build::name(&mut tree, "c");
    tree.add_child_to_back(b_key, c_name);
    let pattern = build::object_pattern(&mut tree, vec![a_key, b_key]);
    let rhs = build::name(&mut tree, "rhs");
    let destructuring = build::destructuring_lhs(&mut tree, pattern, rhs);
    let decl = tree.alloc(Kind::Const, SYNTHETIC_SPAN);
    tree.add_child_to_back(decl, destructuring);

    let names: Vec<String> = tree
      .decl_lhs_names(decl)
      .into_iter()
      .map(|n| tree.string(n).to_string())
      .collect();
    assert_eq!(names, vec!["a".to_string(), "c".into()]);
  }

  #[test]
  fn merge_block_splices_children() {
    let mut tree = Tree::new();
    let script = tree.alloc(Kind::Script, SYNTHETIC_SPAN);
    let before = build::empty(&mut tree);
    let block = tree.alloc(Kind::Block, SYNTHETIC_SPAN);
    let x = build::empty(&mut tree);
    let y = build::empty(&mut tree);
    tree.add_child_to_back(block, x);
    tree.add_child_to_back(block, y);
    let after = build::empty(&mut tree);
    tree.add_child_to_back(script, before);
    tree.add_child_to_back(script, block);
    tree.add_child_to_back(script, after);

    tree.merge_block_into_parent(block);
    assert_eq!(tree.children(script), &[before, x, y, after]);
    assert_eq!(tree.parent(x), Some(script));
    assert_eq!(tree.parent(block), None);
  }

  #[test]
  fn clone_tree_is_deep_and_detached() {
    let mut tree = Tree::new();
    let qname = build::qname(&mut tree, "a.b.c");
    tree.put_bool_prop(qname, BoolProp::IsNamespace, true);
    let copy = tree.clone_tree(qname);
    assert!(tree.parent(copy).is_none());
    assert!(tree.structurally_equal(qname, copy));
    assert!(tree.get_bool_prop(copy, BoolProp::IsNamespace));
    assert_ne!(copy, qname);
    assert_ne!(tree.first_child(copy), tree.first_child(qname));
  }

  #[test]
  fn enclosing_queries() {
    let mut tree = Tree::new();
    let script = tree.alloc(Kind::Script, SYNTHETIC_SPAN);
    let body = tree.alloc(Kind::ModuleBody, SYNTHETIC_SPAN);
    tree.add_child_to_back(script, body);
    let callee = build::qname(&mut tree, "goog.module");
    let arg = build::string(&mut tree, "a.b");
    let call = build::call(&mut tree, callee, vec![arg]);
    let stmt = build::expr_result(&mut tree, call);
    tree.add_child_to_back(body, stmt);

    assert_eq!(tree.enclosing_statement(arg), stmt);
    assert_eq!(tree.enclosing_script(arg), Some(script));
    assert_eq!(tree.enclosing_change_scope_root(arg), Some(script));
    assert!(tree.is_statement(stmt));
    assert!(!tree.is_statement(call));

    tree.detach(stmt);
    assert_eq!(tree.enclosing_change_scope_root(arg), None);
  }
}
