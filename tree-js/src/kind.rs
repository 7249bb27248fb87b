/// Token kind of a tree node.
///
/// The set is intentionally limited to the statement and expression forms the
/// module-rewriting passes traverse and synthesize; it is not a full
/// ECMAScript grammar.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Kind {
  /// Parent of all scripts in one compilation batch.
  Root,
  Script,
  /// Body of a `goog.module` file or an unwrapped `goog.loadModule` literal.
  ModuleBody,
  Block,
  ExprResult,
  Call,
  New,
  GetProp,
  Name,
  /// String literal. The prop component of a [`Kind::GetProp`] is also a
  /// `Str` node.
  Str,
  Number,
  StringKey,
  ComputedProp,
  ObjectLit,
  ObjectPattern,
  ArrayPattern,
  DestructuringLhs,
  Var,
  Let,
  Const,
  Function,
  Class,
  ParamList,
  Assign,
  Return,
  Empty,
}

impl Kind {
  /// `var` / `let` / `const`.
  pub fn is_name_declaration(self) -> bool {
    matches!(self, Kind::Var | Kind::Let | Kind::Const)
  }

  /// Whether nodes of this kind directly contain statements.
  pub fn is_statement_container(self) -> bool {
    matches!(self, Kind::Script | Kind::ModuleBody | Kind::Block)
  }

  /// Whether this kind carries a meaningful string payload.
  pub fn has_string(self) -> bool {
    matches!(
      self,
      Kind::Name | Kind::Str | Kind::Number | Kind::StringKey
    )
  }
}
