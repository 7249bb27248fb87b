use diagnostics::Span;

/// A dotted type reference inside a doc comment, e.g. the `foo.Bar` in
/// `@param {foo.Bar} x`.
///
/// Type references are plain strings, not tree nodes: doc-comment rewriting is
/// textual and keeps the original comment span.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TypeName {
  pub text: String,
  pub span: Span,
}

impl TypeName {
  pub fn new(text: impl Into<String>, span: Span) -> Self {
    Self {
      text: text.into(),
      span,
    }
  }
}

/// The parts of a JSDoc record the rewriting passes observe and produce.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct JsDoc {
  /// `@const`.
  pub is_const: bool,
  /// `@typedef {...}`.
  pub has_typedef: bool,
  /// Every dotted type reference in the comment, in source order.
  pub type_names: Vec<TypeName>,
}

impl JsDoc {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_type(mut self, type_name: TypeName) -> Self {
    self.type_names.push(type_name);
    self
  }

  pub fn typedef(mut self) -> Self {
    self.has_typedef = true;
    self
  }

  pub fn constant(mut self) -> Self {
    self.is_const = true;
    self
  }
}
