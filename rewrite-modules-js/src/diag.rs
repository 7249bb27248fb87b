//! Diagnostic constructors for the module rewriter.
//!
//! Every diagnostic has a stable code; messages are formatted here so tests
//! and hosts see one canonical phrasing per code.

use diagnostics::Diagnostic;
use diagnostics::Severity;
use diagnostics::Span;

pub const INVALID_MODULE_NAMESPACE: &str = "JSC_GOOG_MODULE_INVALID_MODULE_NAMESPACE";
pub const INVALID_PROVIDE_NAMESPACE: &str = "JSC_GOOG_MODULE_INVALID_PROVIDE_NAMESPACE";
pub const INVALID_REQUIRE_NAMESPACE: &str = "JSC_GOOG_MODULE_INVALID_REQUIRE_NAMESPACE";
pub const INVALID_FORWARD_DECLARE_NAMESPACE: &str =
  "JSC_GOOG_MODULE_INVALID_FORWARD_DECLARE_NAMESPACE";
pub const INVALID_GET_NAMESPACE: &str = "JSC_GOOG_MODULE_INVALID_GET_NAMESPACE";
pub const INVALID_PROVIDE_CALL: &str = "JSC_GOOG_MODULE_INVALID_PROVIDE_CALL";
pub const INVALID_GET_CALL_SCOPE: &str = "JSC_GOOG_MODULE_INVALID_GET_CALL_SCOPE";
pub const INVALID_GET_ALIAS: &str = "JSC_GOOG_MODULE_INVALID_GET_ALIAS";
pub const INVALID_EXPORT_COMPUTED_PROPERTY: &str =
  "JSC_GOOG_MODULE_INVALID_EXPORT_COMPUTED_PROPERTY";
pub const USELESS_USE_STRICT_DIRECTIVE: &str = "JSC_USELESS_USE_STRICT_DIRECTIVE";
pub const DUPLICATE_MODULE: &str = "JSC_DUPLICATE_MODULE";
pub const DUPLICATE_NAMESPACE: &str = "JSC_DUPLICATE_NAMESPACE";
pub const MISSING_MODULE_OR_PROVIDE: &str = "JSC_MISSING_MODULE_OR_PROVIDE";
pub const LATE_PROVIDE_ERROR: &str = "JSC_LATE_PROVIDE_ERROR";
pub const IMPORT_INLINING_SHADOWS_VAR: &str = "JSC_IMPORT_INLINING_SHADOWS_VAR";
pub const QUALIFIED_REFERENCE_TO_GOOG_MODULE: &str = "JSC_QUALIFIED_REFERENCE_TO_GOOG_MODULE";
pub const ILLEGAL_DESTRUCTURING_DEFAULT_EXPORT: &str = "JSC_ILLEGAL_DESTRUCTURING_DEFAULT_EXPORT";
pub const ILLEGAL_DESTRUCTURING_NOT_EXPORTED: &str = "JSC_ILLEGAL_DESTRUCTURING_NOT_EXPORTED";

pub fn invalid_module_namespace(span: Span) -> Diagnostic {
  Diagnostic::error(
    INVALID_MODULE_NAMESPACE,
    "goog.module parameter must be string literals",
    span,
  )
}

pub fn invalid_provide_namespace(span: Span) -> Diagnostic {
  Diagnostic::error(
    INVALID_PROVIDE_NAMESPACE,
    "goog.provide parameter must be a string literal.",
    span,
  )
}

pub fn invalid_require_namespace(span: Span) -> Diagnostic {
  Diagnostic::error(
    INVALID_REQUIRE_NAMESPACE,
    "goog.require parameter must be a string literal.",
    span,
  )
}

pub fn invalid_forward_declare_namespace(span: Span) -> Diagnostic {
  Diagnostic::error(
    INVALID_FORWARD_DECLARE_NAMESPACE,
    "goog.forwardDeclare parameter must be a string literal.",
    span,
  )
}

pub fn invalid_get_namespace(span: Span) -> Diagnostic {
  Diagnostic::error(
    INVALID_GET_NAMESPACE,
    "goog.module.get parameter must be a string literal.",
    span,
  )
}

pub fn invalid_provide_call(span: Span) -> Diagnostic {
  Diagnostic::error(
    INVALID_PROVIDE_CALL,
    "goog.provide can not be called in goog.module.",
    span,
  )
}

pub fn invalid_get_call_scope(span: Span) -> Diagnostic {
  Diagnostic::error(
    INVALID_GET_CALL_SCOPE,
    "goog.module.get can not be called in global scope.",
    span,
  )
}

pub fn invalid_get_alias(span: Span) -> Diagnostic {
  Diagnostic::error(
    INVALID_GET_ALIAS,
    "goog.module.get should not be aliased.",
    span,
  )
}

pub fn invalid_export_computed_property(span: Span) -> Diagnostic {
  Diagnostic::error(
    INVALID_EXPORT_COMPUTED_PROPERTY,
    "Computed properties are not yet supported in goog.module exports.",
    span,
  )
}

pub fn useless_use_strict_directive(span: Span) -> Diagnostic {
  Diagnostic::new(
    Severity::Disabled,
    USELESS_USE_STRICT_DIRECTIVE,
    "'use strict' is unnecessary in goog.module files.",
    span,
  )
}

pub fn duplicate_module(namespace: &str, span: Span) -> Diagnostic {
  Diagnostic::error(
    DUPLICATE_MODULE,
    format!("Duplicate module: {}", namespace),
    span,
  )
}

pub fn duplicate_namespace(namespace: &str, span: Span) -> Diagnostic {
  Diagnostic::error(
    DUPLICATE_NAMESPACE,
    format!("Duplicate namespace: {}", namespace),
    span,
  )
}

pub fn missing_module_or_provide(namespace: &str, span: Span) -> Diagnostic {
  Diagnostic::error(
    MISSING_MODULE_OR_PROVIDE,
    format!("Required namespace \"{}\" never defined.", namespace),
    span,
  )
}

pub fn late_provide_error(namespace: &str, span: Span) -> Diagnostic {
  Diagnostic::error(
    LATE_PROVIDE_ERROR,
    format!("Required namespace \"{}\" not provided yet.", namespace),
    span,
  )
}

pub fn import_inlining_shadows_var(
  shadowing_name: &str,
  inlined_namespace: &str,
  span: Span,
) -> Diagnostic {
  Diagnostic::error(
    IMPORT_INLINING_SHADOWS_VAR,
    format!(
      "Inlining of reference to import \"{}\" shadows var \"{}\".",
      inlined_namespace, shadowing_name
    ),
    span,
  )
}

pub fn qualified_reference_to_goog_module(qualified_name: &str, span: Span) -> Diagnostic {
  Diagnostic::error(
    QUALIFIED_REFERENCE_TO_GOOG_MODULE,
    format!(
      "Fully qualified reference to name '{}' provided by a goog.module.\n\
       Either use short import syntax or convert module to use \
       goog.module.declareLegacyNamespace.",
      qualified_name
    ),
    span,
  )
}

pub fn illegal_destructuring_default_export(span: Span) -> Diagnostic {
  Diagnostic::error(
    ILLEGAL_DESTRUCTURING_DEFAULT_EXPORT,
    "Destructuring import only allowed for importing module with named exports.\n\
     See https://github.com/google/closure-compiler/wiki/goog.module-style",
    span,
  )
}

pub fn illegal_destructuring_not_exported(
  export_name: &str,
  namespace: &str,
  span: Span,
) -> Diagnostic {
  Diagnostic::error(
    ILLEGAL_DESTRUCTURING_NOT_EXPORTED,
    format!(
      "Destructuring import reference to name \"{}\" was not exported in module {}",
      export_name, namespace
    ),
    span,
  )
}
