use fbl_ast::{
    typemap::{SWIGENUM, SWIGTYPE},
    Parameter, QualType, SourceLocation, TypeCategory, Typemap, TypemapAttachments, TypemapSource, AST,
};
use hashbrown::HashMap;
use tracing::{instrument, trace, warn};
use ustr::Ustr;

use crate::diagnostic::{DiagnosticKind, Diagnostics};

/// Whether a failed lookup is worth a diagnostic
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Warn {
    /// Optional operations (`check`, `argout`, `fpre`, ...). A miss is simply `None`.
    Silent,
    /// A miss returns a placeholder and reports `missing-template`
    MissingTemplate,
}

#[derive(Clone, Debug)]
enum Cached {
    Found(Typemap),
    Placeholder(Typemap),
}

/// Looks up typemaps for types, caching what it finds. Owns the diagnostics for the run.
pub struct Resolver<'a> {
    pub(crate) ast: &'a AST,
    typemaps: &'a dyn TypemapSource,
    cache: HashMap<(Ustr, String), Cached>,
    /// Placeholder class names handed out for unknown types, in order of first use
    pub(crate) opaque_types: Vec<String>,
    pub(crate) diagnostics: Diagnostics,
}

impl<'a> Resolver<'a> {
    pub fn new(ast: &'a AST, typemaps: &'a dyn TypemapSource) -> Resolver<'a> {
        Resolver {
            ast,
            typemaps,
            cache: HashMap::new(),
            opaque_types: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn ast(&self) -> &'a AST {
        self.ast
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn opaque_types(&self) -> &[String] {
        &self.opaque_types
    }

    /// Find the typemap for `op` applied to `qual_type`.
    ///
    /// A typemap in `attached` wins over the store. With a `suffix`, `op:suffix` is tried before `op`. The store is
    /// searched with the declared signature, then the typedef-resolved one, then that with its top-level `const`
    /// stripped, then the generic `SWIGTYPE`/`SWIGENUM` form of the same shape. `$fclassname` is substituted in
    /// whatever is found.
    #[instrument(level = "trace", skip(self, attached))]
    pub fn resolve(
        &mut self,
        op: &str,
        qual_type: &QualType,
        attached: Option<&TypemapAttachments>,
        warn: Warn,
        suffix: Option<&str>,
        location: &SourceLocation,
    ) -> Option<Typemap> {
        let ops = match suffix {
            Some(suffix) => vec![format!("{op}:{suffix}"), op.to_string()],
            None => vec![op.to_string()],
        };

        if let Some(attached) = attached {
            if let Some(tm) = ops.iter().find_map(|o| attached.get(o)) {
                let tm = tm.clone();
                return Some(self.apply_class_name(qual_type, tm, location));
            }
        }

        let key = (Ustr::from(ops[0].as_str()), qual_type.to_string());
        match self.cache.get(&key) {
            Some(Cached::Found(tm)) => return Some(tm.clone()),
            Some(Cached::Placeholder(tm)) => {
                return match warn {
                    Warn::Silent => None,
                    Warn::MissingTemplate => Some(tm.clone()),
                }
            }
            None => (),
        }

        let candidates = self.candidates(qual_type);
        let typemaps = self.typemaps;
        let found = ops
            .iter()
            .find_map(|o| candidates.iter().find_map(|sig| typemaps.lookup(o, sig)))
            .cloned();

        match found {
            Some(tm) => {
                let tm = self.apply_class_name(qual_type, tm, location);
                trace!("{} {qual_type} -> {}", ops[0], tm.code());
                self.cache.insert(key, Cached::Found(tm.clone()));
                Some(tm)
            }
            None if warn == Warn::Silent => None,
            None => {
                let placeholder = Typemap::new(&placeholder_name(qual_type));
                self.diagnostics.report(
                    DiagnosticKind::MissingTemplate,
                    location,
                    format!("no \"{}\" typemap defined for \"{qual_type}\"", ops[0]),
                );
                self.cache.insert(key, Cached::Placeholder(placeholder.clone()));
                Some(placeholder)
            }
        }
    }

    /// Resolve `op` for every parameter ahead of time. The returned attachments hold the parameter's own typemaps
    /// plus the resolved one, so that later calls to [`resolve`](Self::resolve) can pass them as `attached`.
    pub fn attach(
        &mut self,
        op: &str,
        parameters: &[Parameter],
        warn: Warn,
        location: &SourceLocation,
    ) -> Vec<TypemapAttachments> {
        parameters
            .iter()
            .map(|p| {
                let mut attachments = p.typemaps().clone();
                if attachments.get(op).is_none() {
                    if let Some(tm) = self.resolve(op, p.qual_type(), None, warn, None, location) {
                        attachments.attach(op, tm);
                    }
                }
                attachments
            })
            .collect()
    }

    /// Signatures to try in the store, most specific first, without repeats
    fn candidates(&self, qual_type: &QualType) -> Vec<String> {
        let mut result = vec![qual_type.to_string()];
        let mut push = |sig: String| {
            if !result.contains(&sig) {
                result.push(sig);
            }
        };

        let resolved = match self.ast.resolve_typedefs(qual_type) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("{e}");
                qual_type.clone()
            }
        };
        let stripped = resolved.strip_qualifiers();
        push(resolved.to_string());
        push(stripped.to_string());

        let generic = match self.ast.categorize(&resolved) {
            Ok(TypeCategory::Enum(_)) | Ok(TypeCategory::UnknownEnum(_)) => Some(SWIGENUM),
            Ok(category) if category.is_class_like() => Some(SWIGTYPE),
            _ => None,
        };

        if let Some(generic) = generic {
            let generic = QualType::named(generic);
            push(resolved.replace_base(&generic).to_string());
            push(stripped.replace_base(&generic).to_string());
        }

        result
    }

    fn apply_class_name(&mut self, qual_type: &QualType, tm: Typemap, location: &SourceLocation) -> Typemap {
        match self.substitute_class_name(qual_type, tm.code(), location) {
            Some(code) => tm.with_code(code),
            None => tm,
        }
    }
}

/// The marker substituted for a typemap that could not be found, e.g. `SWIGTYPE_p_double`
pub fn placeholder_name(qual_type: &QualType) -> String {
    format!("SWIGTYPE_{}", qual_type.mangle())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbl_ast::{ClassDecl, Enum, Typedef, TypemapTable};

    fn test_ast() -> Result<AST, fbl_ast::Error> {
        let mut ast = AST::new("test");
        ast.add_class(ClassDecl::new("ns::Foo"));
        ast.add_enum(Enum::new("ns::Color", &[("RED", 0), ("GREEN", 1)]));
        ast.add_typedef(Typedef::new("real_t", "double".parse()?));
        ast.add_typedef(Typedef::new("ns::FooRef", "const ns::Foo &".parse()?));
        Ok(ast)
    }

    #[test]
    fn lookup_chain() -> Result<(), fbl_ast::Error> {
        let ast = test_ast()?;
        let tm = TypemapTable::fortran();
        let mut resolver = Resolver::new(&ast, &tm);
        let loc = SourceLocation::default();

        let code = |t: Option<Typemap>| t.map(|t| t.code().to_string());

        // typedef resolution
        assert_eq!(
            code(resolver.resolve("ftype", &"const real_t &".parse()?, None, Warn::MissingTemplate, None, &loc)),
            Some("real(C_DOUBLE), intent(in)".to_string())
        );
        // top-level const stripped
        assert_eq!(
            code(resolver.resolve("ctype", &"const int".parse()?, None, Warn::MissingTemplate, None, &loc)),
            Some("int".to_string())
        );
        // generic class fallback with class name substitution
        assert_eq!(
            code(resolver.resolve("ftype", &"ns::FooRef".parse()?, None, Warn::MissingTemplate, None, &loc)),
            Some("class(Foo), intent(in)".to_string())
        );
        // suffixed operation first
        assert_eq!(
            code(resolver.resolve("ctype", &"ns::Foo".parse()?, None, Warn::MissingTemplate, Some("out"), &loc)),
            Some("void *".to_string())
        );
        // enums
        assert_eq!(
            code(resolver.resolve("ftype", &"ns::Color".parse()?, None, Warn::MissingTemplate, None, &loc)),
            Some("integer(kind(ns_Color)), intent(in)".to_string())
        );
        // enums the AST does not declare
        assert_eq!(
            code(resolver.resolve("ctype", &"enum Mode".parse()?, None, Warn::MissingTemplate, None, &loc)),
            Some("int".to_string())
        );
        assert_eq!(
            code(resolver.resolve("ftype", &"const enum Mode &".parse()?, None, Warn::MissingTemplate, None, &loc)),
            Some("integer(kind(C_INT)), intent(in)".to_string())
        );
        assert_eq!(resolver.diagnostics().iter().count(), 0);
        Ok(())
    }

    #[test]
    fn attached_typemaps_win() -> Result<(), fbl_ast::Error> {
        let ast = test_ast()?;
        let tm = TypemapTable::fortran();
        let mut resolver = Resolver::new(&ast, &tm);
        let loc = SourceLocation::default();

        let attached = TypemapAttachments::new().with("ftype", Typemap::new("integer(C_INT), intent(inout)"));
        let found = resolver.resolve("ftype", &QualType::int(), Some(&attached), Warn::MissingTemplate, None, &loc);
        assert_eq!(found.map(|t| t.code().to_string()).as_deref(), Some("integer(C_INT), intent(inout)"));

        let params = vec![Parameter::new("x", "double".parse()?), Parameter::new("y", "int".parse()?)];
        let attachments = resolver.attach("in", &params, Warn::MissingTemplate, &loc);
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].get("in").map(|t| t.code()), Some("$1 = ($1_ltype)$input;"));
        Ok(())
    }

    #[test]
    fn misses_are_deterministic_and_reported_once() -> Result<(), fbl_ast::Error> {
        let ast = test_ast()?;
        let tm = TypemapTable::fortran();
        let loc = SourceLocation::new("test.hpp", 12);
        let qt: QualType = "double **".parse()?;

        let mut first = Resolver::new(&ast, &tm);
        assert!(first.resolve("ftype", &qt, None, Warn::Silent, None, &loc).is_none());
        let a = first.resolve("ftype", &qt, None, Warn::MissingTemplate, None, &loc);
        let b = first.resolve("ftype", &qt, None, Warn::MissingTemplate, None, &loc);
        assert_eq!(a.as_ref().map(|t| t.code()), Some("SWIGTYPE_p_p_double"));
        assert_eq!(a, b);
        assert_eq!(first.diagnostics().count(DiagnosticKind::MissingTemplate), 1);
        assert!(first.resolve("ftype", &qt, None, Warn::Silent, None, &loc).is_none());

        let mut second = Resolver::new(&ast, &tm);
        let c = second.resolve("ftype", &qt, None, Warn::MissingTemplate, None, &loc);
        assert_eq!(a, c);
        Ok(())
    }
}
