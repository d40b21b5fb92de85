use std::fmt::Write;

use fbl_ast::{ClassDecl, QualType};
use tracing::{debug, instrument};

use crate::diagnostic::DiagnosticKind;
use crate::error::Error;
use crate::module::write_code;
use crate::overload::OverloadRegistry;
use crate::resolve::Warn;
use crate::Generator;
type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything scoped to the class currently being generated
pub struct ClassContext<'a> {
    pub(crate) class: &'a ClassDecl,
    /// Name of the Fortran derived type
    pub(crate) name: String,
    /// `Class *`, the type the C++ object is handed around as
    pub(crate) handle_type: QualType,
    /// `procedure ::` lines for the `contains` section
    pub(crate) procedures: String,
    pub(crate) overloads: OverloadRegistry,
    pub(crate) finalizer: Option<String>,
}

impl<'a> ClassContext<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn bind(&mut self, binding: &str) {
        self.procedures.push_str("  ");
        self.procedures.push_str(binding);
        self.procedures.push('\n');
    }

    fn has_bindings(&self) -> bool {
        !self.procedures.is_empty() || !self.overloads.is_empty() || self.finalizer.is_some()
    }
}

impl<'a> Generator<'a> {
    /// Start generating `class`. Fails with [`Error::DuplicateClass`] (after reporting it) if a class with the
    /// same Fortran name was already generated.
    pub fn begin_class(&mut self, class: &'a ClassDecl) -> Result<ClassContext<'a>> {
        let name = class.public_name();
        if let Err(previous) = self.class_symbols.register(&name, class.location()) {
            self.resolver.diagnostics_mut().report(
                DiagnosticKind::DuplicateClass,
                class.location(),
                format!("class \"{name}\" is already defined at {previous}"),
            );
            return Err(Error::DuplicateClass {
                name,
                location: class.location().clone(),
                previous,
            });
        }

        if !class.bases().is_empty() {
            self.resolver.diagnostics_mut().report(
                DiagnosticKind::UnsupportedFeature,
                class.location(),
                format!(
                    "base classes of \"{}\" are ignored: {}",
                    class.name(),
                    class.bases().join(", ")
                ),
            );
        }

        Ok(ClassContext {
            class,
            name,
            handle_type: QualType::pointer(QualType::named(class.name())),
            procedures: String::new(),
            overloads: OverloadRegistry::new(),
            finalizer: None,
        })
    }

    /// Write the derived type for the class and export it
    pub fn end_class(&mut self, ctx: ClassContext<'a>) -> Result<()> {
        if !self.config.proxy_classes {
            return Ok(());
        }

        let fdata = self
            .resolver
            .resolve(
                "fdata",
                &QualType::named(ctx.class.name()),
                None,
                Warn::MissingTemplate,
                None,
                ctx.class.location(),
            )
            .map(|tm| tm.code().to_string())
            .unwrap_or_default();

        let out = &mut self.output.f_types;
        writeln!(out, " type :: {}", ctx.name)?;
        write_code(out, &fdata, "  ")?;
        if ctx.has_bindings() {
            writeln!(out, " contains")?;
            out.push_str(&ctx.procedures);
            ctx.overloads.write_generics(out)?;
            if let Some(finalizer) = &ctx.finalizer {
                writeln!(out, "  final :: {finalizer}")?;
            }
        }
        writeln!(out, " end type {}", ctx.name)?;

        writeln!(self.output.f_public, " public :: {}", ctx.name)?;
        Ok(())
    }

    /// Generate a class and all of its members. Members that clash with an existing symbol are skipped.
    #[instrument(level = "trace", skip(self, class), fields(name = class.name()))]
    pub fn emit_class(&mut self, class: &'a ClassDecl) -> Result<()> {
        let mut ctx = self.begin_class(class)?;

        for member in class.members() {
            match self.emit_function(member, Some(&mut ctx)) {
                Err(e) if e.is_skip() => debug!("skipped member: {e}"),
                Err(e) => {
                    return Err(Error::FailedToGenerateClass {
                        name: class.name().to_string(),
                        source: Box::new(e),
                    })
                }
                Ok(()) => (),
            }
        }

        self.end_class(ctx).map_err(|e| Error::FailedToGenerateClass {
            name: class.name().to_string(),
            source: Box::new(e),
        })
    }
}
