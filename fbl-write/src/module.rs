use std::fmt::Write;

use fbl_ast::{Enum, QualType, SourceLocation, AST};
use fbl_util::BindConfig;
use tracing::instrument;

use crate::error::Error;
use crate::resolve::Warn;
use crate::Generator;
type Result<T, E = Error> = std::result::Result<T, E>;

const SWIGEXPORT: &str = indoc::indoc! {r#"
    #ifndef SWIGEXPORT
    # if defined(_WIN32) || defined(__WIN32__) || defined(__CYGWIN__)
    #   define SWIGEXPORT __declspec(dllexport)
    # elif defined(__GNUC__)
    #   define SWIGEXPORT __attribute__ ((visibility("default")))
    # else
    #   define SWIGEXPORT
    # endif
    #endif
"#};

/// The generated text, kept as separate streams that are only put together at the very end
#[derive(Debug, Default)]
pub struct ModuleOutput {
    pub c_begin: String,
    pub c_runtime: String,
    pub c_wrapper: String,
    pub c_init: String,
    pub f_imports: String,
    pub f_public: String,
    pub f_generic_interfaces: String,
    pub f_types: String,
    pub f_interfaces: String,
    pub f_proxies: String,
}

impl ModuleOutput {
    pub fn new(ast: &AST, config: &BindConfig) -> ModuleOutput {
        let mut output = ModuleOutput::default();

        for include in ast.includes() {
            if include.starts_with('<') || include.starts_with('"') {
                output.c_begin.push_str(&format!("#include {include}\n"));
            } else {
                output.c_begin.push_str(&format!("#include \"{include}\"\n"));
            }
        }

        output.c_runtime.push_str(SWIGEXPORT);

        for code in ast.init() {
            output.c_init.push_str(code.trim_end());
            output.c_init.push('\n');
        }

        output.f_imports.push_str(" use, intrinsic :: ISO_C_BINDING\n");
        for import in &config.imports {
            output.f_imports.push_str(&format!(" use {import}\n"));
        }

        output
    }

    pub fn c_source(&self) -> String {
        let mut source = String::new();
        for section in [&self.c_begin, &self.c_runtime] {
            if !section.is_empty() {
                source.push_str(section);
                source.push('\n');
            }
        }

        source.push_str("extern \"C\" {\n\n");
        source.push_str(&self.c_wrapper);
        source.push_str("} // extern \"C\"\n");

        if !self.c_init.is_empty() {
            source.push('\n');
            source.push_str(&self.c_init);
        }
        source
    }

    pub fn fortran_source(&self, module_name: &str) -> String {
        let mut source = format!("module {module_name}\n");
        source.push_str(&self.f_imports);
        source.push_str(" implicit none\n");
        source.push_str(" private\n");

        for section in [&self.f_public, &self.f_types, &self.f_generic_interfaces] {
            if !section.is_empty() {
                source.push('\n');
                source.push_str(section);
            }
        }

        if !self.f_interfaces.is_empty() {
            source.push_str("\n interface\n");
            source.push_str(&self.f_interfaces);
            source.push_str(" end interface\n");
        }

        if !self.f_proxies.is_empty() {
            source.push_str("\ncontains\n");
            source.push_str(&self.f_proxies);
        }

        source.push_str(&format!("\nend module {module_name}\n"));
        source
    }
}

/// Write each line of `code` to `out` with `indent` prepended, dropping trailing whitespace and blank lines
pub(crate) fn write_code(out: &mut String, code: &str, indent: &str) -> std::fmt::Result {
    for line in code.lines() {
        let line = line.trim_end();
        if !line.is_empty() {
            writeln!(out, "{indent}{line}")?;
        }
    }
    Ok(())
}

impl<'a> Generator<'a> {
    /// Enums become `enum, bind(c)` blocks. The first enumerator is a marker named after the enum so that
    /// `kind(<marker>)` can be used as the Fortran type of the enum.
    #[instrument(level = "trace", skip(self))]
    pub fn emit_enum(&mut self, enm: &Enum) -> Result<()> {
        let mut names = Vec::new();
        let out = &mut self.output.f_types;

        writeln!(out, " enum, bind(c)")?;
        if let Some(marker) = enm.marker() {
            writeln!(out, "  enumerator :: {marker} = -1")?;
            names.push(marker);
        }
        for (name, value) in enm.variants() {
            writeln!(out, "  enumerator :: {name} = {value}")?;
            names.push(name.clone());
        }
        writeln!(out, " end enum")?;

        if !names.is_empty() {
            writeln!(self.output.f_public, " public :: {}", names.join(", "))?;
        }

        Ok(())
    }

    /// Module scope overload interfaces and the opaque types handed out for unknown classes
    pub(crate) fn write_module_tables(&mut self) -> Result<()> {
        self.module_overloads
            .write_module_interfaces(&mut self.output.f_generic_interfaces)?;

        let opaque_types = self.resolver.opaque_types().to_vec();
        for name in opaque_types {
            let fdata = self
                .resolver
                .resolve(
                    "fdata",
                    &QualType::named(&name),
                    None,
                    Warn::MissingTemplate,
                    None,
                    &SourceLocation::default(),
                )
                .map(|tm| tm.code().to_string())
                .unwrap_or_default();

            let out = &mut self.output.f_types;
            writeln!(out, " type, public :: {name}")?;
            write_code(out, &fdata, "  ")?;
            writeln!(out, " end type {name}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbl_ast::TypemapTable;

    #[test]
    fn enums_are_exported_with_their_marker() -> Result<()> {
        let mut ast = AST::new("colors");
        ast.add_enum(Enum::new("ns::Color", &[("RED", 0), ("GREEN", 4)]));
        let tm = TypemapTable::fortran();
        let mut generator = Generator::new(&ast, &tm, &BindConfig::default());
        let id = ast.find_enum("ns::Color")?;
        generator.emit_enum(ast.enm(id))?;

        assert_eq!(
            generator.output.f_types,
            concat!(
                " enum, bind(c)\n",
                "  enumerator :: ns_Color = -1\n",
                "  enumerator :: RED = 0\n",
                "  enumerator :: GREEN = 4\n",
                " end enum\n",
            )
        );
        assert_eq!(generator.output.f_public, " public :: ns_Color, RED, GREEN\n");
        Ok(())
    }

    #[test]
    fn empty_module_layout() {
        let mut ast = AST::new("empty");
        ast.add_include("empty.hpp");
        let config = BindConfig {
            imports: vec!["other".to_string()],
            ..Default::default()
        };
        let output = ModuleOutput::new(&ast, &config);

        let c = output.c_source();
        assert!(c.starts_with("#include \"empty.hpp\"\n\n#ifndef SWIGEXPORT\n"));
        assert!(c.ends_with("extern \"C\" {\n\n} // extern \"C\"\n"));

        assert_eq!(
            output.fortran_source("empty"),
            concat!(
                "module empty\n",
                " use, intrinsic :: ISO_C_BINDING\n",
                " use other\n",
                " implicit none\n",
                " private\n",
                "\n",
                "end module empty\n",
            )
        );
    }
}
