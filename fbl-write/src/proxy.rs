use std::fmt::Write;

use fbl_ast::{AccessorRole, DeclKind, DeclarationNode, QualType, SourceLocation, TypemapAttachments};
use hashbrown::HashSet;
use tracing::instrument;

use crate::class::ClassContext;
use crate::error::Error;
use crate::module::write_code;
use crate::resolve::Warn;
use crate::shim::ShimOutput;
use crate::subst::substitute;
use crate::Generator;
type Result<T, E = Error> = std::result::Result<T, E>;

/// Which family of body typemaps a proxy is built from
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmissionMode {
    /// `fout`
    Function,
    /// `fcreate`. Always a subroutine that fills in a `self` passed by the caller.
    Constructor,
    /// `frelease`
    Destructor,
}

impl EmissionMode {
    pub fn for_kind(kind: &DeclKind) -> EmissionMode {
        match kind {
            DeclKind::Constructor => EmissionMode::Constructor,
            DeclKind::Destructor => EmissionMode::Destructor,
            _ => EmissionMode::Function,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyOutput {
    pub proxy_name: String,
    pub routine: String,
    pub is_subroutine: bool,
    /// Dummy arguments of the routine, in order
    pub dummy_arguments: Vec<String>,
    /// Arguments passed to the shim, in order
    pub call_arguments: Vec<String>,
}

/// Names that cannot be used for dummy arguments
const FORTRAN_RESERVED: &[&str] = &[
    "allocatable", "allocate", "associate", "block", "call", "case", "character", "class", "common", "complex",
    "contains", "cycle", "data", "deallocate", "default", "dimension", "do", "double", "else", "elseif", "end",
    "entry", "enum", "enumerator", "exit", "external", "final", "format", "function", "generic", "go", "goto", "if",
    "implicit", "import", "in", "inout", "integer", "intent", "interface", "intrinsic", "kind", "len", "logical",
    "module", "none", "nullify", "only", "optional", "out", "parameter", "pointer", "precision", "private",
    "procedure", "program", "public", "real", "result", "return", "save", "select", "sequence", "stop",
    "subroutine", "target", "then", "type", "use", "value", "where", "while", "fresult", "swig_result",
];

/// Fortran is not case sensitive, so names are compared lowercased
fn unique_argument_name(name: &str, n: usize, used: &mut HashSet<String>) -> String {
    let valid = name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    let is_free = |candidate: &str, used: &HashSet<String>| {
        let lower = candidate.to_ascii_lowercase();
        !FORTRAN_RESERVED.contains(&lower.as_str()) && !used.contains(&lower)
    };

    let mut candidates = Vec::new();
    if valid {
        candidates.push(name.to_string());
        candidates.push(format!("{name}{n}"));
    }
    candidates.push(format!("arg{n}"));

    let chosen = candidates
        .into_iter()
        .find(|c| is_free(c, used))
        .unwrap_or_else(|| {
            let mut k = n;
            loop {
                let candidate = format!("arg{n}_{k}");
                if is_free(&candidate, used) {
                    break candidate;
                }
                k += 1;
            }
        });

    used.insert(chosen.to_ascii_lowercase());
    chosen
}

/// Member name used as the base of an overloaded binding, e.g. `compute` in `compute__SWIG_1`
fn member_base(node: &DeclarationNode, mode: EmissionMode) -> String {
    match mode {
        EmissionMode::Constructor => "create".to_string(),
        EmissionMode::Destructor => "release".to_string(),
        EmissionMode::Function => fbl_ast::sanitize_name(node.name().rsplit("::").next().unwrap_or(node.name())),
    }
}

/// The type-bound name of a member
fn member_alias(node: &DeclarationNode, mode: EmissionMode) -> String {
    match (mode, node.kind()) {
        (EmissionMode::Constructor, _) => "create".to_string(),
        (EmissionMode::Destructor, _) => "release".to_string(),
        (_, DeclKind::Accessor { field, role }) => match node.rename() {
            Some(rename) => rename.to_string(),
            None => match role {
                AccessorRole::Get => format!("get_{field}"),
                AccessorRole::Set => format!("set_{field}"),
            },
        },
        _ => node.public_name(),
    }
}

impl<'a> Generator<'a> {
    /// Generate the Fortran routine wrapping `shim` and register it: as a binding of the class being generated,
    /// in an overload group, or as a public module procedure.
    #[instrument(level = "trace", skip(self, node, shim, class), fields(name = node.name()))]
    pub fn emit_proxy(
        &mut self,
        node: &DeclarationNode,
        mode: EmissionMode,
        shim: &ShimOutput,
        class: Option<&mut ClassContext<'a>>,
    ) -> Result<ProxyOutput> {
        let location = node.location().clone();
        let class_name = class.as_ref().map(|c| c.name.clone());
        let owner = if node.features().new_object { ".true." } else { ".false." };

        let proxy_name = if class.is_none() && !node.is_overloaded() {
            node.sym_name(None)
        } else {
            format!(
                "{}{}{}",
                self.config.proxy_prefix,
                node.sym_name(class.as_ref().map(|c| c.class)),
                node.overload().unwrap_or("")
            )
        };

        let is_subroutine = mode != EmissionMode::Function || shim.is_subroutine;

        // a dummy argument may not share the routine's name
        let mut used = HashSet::new();
        used.insert(proxy_name.to_ascii_lowercase());
        let mut dummy_arguments = Vec::new();
        let mut declarations = Vec::new();
        let mut call_arguments = Vec::new();
        let mut pre = Vec::new();
        let mut post = Vec::new();

        if mode == EmissionMode::Constructor {
            dummy_arguments.push("self".to_string());
            declarations.push(format!(
                "class({}), intent(inout) :: self",
                class_name.as_deref().unwrap_or_default()
            ));
            used.insert("self".to_string());
        }

        if !is_subroutine {
            let ftype_out = self.proxy_code("ftype", &shim.result, None, Some("out"), &location);
            declarations.push(format!("{ftype_out} :: swig_result"));
        }

        for (i, (p, att)) in shim.parameters.iter().zip(shim.attachments.iter()).enumerate() {
            if shim.is_zero_input(i) {
                continue;
            }
            let n = i + 1;
            let qt = p.qual_type();

            let name = unique_argument_name(p.name(), n, &mut used);
            let ftype = if mode == EmissionMode::Destructor && i == 0 {
                format!("class({}), intent(inout)", class_name.as_deref().unwrap_or_default())
            } else {
                self.proxy_code("ftype", qt, Some(att), None, &location)
            };
            let fin = self.proxy_code("fin", qt, Some(att), None, &location);

            declarations.push(format!("{ftype} :: {name}"));
            call_arguments.push(substitute(&fin, &[("$input", name.as_str())]));

            for (op, fragments) in [("fpre", &mut pre), ("fpost", &mut post)] {
                if let Some(tm) = self.resolver.resolve(op, qt, Some(att), Warn::Silent, None, &location) {
                    let code = substitute(tm.code(), &[("$input", name.as_str())]);
                    let code = code.trim_end();
                    if !code.is_empty() {
                        fragments.push(code.to_string());
                    }
                }
            }

            dummy_arguments.push(name);
        }

        let imcall = format!("{}({})", shim.wrapper_name, call_arguments.join(", "));

        let body = match mode {
            EmissionMode::Constructor => self.proxy_code("fcreate", &shim.result, None, None, &location),
            EmissionMode::Destructor => {
                let handle = shim
                    .parameters
                    .first()
                    .map(|p| p.qual_type().clone())
                    .unwrap_or_else(QualType::void);
                self.proxy_code("frelease", &handle, None, None, &location)
            }
            EmissionMode::Function => self.proxy_code("fout", &shim.result, None, None, &location),
        };
        let body = substitute(
            &body,
            &[
                ("$result", if is_subroutine { "" } else { "swig_result" }),
                ("$imcall", imcall.as_str()),
                ("$owner", owner),
            ],
        );

        let mut routine = String::new();
        let kind = if is_subroutine { "subroutine" } else { "function" };
        if is_subroutine {
            writeln!(routine, "{kind} {proxy_name}({})", dummy_arguments.join(", "))?;
        } else {
            writeln!(routine, "{kind} {proxy_name}({}) &", dummy_arguments.join(", "))?;
            writeln!(routine, "result(swig_result)")?;
        }
        writeln!(routine, "use, intrinsic :: ISO_C_BINDING")?;
        for decl in &declarations {
            writeln!(routine, "{decl}")?;
        }
        if let Some(prepend) = &node.features().prepend {
            write_code(&mut routine, prepend, "")?;
        }
        for code in &pre {
            write_code(&mut routine, code, "")?;
        }
        write_code(&mut routine, body.trim_start(), "")?;
        for code in &post {
            write_code(&mut routine, code, "")?;
        }
        if let Some(append) = &node.features().append {
            write_code(&mut routine, append, "")?;
        }
        writeln!(routine, "end {kind}\n")?;

        match (class, node.overload()) {
            (Some(ctx), Some(discriminator)) => {
                let aliased = format!("{}{discriminator}", member_base(node, mode));
                ctx.overloads.record(&member_alias(node, mode), &aliased);
                ctx.bind(&format!("procedure, private :: {aliased} => {proxy_name}"));
            }
            (Some(ctx), None) => {
                ctx.bind(&format!("procedure :: {} => {proxy_name}", member_alias(node, mode)));
            }
            (None, Some(_)) => self.module_overloads.record(&node.public_name(), &proxy_name),
            (None, None) => writeln!(self.output.f_public, " public :: {proxy_name}")?,
        }

        Ok(ProxyOutput {
            proxy_name,
            routine,
            is_subroutine,
            dummy_arguments,
            call_arguments,
        })
    }

    /// A routine bound with `final ::` that releases the C++ object when the Fortran variable goes away
    pub fn emit_finalizer(&mut self, class: &mut ClassContext<'a>, shim: &ShimOutput) -> Result<()> {
        let location = class.class.location().clone();
        let name = format!("{}final_{}", self.config.proxy_prefix, class.name);
        let handle = class.handle_type.clone();

        let fin = self.proxy_code("fin", &handle, None, None, &location);
        let imcall = format!("{}({})", shim.wrapper_name, substitute(&fin, &[("$input", "self")]));
        let body = self.proxy_code("frelease", &handle, None, None, &location);
        let body = substitute(&body, &[("$result", ""), ("$imcall", imcall.as_str()), ("$owner", ".false.")]);

        let out = &mut self.output.f_proxies;
        writeln!(out, "subroutine {name}(self)")?;
        writeln!(out, "use, intrinsic :: ISO_C_BINDING")?;
        writeln!(out, "type({}) :: self", class.name)?;
        write_code(out, body.trim_start(), "")?;
        writeln!(out, "end subroutine\n")?;

        class.finalizer = Some(name);
        Ok(())
    }

    fn proxy_code(
        &mut self,
        op: &str,
        qual_type: &QualType,
        attached: Option<&TypemapAttachments>,
        suffix: Option<&str>,
        location: &SourceLocation,
    ) -> String {
        self.resolver
            .resolve(op, qual_type, attached, Warn::MissingTemplate, suffix, location)
            .map(|tm| tm.code().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbl_ast::{Features, Parameter, Typemap, TypemapTable, AST};
    use fbl_util::BindConfig;

    #[test]
    fn argument_names_are_unique_ignoring_case() {
        let mut used = HashSet::new();
        used.insert("self".to_string());
        assert_eq!(unique_argument_name("x", 2, &mut used), "x");
        assert_eq!(unique_argument_name("X", 3, &mut used), "X3");
        assert_eq!(unique_argument_name("type", 4, &mut used), "type4");
        assert_eq!(unique_argument_name("", 5, &mut used), "arg5");
        assert_eq!(unique_argument_name("_hidden", 6, &mut used), "arg6");
        assert_eq!(unique_argument_name("Self", 7, &mut used), "Self7");
    }

    #[test]
    fn zero_input_parameters_are_hidden() -> Result<()> {
        let ast = AST::new("test");
        let node = DeclarationNode::function("status").with_parameters(vec![
            Parameter::new("code", "int *".parse()?)
                .with_typemaps(TypemapAttachments::new().with("in", Typemap::zero_input("$1 = &last_status;"))),
            Parameter::new("flag", QualType::int()),
        ]);
        let tm = TypemapTable::fortran();
        let mut generator = Generator::new(&ast, &tm, &BindConfig::default());
        let shim = generator.emit_shim(&node, None)?;
        let proxy = generator.emit_proxy(&node, EmissionMode::Function, &shim, None)?;

        // the parameter still gets its local and its `in` code
        assert_eq!(
            shim.wrapper_body,
            concat!(
                "SWIGEXPORT void swigc_status(int farg2) {\n",
                "  int * arg1 ;\n",
                "  int arg2 ;\n",
                "\n",
                "  arg1 = &last_status;\n",
                "  arg2 = (int)farg2;\n",
                "  status(arg1, arg2);\n",
                "}\n",
                "\n",
            )
        );
        assert_eq!(shim.arguments, ["farg2"]);
        assert_eq!(
            proxy.routine,
            concat!(
                "subroutine status(flag)\n",
                "use, intrinsic :: ISO_C_BINDING\n",
                "integer(C_INT), intent(in) :: flag\n",
                "call swigc_status(flag)\n",
                "end subroutine\n",
                "\n",
            )
        );
        assert_eq!(proxy.dummy_arguments, ["flag"]);
        Ok(())
    }

    #[test]
    fn code_fragments_surround_the_call() -> Result<()> {
        let ast = AST::new("test");
        let node = DeclarationNode::function("combine")
            .with_parameters(vec![
                Parameter::new("n", QualType::int()).with_typemaps(
                    TypemapAttachments::new()
                        .with("fpre", Typemap::new("call check_input($input)\n\n"))
                        .with("fpost", Typemap::new("   \n")),
                ),
                Parameter::new("m", QualType::int())
                    .with_typemaps(TypemapAttachments::new().with("fpost", Typemap::new("call log_output($input)\n"))),
            ])
            .with_result(QualType::int())
            .with_features(Features {
                prepend: Some("! before".to_string()),
                append: Some("! after".to_string()),
                ..Default::default()
            });
        let tm = TypemapTable::fortran();
        let mut generator = Generator::new(&ast, &tm, &BindConfig::default());
        let shim = generator.emit_shim(&node, None)?;
        let proxy = generator.emit_proxy(&node, EmissionMode::Function, &shim, None)?;

        assert_eq!(
            proxy.routine,
            concat!(
                "function combine(n, m) &\n",
                "result(swig_result)\n",
                "use, intrinsic :: ISO_C_BINDING\n",
                "integer(C_INT) :: swig_result\n",
                "integer(C_INT), intent(in) :: n\n",
                "integer(C_INT), intent(in) :: m\n",
                "! before\n",
                "call check_input(n)\n",
                "swig_result = swigc_combine(n, m)\n",
                "call log_output(m)\n",
                "! after\n",
                "end function\n",
                "\n",
            )
        );
        assert_eq!(generator.resolver.diagnostics().iter().count(), 0);
        Ok(())
    }

    #[test]
    fn dummy_arguments_avoid_the_routine_name() -> Result<()> {
        let ast = AST::new("test");
        let node = DeclarationNode::function("x")
            .with_parameter("x", "double".parse()?)
            .with_result("double".parse()?);
        let tm = TypemapTable::fortran();
        let mut generator = Generator::new(&ast, &tm, &BindConfig::default());
        let shim = generator.emit_shim(&node, None)?;
        let proxy = generator.emit_proxy(&node, EmissionMode::Function, &shim, None)?;

        assert_eq!(
            proxy.routine,
            concat!(
                "function x(x1) &\n",
                "result(swig_result)\n",
                "use, intrinsic :: ISO_C_BINDING\n",
                "real(C_DOUBLE) :: swig_result\n",
                "real(C_DOUBLE), intent(in) :: x1\n",
                "swig_result = swigc_x(x1)\n",
                "end function\n",
                "\n",
            )
        );
        Ok(())
    }
}
